//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod headers;
pub mod reconciliation;
pub mod retry;
pub mod stock;

pub use catalog::{CatalogError, CatalogRepository, CreateProductInput};
pub use coordinator::{
    Header, RecordMovementInput, RecordPurchaseInput, RecordSaleInput, Recorded,
    TransactionCoordinator, TransactionRequest,
};
pub use error::TransactionError;
pub use headers::{
    DateRange, HeaderRepository, MovementWithLines, PurchaseWithLines, SaleWithLines,
};
pub use reconciliation::ReconciliationReporter;
pub use retry::RetryPolicy;
pub use stock::{StockChange, StockMutator};
