//! Inventory consistency core.
//!
//! This module implements the rules that keep `Product.stock` consistent across
//! sales, purchases, and manual movements:
//! - Product stock counter and its non-negativity invariant
//! - Transaction kinds and the stock direction each implies
//! - Line-item batch validation and pricing
//! - Unit-of-work state machine
//! - Header total and stock history reconciliation
//! - Error taxonomy for all of the above

pub mod batch;
pub mod error;
pub mod kind;
pub mod lifecycle;
pub mod product;
pub mod reconciliation;

#[cfg(test)]
mod batch_props;
#[cfg(test)]
mod product_props;

pub use batch::{LineItemBatch, LineRequest, PricedLineItem, lock_order};
pub use error::{ErrorCategory, InventoryError, ReferenceKind};
pub use kind::{HeaderKind, MovementKind, PricingRule, StockDirection, TransactionKind};
pub use lifecycle::UnitOfWorkState;
pub use product::{ProductStatus, ProductStock};
pub use reconciliation::{
    AuditReport, Divergence, HeaderRef, LineSnapshot, StockHistoryEntry, StockIssue,
    StockReconciliation, TotalReconciliation, reconcile_stock, reconcile_total,
};
