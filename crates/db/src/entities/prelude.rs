//! Re-exports of every entity under its table-derived name.

pub use super::clients::Entity as Clients;
pub use super::employees::Entity as Employees;
pub use super::inventory_movements::Entity as InventoryMovements;
pub use super::movement_lines::Entity as MovementLines;
pub use super::products::Entity as Products;
pub use super::purchase_lines::Entity as PurchaseLines;
pub use super::purchases::Entity as Purchases;
pub use super::sale_lines::Entity as SaleLines;
pub use super::sales::Entity as Sales;
pub use super::stock_changes::Entity as StockChanges;
pub use super::suppliers::Entity as Suppliers;
