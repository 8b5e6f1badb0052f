//! `SeaORM` entity definitions.

pub mod prelude;

pub mod clients;
pub mod employees;
pub mod inventory_movements;
pub mod movement_lines;
pub mod products;
pub mod purchase_lines;
pub mod purchases;
pub mod sale_lines;
pub mod sales;
pub mod sea_orm_active_enums;
pub mod stock_changes;
pub mod suppliers;
