//! Product stock counter and its invariants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use torque_shared::types::ProductId;

use super::error::InventoryError;

/// Catalog status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Product can be sold.
    Active,
    /// Product is retired from sale; it can still be restocked or corrected.
    Inactive,
}

impl ProductStatus {
    /// Returns true if the product can be sold.
    #[must_use]
    pub fn is_sellable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Snapshot of the stock-relevant fields of a product.
///
/// `stock` is never negative. A snapshot is only meaningful inside the unit of
/// work that read it; the authoritative counter lives in the database row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    /// The product.
    pub product_id: ProductId,
    /// Units on hand.
    pub stock: i32,
    /// Reorder threshold.
    pub stock_minimum: i32,
    /// Reference purchase price.
    pub purchase_price: Decimal,
    /// Current sale price.
    pub sale_price: Decimal,
    /// Catalog status.
    pub status: ProductStatus,
}

impl ProductStock {
    /// Returns true if stock sits below the reorder threshold.
    #[must_use]
    pub fn is_below_minimum(&self) -> bool {
        self.stock < self.stock_minimum
    }

    /// Computes the stock that results from applying `delta`.
    ///
    /// Does not modify `self`; the caller persists the returned value.
    ///
    /// # Errors
    ///
    /// - `ZeroDelta` if `delta == 0`
    /// - `InsufficientStock` if the result would be negative
    /// - `StockOverflow` if the result does not fit the counter
    pub fn stock_after(&self, delta: i32) -> Result<i32, InventoryError> {
        if delta == 0 {
            return Err(InventoryError::ZeroDelta(self.product_id));
        }

        let new_stock = self
            .stock
            .checked_add(delta)
            .ok_or(InventoryError::StockOverflow(self.product_id))?;

        if new_stock < 0 {
            return Err(InventoryError::insufficient(
                self.product_id,
                -i64::from(delta),
                self.stock,
            ));
        }

        Ok(new_stock)
    }
}
