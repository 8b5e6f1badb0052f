//! Line-item batch validation and pricing.
//!
//! A batch turns `(product, quantity[, price])` requests into priced line items
//! or fails before any persistent state changes. It never touches stock; the
//! database layer runs it under the same product locks that the stock
//! mutations will use, so the sufficiency verdict cannot go stale.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use torque_shared::types::ProductId;

use super::error::InventoryError;
use super::kind::{PricingRule, TransactionKind};
use super::product::ProductStock;

/// Largest unit price a line can carry (`NUMERIC(12, 2)`).
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Largest subtotal or header total (`NUMERIC(14, 2)`).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 2);

/// One requested line of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    /// Product to move.
    pub product_id: ProductId,
    /// Units, strictly positive.
    pub quantity: i32,
    /// Negotiated unit price; purchases only.
    pub unit_price: Option<Decimal>,
}

impl LineRequest {
    /// Creates an unpriced line (sales and movements).
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: None,
        }
    }

    /// Creates a line with a caller-supplied price (purchases).
    #[must_use]
    pub const fn priced(product_id: ProductId, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: Some(unit_price),
        }
    }
}

/// A validated, priced line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLineItem {
    /// 1-based position in the batch.
    pub line_number: i32,
    /// Product moved.
    pub product_id: ProductId,
    /// Units moved, strictly positive.
    pub quantity: i32,
    /// Unit price snapshotted at validation; `None` for movements.
    pub unit_price: Option<Decimal>,
    /// `quantity * unit_price`, zero for movements.
    pub subtotal: Decimal,
}

/// An ordered, validated, priced set of line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemBatch {
    kind: TransactionKind,
    lines: Vec<PricedLineItem>,
    total: Decimal,
}

impl LineItemBatch {
    /// Checks everything that can be checked without reading the catalog.
    ///
    /// Run before a unit of work is opened so malformed requests never take locks.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty batch, a non-positive quantity,
    /// a unit price that violates the kind's pricing rule, or a unit price
    /// with more than 2 decimal places or above [`MAX_UNIT_PRICE`].
    pub fn check_shape(kind: TransactionKind, requests: &[LineRequest]) -> Result<(), InventoryError> {
        if requests.is_empty() {
            return Err(InventoryError::EmptyBatch);
        }

        for (index, request) in requests.iter().enumerate() {
            let line = index + 1;

            if request.quantity <= 0 {
                return Err(InventoryError::NonPositiveQuantity {
                    line,
                    quantity: request.quantity,
                });
            }

            match (kind.pricing(), request.unit_price) {
                (PricingRule::CallerSupplied, None) => {
                    return Err(InventoryError::MissingUnitPrice { line });
                }
                (PricingRule::CallerSupplied, Some(price)) if price < Decimal::ZERO => {
                    return Err(InventoryError::NegativeUnitPrice {
                        line,
                        unit_price: price,
                    });
                }
                (PricingRule::CallerSupplied, Some(price))
                    if price > MAX_UNIT_PRICE || price.round_dp(2) != price =>
                {
                    return Err(InventoryError::InvalidUnitPrice {
                        line,
                        unit_price: price,
                    });
                }
                (PricingRule::SalePrice | PricingRule::Unpriced, Some(_)) => {
                    return Err(InventoryError::UnexpectedUnitPrice { line });
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Validates and prices a batch against the current catalog.
    ///
    /// 1. Re-checks the shape (see [`Self::check_shape`])
    /// 2. Resolves every product through `lookup`
    /// 3. Rejects inactive products on sales
    /// 4. For outflows, checks the cumulative quantity per product against stock
    /// 5. Prices each line and sums the total
    ///
    /// Pure: the same inputs against the same catalog yield the same batch.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found (including a subtotal or total
    /// above [`MAX_AMOUNT`]), or `InsufficientStock` naming the first product
    /// (in line order) whose demand exceeds its stock.
    pub fn build<L>(
        kind: TransactionKind,
        requests: &[LineRequest],
        lookup: L,
    ) -> Result<Self, InventoryError>
    where
        L: Fn(ProductId) -> Option<ProductStock>,
    {
        Self::check_shape(kind, requests)?;

        let mut products: HashMap<ProductId, ProductStock> = HashMap::new();
        let mut demand: Vec<(ProductId, i64)> = Vec::new();
        let mut lines = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            let product = match products.get(&request.product_id) {
                Some(product) => product.clone(),
                None => {
                    let product = lookup(request.product_id)
                        .ok_or(InventoryError::ProductNotFound(request.product_id))?;
                    products.insert(request.product_id, product.clone());
                    product
                }
            };

            if matches!(kind, TransactionKind::Sale) && !product.status.is_sellable() {
                return Err(InventoryError::ProductInactive(product.product_id));
            }

            match demand.iter_mut().find(|(id, _)| *id == request.product_id) {
                Some((_, total)) => *total += i64::from(request.quantity),
                None => demand.push((request.product_id, i64::from(request.quantity))),
            }

            let unit_price = match kind.pricing() {
                PricingRule::SalePrice => Some(product.sale_price),
                PricingRule::CallerSupplied => request.unit_price,
                PricingRule::Unpriced => None,
            };
            let subtotal = match unit_price {
                Some(price) => price
                    .checked_mul(Decimal::from(request.quantity))
                    .filter(|subtotal| *subtotal <= MAX_AMOUNT)
                    .ok_or(InventoryError::LineAmountOutOfRange { line: index + 1 })?,
                None => Decimal::ZERO,
            };

            lines.push(PricedLineItem {
                line_number: line_number(index)?,
                product_id: request.product_id,
                quantity: request.quantity,
                unit_price,
                subtotal,
            });
        }

        if kind.requires_stock() {
            for (product_id, requested) in &demand {
                let product = &products[product_id];
                if *requested > i64::from(product.stock) {
                    return Err(InventoryError::insufficient(
                        *product_id,
                        *requested,
                        product.stock,
                    ));
                }
            }
        }

        let total = lines
            .iter()
            .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.subtotal))
            .filter(|total| *total <= MAX_AMOUNT)
            .ok_or(InventoryError::TotalOutOfRange)?;

        Ok(Self { kind, lines, total })
    }

    /// Returns the transaction kind this batch was validated for.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns the priced lines in request order.
    #[must_use]
    pub fn lines(&self) -> &[PricedLineItem] {
        &self.lines
    }

    /// Returns the batch total (zero for movements).
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }
}

/// Returns the distinct product ids in ascending order.
#[must_use]
pub fn lock_order(ids: impl IntoIterator<Item = ProductId>) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn line_number(index: usize) -> Result<i32, InventoryError> {
    i32::try_from(index + 1).map_err(|_| InventoryError::integrity("too many line items"))
}
