//! Property-based tests for the stock counter invariant.

use proptest::prelude::*;
use rust_decimal::Decimal;

use torque_shared::types::ProductId;

use super::error::InventoryError;
use super::product::{ProductStatus, ProductStock};
use super::reconciliation::{StockHistoryEntry, reconcile_stock};

fn product(stock: i32) -> ProductStock {
    ProductStock {
        product_id: ProductId::new(),
        stock,
        stock_minimum: 0,
        purchase_price: Decimal::ONE,
        sale_price: Decimal::ONE,
        status: ProductStatus::Active,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Applying any sequence of deltas, rejecting the ones that fail, never
    /// produces negative stock, and the accepted history reconciles.
    #[test]
    fn prop_stock_never_negative(
        opening in 0i32..100,
        deltas in prop::collection::vec(-30i32..30, 0..50),
    ) {
        let mut current = product(opening);
        let mut history = Vec::new();

        for delta in deltas {
            match current.stock_after(delta) {
                Ok(next) => {
                    prop_assert!(next >= 0);
                    history.push(StockHistoryEntry {
                        version: i64::try_from(history.len()).unwrap() + 1,
                        delta,
                        stock_before: current.stock,
                        stock_after: next,
                    });
                    current.stock = next;
                }
                Err(InventoryError::InsufficientStock { available, shortfall, .. }) => {
                    prop_assert_eq!(available, current.stock);
                    prop_assert!(shortfall > 0);
                }
                Err(InventoryError::ZeroDelta(_)) => prop_assert_eq!(delta, 0),
                Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            }
        }

        let reconciliation = reconcile_stock(current.product_id, opening, current.stock, &history);
        prop_assert!(reconciliation.is_consistent(), "{:?}", reconciliation.issues);
    }
}
