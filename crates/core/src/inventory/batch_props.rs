//! Property-based tests for line-item batch validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use torque_shared::types::ProductId;

use super::batch::{LineItemBatch, LineRequest};
use super::error::InventoryError;
use super::kind::TransactionKind;
use super::product::{ProductStatus, ProductStock};

/// Strategy for prices from 0.00 to 10,000.00.
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a small catalog of active products.
fn catalog_strategy() -> impl Strategy<Value = Vec<ProductStock>> {
    prop::collection::vec((0i32..50, price_strategy()), 1..6).prop_map(|rows| {
        rows.into_iter()
            .map(|(stock, sale_price)| ProductStock {
                product_id: ProductId::new(),
                stock,
                stock_minimum: 0,
                purchase_price: sale_price,
                sale_price,
                status: ProductStatus::Active,
            })
            .collect()
    })
}

fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        Just(TransactionKind::Sale),
        Just(TransactionKind::Purchase),
        Just(TransactionKind::MovementIn),
        Just(TransactionKind::MovementOut),
    ]
}

/// Builds requests that reference the catalog by index.
fn requests_for(
    kind: TransactionKind,
    catalog: &[ProductStock],
    picks: &[(usize, i32, Decimal)],
) -> Vec<LineRequest> {
    picks
        .iter()
        .map(|(index, quantity, price)| {
            let product_id = catalog[index % catalog.len()].product_id;
            if kind == TransactionKind::Purchase {
                LineRequest::priced(product_id, *quantity, *price)
            } else {
                LineRequest::new(product_id, *quantity)
            }
        })
        .collect()
}

fn lookup(catalog: &[ProductStock]) -> impl Fn(ProductId) -> Option<ProductStock> + '_ {
    move |id| catalog.iter().find(|p| p.product_id == id).cloned()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Validating twice against an unchanged catalog yields the same batch.
    #[test]
    fn prop_validation_is_idempotent(
        kind in kind_strategy(),
        catalog in catalog_strategy(),
        picks in prop::collection::vec((0usize..10, 1i32..20, price_strategy()), 1..8),
    ) {
        let requests = requests_for(kind, &catalog, &picks);

        let first = LineItemBatch::build(kind, &requests, lookup(&catalog));
        let second = LineItemBatch::build(kind, &requests, lookup(&catalog));

        prop_assert_eq!(first, second);
    }

    /// The batch total is the sum of line subtotals, and each subtotal is quantity * price.
    #[test]
    fn prop_total_is_sum_of_subtotals(
        kind in kind_strategy(),
        catalog in catalog_strategy(),
        picks in prop::collection::vec((0usize..10, 1i32..20, price_strategy()), 1..8),
    ) {
        let requests = requests_for(kind, &catalog, &picks);

        if let Ok(batch) = LineItemBatch::build(kind, &requests, lookup(&catalog)) {
            let sum: Decimal = batch.lines().iter().map(|l| l.subtotal).sum();
            prop_assert_eq!(batch.total(), sum);

            for line in batch.lines() {
                let expected = line
                    .unit_price
                    .map_or(Decimal::ZERO, |price| price * Decimal::from(line.quantity));
                prop_assert_eq!(line.subtotal, expected);
            }

            if !kind.carries_total() {
                prop_assert_eq!(batch.total(), Decimal::ZERO);
            }
        }
    }

    /// An accepted outflow never asks for more than any product has.
    #[test]
    fn prop_accepted_outflow_fits_stock(
        catalog in catalog_strategy(),
        picks in prop::collection::vec((0usize..10, 1i32..20, price_strategy()), 1..8),
    ) {
        let kind = TransactionKind::Sale;
        let requests = requests_for(kind, &catalog, &picks);

        match LineItemBatch::build(kind, &requests, lookup(&catalog)) {
            Ok(batch) => {
                for product in &catalog {
                    let demand: i32 = batch
                        .lines()
                        .iter()
                        .filter(|l| l.product_id == product.product_id)
                        .map(|l| l.quantity)
                        .sum();
                    prop_assert!(demand <= product.stock);
                }
            }
            Err(InventoryError::InsufficientStock { requested, available, shortfall, .. }) => {
                prop_assert!(requested > i64::from(available));
                prop_assert_eq!(shortfall, requested - i64::from(available));
            }
            Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
        }
    }

    /// Inflows are never rejected for stock reasons.
    #[test]
    fn prop_inflows_never_short(
        catalog in catalog_strategy(),
        picks in prop::collection::vec((0usize..10, 1i32..1000, price_strategy()), 1..8),
    ) {
        for kind in [TransactionKind::Purchase, TransactionKind::MovementIn] {
            let requests = requests_for(kind, &catalog, &picks);
            prop_assert!(LineItemBatch::build(kind, &requests, lookup(&catalog)).is_ok());
        }
    }
}
