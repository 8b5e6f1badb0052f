//! Concurrent access tests for product stock.
//!
//! These tests verify that:
//! - Two sales racing for the same units never both succeed
//! - Concurrent inflows never lose an update
//! - The stock history stays gap-free under contention
//! - A lock held past the timeout surfaces as a retryable contention error

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, QuerySelect, TransactionTrait};
use tokio::sync::Barrier;
use uuid::Uuid;

use torque_core::inventory::{HeaderKind, HeaderRef, InventoryError, LineRequest};
use torque_db::entities::{products, sea_orm_active_enums::PaymentMethod};
use torque_db::repositories::{RecordPurchaseInput, RecordSaleInput, StockMutator};
use torque_db::{ReconciliationReporter, RetryPolicy, TransactionCoordinator};

use common::{coordinator, create_product, setup, stock_of};

// ============================================================================
// Race for the last units
// ============================================================================
#[tokio::test]
async fn test_two_sales_of_four_from_five_exactly_one_wins() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 5, 0, dec!(25.00)).await;

    let coordinator = Arc::new(coordinator(&fixture.db));
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::with_capacity(2);

    for _ in 0..2 {
        let coordinator = Arc::clone(&coordinator);
        let barrier = Arc::clone(&barrier);
        let input = RecordSaleInput {
            client_id: fixture.client_id,
            employee_id: fixture.employee_id,
            payment_method: PaymentMethod::Card,
            lines: vec![LineRequest::new(product, 4)],
        };

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            coordinator.record_sale(input).await
        }));
    }

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("Task panicked"))
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1, "exactly one sale must win: {results:?}");

    let failure = results
        .iter()
        .find_map(|result| result.as_ref().err())
        .unwrap();
    assert!(
        matches!(
            failure.as_inventory(),
            Some(InventoryError::InsufficientStock {
                requested: 4,
                available: 1,
                ..
            })
        ),
        "loser must see the winner's decrement, got {failure}"
    );

    assert_eq!(stock_of(&fixture.db, product).await, 1);

    let reconciliation = ReconciliationReporter::new(fixture.db.clone())
        .reconcile_product(product)
        .await
        .unwrap();
    assert!(reconciliation.is_consistent(), "{:?}", reconciliation.issues);
    assert_eq!(reconciliation.applied_changes, 1);
}

// ============================================================================
// No lost updates
// ============================================================================
#[tokio::test]
async fn test_concurrent_purchases_lose_no_update() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 7, 0, dec!(1.00)).await;

    const NUM_PURCHASES: usize = 20;

    // Generous retry budget: this test is about correctness, not contention.
    let policy = RetryPolicy {
        max_attempts: 10,
        ..RetryPolicy::default()
    };
    let coordinator = Arc::new(TransactionCoordinator::new(fixture.db.clone(), policy));
    let barrier = Arc::new(Barrier::new(NUM_PURCHASES));
    let mut handles = Vec::with_capacity(NUM_PURCHASES);

    for _ in 0..NUM_PURCHASES {
        let coordinator = Arc::clone(&coordinator);
        let barrier = Arc::clone(&barrier);
        let input = RecordPurchaseInput {
            supplier_id: fixture.supplier_id,
            manager_id: fixture.employee_id,
            lines: vec![LineRequest::priced(product, 1, dec!(0.50))],
        };

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            coordinator.record_purchase(input).await
        }));
    }

    let mut success_count = 0;
    for result in join_all(handles).await {
        match result {
            Ok(Ok(_)) => success_count += 1,
            Ok(Err(e)) => eprintln!("Purchase failed: {e}"),
            Err(e) => eprintln!("Task panicked: {e}"),
        }
    }

    println!("Completed {success_count} of {NUM_PURCHASES} purchases");
    assert_eq!(success_count, NUM_PURCHASES);
    assert_eq!(stock_of(&fixture.db, product).await, 7 + 20);

    let reconciliation = ReconciliationReporter::new(fixture.db.clone())
        .reconcile_product(product)
        .await
        .unwrap();
    assert!(reconciliation.is_consistent(), "{:?}", reconciliation.issues);
    assert_eq!(reconciliation.applied_changes, NUM_PURCHASES);
}

#[tokio::test]
async fn test_concurrent_mixed_sales_never_oversell() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 10, 0, dec!(3.00)).await;

    const NUM_SALES: usize = 15;

    let policy = RetryPolicy {
        max_attempts: 10,
        ..RetryPolicy::default()
    };
    let coordinator = Arc::new(TransactionCoordinator::new(fixture.db.clone(), policy));
    let barrier = Arc::new(Barrier::new(NUM_SALES));
    let mut handles = Vec::with_capacity(NUM_SALES);

    for _ in 0..NUM_SALES {
        let coordinator = Arc::clone(&coordinator);
        let barrier = Arc::clone(&barrier);
        let input = RecordSaleInput {
            client_id: fixture.client_id,
            employee_id: fixture.employee_id,
            payment_method: PaymentMethod::Cash,
            lines: vec![LineRequest::new(product, 1)],
        };

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            coordinator.record_sale(input).await
        }));
    }

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("Task panicked"))
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|result| {
            matches!(
                result.as_ref().err().and_then(|e| e.as_inventory()),
                Some(InventoryError::InsufficientStock { .. })
            )
        })
        .count();

    assert_eq!(successes, 10);
    assert_eq!(insufficient, NUM_SALES - 10);
    assert_eq!(stock_of(&fixture.db, product).await, 0);
}

// ============================================================================
// Disjoint products
// ============================================================================
#[tokio::test]
async fn test_sales_on_disjoint_products_both_commit() {
    let Some(fixture) = setup().await else { return };
    let left = create_product(&fixture.db, 1, 0, dec!(2.00)).await;
    let right = create_product(&fixture.db, 1, 0, dec!(2.00)).await;

    let coordinator = coordinator(&fixture.db);
    let sale = |product| RecordSaleInput {
        client_id: fixture.client_id,
        employee_id: fixture.employee_id,
        payment_method: PaymentMethod::Transfer,
        lines: vec![LineRequest::new(product, 1)],
    };

    let (a, b) = tokio::join!(
        coordinator.record_sale(sale(left)),
        coordinator.record_sale(sale(right))
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(stock_of(&fixture.db, left).await, 0);
    assert_eq!(stock_of(&fixture.db, right).await, 0);
}

// ============================================================================
// Lock timeout
// ============================================================================
#[tokio::test]
async fn test_held_lock_surfaces_as_concurrent_modification() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 5, 0, dec!(2.00)).await;

    // Another writer holds the row.
    let blocker = fixture.db.begin().await.unwrap();
    products::Entity::find_by_id(product.into_inner())
        .lock_exclusive()
        .one(&blocker)
        .await
        .unwrap();

    let policy = RetryPolicy {
        lock_timeout: Duration::from_millis(100),
        max_attempts: 2,
        backoff: Duration::from_millis(10),
    };
    let coordinator = TransactionCoordinator::new(fixture.db.clone(), policy);

    let err = coordinator
        .record_sale(RecordSaleInput {
            client_id: fixture.client_id,
            employee_id: fixture.employee_id,
            payment_method: PaymentMethod::Cash,
            lines: vec![LineRequest::new(product, 1)],
        })
        .await
        .unwrap_err();

    assert!(
        matches!(
            err.as_inventory(),
            Some(InventoryError::ConcurrentModification {
                product_id: Some(id),
                attempts: 2,
            }) if *id == product
        ),
        "expected contention, got {err}"
    );
    assert!(err.as_inventory().unwrap().is_retryable());

    blocker.rollback().await.unwrap();

    // Once released, the same sale goes through.
    coordinator
        .record_sale(RecordSaleInput {
            client_id: fixture.client_id,
            employee_id: fixture.employee_id,
            payment_method: PaymentMethod::Cash,
            lines: vec![LineRequest::new(product, 1)],
        })
        .await
        .unwrap();
    assert_eq!(stock_of(&fixture.db, product).await, 4);
}

#[tokio::test]
async fn test_standalone_mutation_retries_then_reports_concurrent_modification() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 5, 0, dec!(2.00)).await;

    let blocker = fixture.db.begin().await.unwrap();
    products::Entity::find_by_id(product.into_inner())
        .lock_exclusive()
        .one(&blocker)
        .await
        .unwrap();

    let policy = RetryPolicy {
        lock_timeout: Duration::from_millis(100),
        max_attempts: 3,
        backoff: Duration::from_millis(10),
    };
    let mutator = StockMutator::new(fixture.db.clone(), policy);
    let source = HeaderRef {
        kind: HeaderKind::Movement,
        id: Uuid::new_v4(),
    };

    let err = mutator
        .apply_in_own_unit(product, -1, source)
        .await
        .unwrap_err();

    assert!(
        matches!(
            err.as_inventory(),
            Some(InventoryError::ConcurrentModification {
                product_id: Some(id),
                attempts: 3,
            }) if *id == product
        ),
        "expected contention, got {err}"
    );

    blocker.rollback().await.unwrap();

    let change = mutator.apply_in_own_unit(product, -1, source).await.unwrap();
    assert_eq!(change.stock_after, 4);
    assert_eq!(stock_of(&fixture.db, product).await, 4);
}
