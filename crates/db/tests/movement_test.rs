//! Integration tests for manual inventory movements and the standalone mutator.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::str::FromStr;

use rust_decimal_macros::dec;
use uuid::Uuid;

use torque_core::inventory::{HeaderKind, HeaderRef, InventoryError, MovementKind};
use torque_db::entities::sea_orm_active_enums::MovementKind as DbMovementKind;
use torque_db::UnitOfWorkExt;
use torque_db::repositories::{
    CatalogRepository, HeaderRepository, RecordMovementInput, RetryPolicy, StockMutator,
};

use common::{coordinator, create_product, setup, stock_of};

fn movement(
    fixture: &common::Fixture,
    product_id: torque_shared::types::ProductId,
    kind: MovementKind,
    quantity: i32,
) -> RecordMovementInput {
    RecordMovementInput {
        employee_id: fixture.employee_id,
        product_id,
        kind,
        quantity,
        note: Some("shelf count correction".to_string()),
    }
}

#[tokio::test]
async fn test_outbound_movement_drains_then_fails() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 3, 0, dec!(1.00)).await;
    let coordinator = coordinator(&fixture.db);
    let salida = MovementKind::from_str("salida").unwrap();

    let recorded = coordinator
        .record_movement(movement(&fixture, product, salida, 3))
        .await
        .expect("Movement should succeed");
    assert_eq!(stock_of(&fixture.db, product).await, 0);
    assert_eq!(recorded.header.kind, DbMovementKind::Out);
    assert_eq!(recorded.lines[0].unit_price, None);

    let err = coordinator
        .record_movement(movement(&fixture, product, salida, 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_inventory(),
        Some(InventoryError::InsufficientStock {
            requested: 1,
            available: 0,
            ..
        })
    ));
    assert_eq!(stock_of(&fixture.db, product).await, 0);
}

#[tokio::test]
async fn test_inbound_movement_adds_stock_and_keeps_one_line() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 1, 0, dec!(1.00)).await;

    let recorded = coordinator(&fixture.db)
        .record_movement(movement(&fixture, product, MovementKind::In, 4))
        .await
        .unwrap();
    assert_eq!(stock_of(&fixture.db, product).await, 5);

    let stored = HeaderRepository::new(fixture.db.clone())
        .get_movement(recorded.header.id)
        .await
        .unwrap();
    assert_eq!(stored.lines.len(), 1);
    assert_eq!(stored.lines[0].quantity, 4);
    assert_eq!(stored.movement.note.as_deref(), Some("shelf count correction"));
}

#[tokio::test]
async fn test_zero_quantity_movement_rejected() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 1, 0, dec!(1.00)).await;

    let err = coordinator(&fixture.db)
        .record_movement(movement(&fixture, product, MovementKind::In, 0))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_inventory(),
        Some(InventoryError::NonPositiveQuantity { .. })
    ));
}

// ============================================================================
// Standalone mutator
// ============================================================================

fn source() -> HeaderRef {
    HeaderRef {
        kind: HeaderKind::Movement,
        id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn test_apply_in_own_unit_commits() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 2, 5, dec!(1.00)).await;
    let mutator = StockMutator::new(fixture.db.clone(), RetryPolicy::default());

    let change = mutator.apply_in_own_unit(product, 2, source()).await.unwrap();

    assert_eq!(change.version, 1);
    assert_eq!(change.stock_before, 2);
    assert_eq!(change.stock_after, 4);
    assert!(change.below_minimum);
    assert_eq!(stock_of(&fixture.db, product).await, 4);
}

#[tokio::test]
async fn test_mutator_rejects_zero_and_overdraw() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 2, 0, dec!(1.00)).await;
    let mutator = StockMutator::new(fixture.db.clone(), RetryPolicy::default());

    let zero = mutator.apply_in_own_unit(product, 0, source()).await.unwrap_err();
    assert!(matches!(zero.as_inventory(), Some(InventoryError::ZeroDelta(_))));

    let overdraw = mutator.apply_in_own_unit(product, -3, source()).await.unwrap_err();
    assert!(matches!(
        overdraw.as_inventory(),
        Some(InventoryError::InsufficientStock { shortfall: 1, .. })
    ));
    assert_eq!(stock_of(&fixture.db, product).await, 2);
}

#[tokio::test]
async fn test_dropped_unit_of_work_leaves_no_trace() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 5, 0, dec!(1.00)).await;
    let policy = RetryPolicy::default();
    let mutator = StockMutator::new(fixture.db.clone(), policy);

    {
        let uow = fixture.db.unit_of_work(policy.lock_timeout).await.unwrap();
        let change = mutator
            .apply(uow.transaction(), product, -4, source())
            .await
            .unwrap();
        assert_eq!(change.stock_after, 1);

        let inside = CatalogRepository::get_product(uow.transaction(), product)
            .await
            .unwrap();
        assert_eq!(inside.stock, 1);
        assert_eq!(stock_of(&fixture.db, product).await, 5);
        // Dropped without commit, as when the caller is cancelled.
    }

    assert_eq!(stock_of(&fixture.db, product).await, 5);

    // The row lock was released with the rollback.
    mutator.apply_in_own_unit(product, -1, source()).await.unwrap();
    assert_eq!(stock_of(&fixture.db, product).await, 4);
}
