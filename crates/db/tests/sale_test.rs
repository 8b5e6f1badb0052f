//! Integration tests for recording sales.
//!
//! Covers pricing from the catalog, insufficient stock, all-or-nothing
//! rollback of multi-line sales, and reference/product validation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use torque_core::inventory::{InventoryError, LineRequest, ReferenceKind};
use torque_db::TransactionError;
use torque_db::entities::sea_orm_active_enums::{PaymentMethod, ProductStatus};
use torque_db::entities::{sale_lines, sales, stock_changes};
use torque_db::repositories::{CatalogRepository, HeaderRepository, RecordSaleInput};
use torque_shared::types::{ClientId, ProductId};

use common::{coordinator, create_product, setup, stock_of};

fn sale(fixture: &common::Fixture, lines: Vec<LineRequest>) -> RecordSaleInput {
    RecordSaleInput {
        client_id: fixture.client_id,
        employee_id: fixture.employee_id,
        payment_method: PaymentMethod::Cash,
        lines,
    }
}

async fn sales_for_client(fixture: &common::Fixture) -> u64 {
    sales::Entity::find()
        .filter(sales::Column::ClientId.eq(fixture.client_id.into_inner()))
        .count(&fixture.db)
        .await
        .unwrap()
}

async fn changes_for(fixture: &common::Fixture, product_id: ProductId) -> u64 {
    stock_changes::Entity::find()
        .filter(stock_changes::Column::ProductId.eq(product_id.into_inner()))
        .count(&fixture.db)
        .await
        .unwrap()
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_sale_decrements_stock_and_prices_from_catalog() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 10, 2, dec!(120.00)).await;

    let recorded = coordinator(&fixture.db)
        .record_sale(sale(&fixture, vec![LineRequest::new(product, 3)]))
        .await
        .expect("Sale should succeed");

    assert_eq!(stock_of(&fixture.db, product).await, 7);
    assert_eq!(recorded.header.total, dec!(360.00));
    assert_eq!(recorded.lines.len(), 1);
    assert_eq!(recorded.lines[0].unit_price, Some(dec!(120.00)));
    assert_eq!(recorded.lines[0].subtotal, dec!(360.00));
    assert_eq!(recorded.stock_changes[0].stock_before, 10);
    assert_eq!(recorded.stock_changes[0].stock_after, 7);
    assert!(recorded.low_stock.is_empty());

    let stored = HeaderRepository::new(fixture.db.clone())
        .get_sale(recorded.header.id)
        .await
        .unwrap();
    assert_eq!(stored.sale.total, dec!(360.00));
    assert_eq!(stored.lines.len(), 1);
    assert_eq!(stored.lines[0].quantity, 3);
}

#[tokio::test]
async fn test_sale_total_sums_every_line() {
    let Some(fixture) = setup().await else { return };
    let chain = create_product(&fixture.db, 4, 0, dec!(45.50)).await;
    let sprocket = create_product(&fixture.db, 4, 0, dec!(30.00)).await;

    let recorded = coordinator(&fixture.db)
        .record_sale(sale(
            &fixture,
            vec![LineRequest::new(chain, 2), LineRequest::new(sprocket, 1)],
        ))
        .await
        .unwrap();

    assert_eq!(recorded.header.total, dec!(121.00));

    let lines = sale_lines::Entity::find()
        .filter(sale_lines::Column::SaleId.eq(recorded.header.id))
        .all(&fixture.db)
        .await
        .unwrap();
    let sum: rust_decimal::Decimal = lines.iter().map(|line| line.subtotal).sum();
    assert_eq!(sum, recorded.header.total);
}

#[tokio::test]
async fn test_sale_reports_low_stock() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 3, 2, dec!(10.00)).await;

    let recorded = coordinator(&fixture.db)
        .record_sale(sale(&fixture, vec![LineRequest::new(product, 2)]))
        .await
        .unwrap();

    assert_eq!(recorded.low_stock, vec![product]);
    assert!(recorded.stock_changes[0].below_minimum);

    let below = CatalogRepository::new(fixture.db.clone())
        .list_below_minimum()
        .await
        .unwrap();
    assert!(below.iter().any(|p| p.id == product.into_inner()));
}

// ============================================================================
// Insufficient stock
// ============================================================================

#[tokio::test]
async fn test_sale_against_empty_stock_fails_without_side_effects() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 0, 0, dec!(15.00)).await;

    let err = coordinator(&fixture.db)
        .record_sale(sale(&fixture, vec![LineRequest::new(product, 1)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Inventory(InventoryError::InsufficientStock {
            product_id,
            requested: 1,
            available: 0,
            shortfall: 1,
        }) if product_id == product
    ));
    assert_eq!(stock_of(&fixture.db, product).await, 0);
    assert_eq!(sales_for_client(&fixture).await, 0);
    assert_eq!(changes_for(&fixture, product).await, 0);
}

#[tokio::test]
async fn test_failure_on_third_line_leaves_first_two_untouched() {
    let Some(fixture) = setup().await else { return };
    let first = create_product(&fixture.db, 5, 0, dec!(1.00)).await;
    let second = create_product(&fixture.db, 5, 0, dec!(2.00)).await;
    let third = create_product(&fixture.db, 1, 0, dec!(3.00)).await;

    let err = coordinator(&fixture.db)
        .record_sale(sale(
            &fixture,
            vec![
                LineRequest::new(first, 2),
                LineRequest::new(second, 2),
                LineRequest::new(third, 3),
            ],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_inventory(),
        Some(InventoryError::InsufficientStock { product_id, shortfall: 2, .. }) if *product_id == third
    ));
    assert_eq!(stock_of(&fixture.db, first).await, 5);
    assert_eq!(stock_of(&fixture.db, second).await, 5);
    assert_eq!(stock_of(&fixture.db, third).await, 1);
    assert_eq!(sales_for_client(&fixture).await, 0);
    assert_eq!(changes_for(&fixture, first).await, 0);
    assert_eq!(changes_for(&fixture, second).await, 0);
}

#[tokio::test]
async fn test_repeated_product_is_checked_cumulatively() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 5, 0, dec!(9.99)).await;

    let err = coordinator(&fixture.db)
        .record_sale(sale(
            &fixture,
            vec![LineRequest::new(product, 3), LineRequest::new(product, 3)],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_inventory(),
        Some(InventoryError::InsufficientStock {
            requested: 6,
            available: 5,
            ..
        })
    ));
    assert_eq!(stock_of(&fixture.db, product).await, 5);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_empty_sale_rejected() {
    let Some(fixture) = setup().await else { return };

    let err = coordinator(&fixture.db)
        .record_sale(sale(&fixture, vec![]))
        .await
        .unwrap_err();

    assert!(matches!(err.as_inventory(), Some(InventoryError::EmptyBatch)));
    assert_eq!(sales_for_client(&fixture).await, 0);
}

#[tokio::test]
async fn test_non_positive_quantity_rejected() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 5, 0, dec!(1.00)).await;

    let err = coordinator(&fixture.db)
        .record_sale(sale(&fixture, vec![LineRequest::new(product, 0)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_inventory(),
        Some(InventoryError::NonPositiveQuantity { line: 1, quantity: 0 })
    ));
    assert_eq!(stock_of(&fixture.db, product).await, 5);
}

#[tokio::test]
async fn test_unknown_product_rejected() {
    let Some(fixture) = setup().await else { return };
    let missing = ProductId::new();

    let err = coordinator(&fixture.db)
        .record_sale(sale(&fixture, vec![LineRequest::new(missing, 1)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_inventory(),
        Some(InventoryError::ProductNotFound(id)) if *id == missing
    ));
}

#[tokio::test]
async fn test_unknown_client_rejected() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 5, 0, dec!(1.00)).await;
    let stranger = ClientId::new();

    let err = coordinator(&fixture.db)
        .record_sale(RecordSaleInput {
            client_id: stranger,
            ..sale(&fixture, vec![LineRequest::new(product, 1)])
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_inventory(),
        Some(InventoryError::ReferenceNotFound {
            kind: ReferenceKind::Client,
            ..
        })
    ));
    assert_eq!(stock_of(&fixture.db, product).await, 5);
}

#[tokio::test]
async fn test_inactive_product_cannot_be_sold() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 5, 0, dec!(1.00)).await;
    CatalogRepository::new(fixture.db.clone())
        .set_status(product, ProductStatus::Inactive)
        .await
        .unwrap();

    let err = coordinator(&fixture.db)
        .record_sale(sale(&fixture, vec![LineRequest::new(product, 1)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_inventory(),
        Some(InventoryError::ProductInactive(id)) if *id == product
    ));
    assert_eq!(stock_of(&fixture.db, product).await, 5);
}

#[tokio::test]
async fn test_caller_supplied_sale_price_rejected() {
    let Some(fixture) = setup().await else { return };
    let product = create_product(&fixture.db, 5, 0, dec!(100.00)).await;

    let err = coordinator(&fixture.db)
        .record_sale(sale(
            &fixture,
            vec![LineRequest::priced(product, 1, dec!(1.00))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_inventory(),
        Some(InventoryError::UnexpectedUnitPrice { line: 1 })
    ));
}
