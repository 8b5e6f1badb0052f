//! Database seeder for Torque development and testing.
//!
//! Seeds a walk-in client, a counter employee, a parts supplier, a small
//! catalog, and one opening purchase that brings the catalog to its starting
//! stock. Products are created with zero stock; every unit on hand arrives
//! through the coordinator, so the stock history reconciles from day one.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use torque_core::inventory::LineRequest;
use torque_db::entities::{clients, employees, products, suppliers};
use torque_db::repositories::{CatalogRepository, CreateProductInput, RecordPurchaseInput};
use torque_db::{RetryPolicy, TransactionCoordinator};
use torque_shared::AppConfig;
use torque_shared::types::{EmployeeId, ProductId, SupplierId};

/// Walk-in client ID (consistent for all seeds)
const CLIENT_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Counter employee ID, also the purchasing manager
const EMPLOYEE_ID: &str = "00000000-0000-0000-0000-000000000002";
/// Parts supplier ID
const SUPPLIER_ID: &str = "00000000-0000-0000-0000-000000000003";

/// A catalog entry and the units bought to open the shop.
struct SeedProduct {
    sku: &'static str,
    name: &'static str,
    stock_minimum: i32,
    purchase_price: Decimal,
    sale_price: Decimal,
    opening_units: i32,
}

fn catalog() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            sku: "CHN-520-118",
            name: "Drive chain 520 x 118",
            stock_minimum: 3,
            purchase_price: Decimal::new(3_200, 2),
            sale_price: Decimal::new(4_550, 2),
            opening_units: 12,
        },
        SeedProduct {
            sku: "SPR-15T",
            name: "Front sprocket 15T",
            stock_minimum: 5,
            purchase_price: Decimal::new(1_800, 2),
            sale_price: Decimal::new(3_000, 2),
            opening_units: 20,
        },
        SeedProduct {
            sku: "BRK-PAD-FR",
            name: "Front brake pads",
            stock_minimum: 4,
            purchase_price: Decimal::new(900, 2),
            sale_price: Decimal::new(1_650, 2),
            opening_units: 8,
        },
        SeedProduct {
            sku: "OIL-10W40-1L",
            name: "Engine oil 10W-40, 1 L",
            stock_minimum: 10,
            purchase_price: Decimal::new(650, 2),
            sale_price: Decimal::new(1_100, 2),
            opening_units: 40,
        },
        SeedProduct {
            sku: "SPK-CR7HSA",
            name: "Spark plug CR7HSA",
            stock_minimum: 6,
            purchase_price: Decimal::new(250, 2),
            sale_price: Decimal::new(500, 2),
            opening_units: 0,
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "torque=debug,sea_orm=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = torque_db::connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Seeding reference parties");
    seed_parties(&db).await?;

    tracing::info!("Seeding catalog");
    let mut opening_lines = Vec::new();
    for entry in catalog() {
        if let Some(product_id) = seed_product(&db, &entry).await?
            && entry.opening_units > 0
        {
            opening_lines.push(LineRequest::priced(
                product_id,
                entry.opening_units,
                entry.purchase_price,
            ));
        }
    }

    if opening_lines.is_empty() {
        tracing::info!("Catalog already seeded, skipping opening purchase");
        return Ok(());
    }

    tracing::info!(lines = opening_lines.len(), "Recording opening purchase");
    let coordinator = TransactionCoordinator::new(db, RetryPolicy::from(config.stock));
    let recorded = coordinator
        .record_purchase(RecordPurchaseInput {
            supplier_id: SupplierId::from_uuid(fixed_id(SUPPLIER_ID)?),
            manager_id: EmployeeId::from_uuid(fixed_id(EMPLOYEE_ID)?),
            lines: opening_lines,
        })
        .await
        .context("Failed to record opening purchase")?;

    tracing::info!(
        purchase_id = %recorded.header.id,
        total = %recorded.header.total,
        "Seeding complete"
    );
    Ok(())
}

fn fixed_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Invalid seed id {id}"))
}

/// Seeds the client, employee, and supplier, skipping rows that already exist.
async fn seed_parties(db: &DatabaseConnection) -> anyhow::Result<()> {
    let now = Utc::now();

    let client_id = fixed_id(CLIENT_ID)?;
    if clients::Entity::find_by_id(client_id).one(db).await?.is_none() {
        clients::ActiveModel {
            id: Set(client_id),
            name: Set("Walk-in client".to_string()),
            is_active: Set(true),
            created_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        tracing::info!(%client_id, "Created client");
    }

    let employee_id = fixed_id(EMPLOYEE_ID)?;
    if employees::Entity::find_by_id(employee_id)
        .one(db)
        .await?
        .is_none()
    {
        employees::ActiveModel {
            id: Set(employee_id),
            name: Set("Counter employee".to_string()),
            is_active: Set(true),
            created_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        tracing::info!(%employee_id, "Created employee");
    }

    let supplier_id = fixed_id(SUPPLIER_ID)?;
    if suppliers::Entity::find_by_id(supplier_id)
        .one(db)
        .await?
        .is_none()
    {
        suppliers::ActiveModel {
            id: Set(supplier_id),
            name: Set("Parts wholesaler".to_string()),
            is_active: Set(true),
            created_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        tracing::info!(%supplier_id, "Created supplier");
    }

    Ok(())
}

/// Creates a product with zero stock. Returns `None` if the SKU already exists.
async fn seed_product(
    db: &DatabaseConnection,
    entry: &SeedProduct,
) -> anyhow::Result<Option<ProductId>> {
    let existing = products::Entity::find()
        .filter(products::Column::Sku.eq(entry.sku))
        .one(db)
        .await?;
    if existing.is_some() {
        tracing::debug!(sku = entry.sku, "Product already exists, skipping");
        return Ok(None);
    }

    let product = CatalogRepository::new(db.clone())
        .create_product(CreateProductInput {
            sku: entry.sku.to_string(),
            name: entry.name.to_string(),
            opening_stock: 0,
            stock_minimum: entry.stock_minimum,
            purchase_price: entry.purchase_price,
            sale_price: entry.sale_price,
        })
        .await?;

    tracing::info!(sku = %product.sku, product_id = %product.id, "Created product");
    Ok(Some(ProductId::from_uuid(product.id)))
}
