//! Stock and totals auditor for Torque.
//!
//! Reconciles every committed sale and purchase total against its lines and
//! every product's stock against its change history, all from one snapshot.
//! Prints the report as JSON and exits non-zero when anything diverges.
//! Nothing is corrected.
//!
//! Usage: cargo run --bin auditor

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use torque_db::{CatalogRepository, ReconciliationReporter};
use torque_shared::AppConfig;

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

    let report = ReconciliationReporter::new(db.clone())
        .audit_all()
        .await
        .context("Audit failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    let low_stock = CatalogRepository::new(db).list_below_minimum().await?;
    for product in &low_stock {
        tracing::warn!(
            sku = %product.sku,
            stock = product.stock,
            stock_minimum = product.stock_minimum,
            "Product below reorder threshold"
        );
    }

    if !report.is_clean() {
        anyhow::bail!(
            "{} divergence(s) found across {} header(s) and {} product(s)",
            report.divergences.len(),
            report.headers_checked,
            report.products_checked
        );
    }

    tracing::info!(
        headers_checked = report.headers_checked,
        products_checked = report.products_checked,
        low_stock = low_stock.len(),
        "Audit clean"
    );
    Ok(())
}
