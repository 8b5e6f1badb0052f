//! Read-only reconciliation of header totals and stock history.
//!
//! Divergences are logged as data-integrity warnings and returned to the
//! caller; nothing is ever corrected here.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use torque_core::inventory::{
    AuditReport, Divergence, HeaderKind, HeaderRef, InventoryError, LineSnapshot,
    StockHistoryEntry, StockReconciliation, TotalReconciliation, reconcile_stock, reconcile_total,
};
use torque_shared::types::ProductId;

use super::error::TransactionError;
use crate::entities::{
    inventory_movements, movement_lines, products, purchase_lines, purchases, sale_lines, sales,
    stock_changes,
};
use crate::unit_of_work::UnitOfWork;

/// Recomputes totals and stock from persisted rows and reports divergences.
#[derive(Debug, Clone)]
pub struct ReconciliationReporter {
    db: DatabaseConnection,
}

impl ReconciliationReporter {
    /// Creates a new reporter.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Compares a header's stored total with the sum of its line subtotals.
    ///
    /// Movements carry no total and always reconcile.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the header does not exist.
    pub async fn reconcile_header(
        &self,
        header: HeaderRef,
    ) -> Result<TotalReconciliation, TransactionError> {
        let reconciliation = header_reconciliation(&self.db, header).await?;
        if !reconciliation.is_consistent() {
            warn_total(header, &reconciliation);
        }
        Ok(reconciliation)
    }

    /// Recomputes a product's stock from its opening stock and change history.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` if the product does not exist.
    pub async fn reconcile_product(
        &self,
        product_id: ProductId,
    ) -> Result<StockReconciliation, TransactionError> {
        let product = products::Entity::find_by_id(product_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(InventoryError::ProductNotFound(product_id))?;

        let history: Vec<StockHistoryEntry> = stock_changes::Entity::find()
            .filter(stock_changes::Column::ProductId.eq(product.id))
            .order_by_asc(stock_changes::Column::Version)
            .all(&self.db)
            .await?
            .iter()
            .map(history_entry)
            .collect();

        let reconciliation =
            reconcile_stock(product_id, product.opening_stock, product.stock, &history);
        if !reconciliation.is_consistent() {
            warn_stock(&reconciliation);
        }
        Ok(reconciliation)
    }

    /// Audits every sale, purchase, and product against one consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be opened or a query fails.
    pub async fn audit_all(&self) -> Result<AuditReport, TransactionError> {
        let snapshot = UnitOfWork::snapshot(&self.db).await?;
        let txn = snapshot.transaction();
        let mut report = AuditReport::default();

        let mut sale_lines_by_header = group_lines(
            sale_lines::Entity::find()
                .order_by_asc(sale_lines::Column::LineNumber)
                .all(txn)
                .await?
                .into_iter()
                .map(|line| (line.sale_id, sale_snapshot(&line))),
        );
        for sale in sales::Entity::find()
            .order_by_asc(sales::Column::SoldAt)
            .all(txn)
            .await?
        {
            let lines = sale_lines_by_header.remove(&sale.id).unwrap_or_default();
            report.record_total(
                HeaderRef {
                    kind: HeaderKind::Sale,
                    id: sale.id,
                },
                reconcile_total(sale.total, &lines),
            );
        }

        let mut purchase_lines_by_header = group_lines(
            purchase_lines::Entity::find()
                .order_by_asc(purchase_lines::Column::LineNumber)
                .all(txn)
                .await?
                .into_iter()
                .map(|line| (line.purchase_id, purchase_snapshot(&line))),
        );
        for purchase in purchases::Entity::find()
            .order_by_asc(purchases::Column::PurchasedAt)
            .all(txn)
            .await?
        {
            let lines = purchase_lines_by_header
                .remove(&purchase.id)
                .unwrap_or_default();
            report.record_total(
                HeaderRef {
                    kind: HeaderKind::Purchase,
                    id: purchase.id,
                },
                reconcile_total(purchase.total, &lines),
            );
        }

        let mut history_by_product: HashMap<Uuid, Vec<StockHistoryEntry>> = HashMap::new();
        for change in stock_changes::Entity::find()
            .order_by_asc(stock_changes::Column::ProductId)
            .order_by_asc(stock_changes::Column::Version)
            .all(txn)
            .await?
        {
            history_by_product
                .entry(change.product_id)
                .or_default()
                .push(history_entry(&change));
        }
        for product in products::Entity::find()
            .order_by_asc(products::Column::Sku)
            .all(txn)
            .await?
        {
            let history = history_by_product.remove(&product.id).unwrap_or_default();
            report.record_stock(reconcile_stock(
                ProductId::from_uuid(product.id),
                product.opening_stock,
                product.stock,
                &history,
            ));
        }

        snapshot.rollback().await?;

        for divergence in &report.divergences {
            match divergence {
                Divergence::HeaderTotal {
                    header,
                    reconciliation,
                } => warn_total(*header, reconciliation),
                Divergence::Stock { reconciliation } => warn_stock(reconciliation),
            }
        }

        tracing::info!(
            headers_checked = report.headers_checked,
            products_checked = report.products_checked,
            divergences = report.divergences.len(),
            "Audit finished"
        );

        Ok(report)
    }
}

async fn header_reconciliation<C: ConnectionTrait>(
    conn: &C,
    header: HeaderRef,
) -> Result<TotalReconciliation, TransactionError> {
    match header.kind {
        HeaderKind::Sale => {
            let sale = sales::Entity::find_by_id(header.id)
                .one(conn)
                .await?
                .ok_or(TransactionError::NotFound(header.id))?;
            let lines: Vec<LineSnapshot> = sale_lines::Entity::find()
                .filter(sale_lines::Column::SaleId.eq(header.id))
                .order_by_asc(sale_lines::Column::LineNumber)
                .all(conn)
                .await?
                .iter()
                .map(sale_snapshot)
                .collect();
            Ok(reconcile_total(sale.total, &lines))
        }
        HeaderKind::Purchase => {
            let purchase = purchases::Entity::find_by_id(header.id)
                .one(conn)
                .await?
                .ok_or(TransactionError::NotFound(header.id))?;
            let lines: Vec<LineSnapshot> = purchase_lines::Entity::find()
                .filter(purchase_lines::Column::PurchaseId.eq(header.id))
                .order_by_asc(purchase_lines::Column::LineNumber)
                .all(conn)
                .await?
                .iter()
                .map(purchase_snapshot)
                .collect();
            Ok(reconcile_total(purchase.total, &lines))
        }
        HeaderKind::Movement => {
            inventory_movements::Entity::find_by_id(header.id)
                .one(conn)
                .await?
                .ok_or(TransactionError::NotFound(header.id))?;
            let line_count = movement_lines::Entity::find()
                .filter(movement_lines::Column::MovementId.eq(header.id))
                .count(conn)
                .await?;
            Ok(TotalReconciliation {
                header_total: Decimal::ZERO,
                recomputed_total: Decimal::ZERO,
                line_count: usize::try_from(line_count).unwrap_or(usize::MAX),
                mismatched_lines: Vec::new(),
            })
        }
    }
}

fn group_lines(
    lines: impl Iterator<Item = (Uuid, LineSnapshot)>,
) -> HashMap<Uuid, Vec<LineSnapshot>> {
    let mut grouped: HashMap<Uuid, Vec<LineSnapshot>> = HashMap::new();
    for (header_id, line) in lines {
        grouped.entry(header_id).or_default().push(line);
    }
    grouped
}

fn sale_snapshot(line: &sale_lines::Model) -> LineSnapshot {
    LineSnapshot {
        line_number: line.line_number,
        quantity: line.quantity,
        unit_price: line.unit_price,
        subtotal: line.subtotal,
    }
}

fn purchase_snapshot(line: &purchase_lines::Model) -> LineSnapshot {
    LineSnapshot {
        line_number: line.line_number,
        quantity: line.quantity,
        unit_price: line.unit_price,
        subtotal: line.subtotal,
    }
}

fn history_entry(change: &stock_changes::Model) -> StockHistoryEntry {
    StockHistoryEntry {
        version: change.version,
        delta: change.delta,
        stock_before: change.stock_before,
        stock_after: change.stock_after,
    }
}

fn warn_total(header: HeaderRef, reconciliation: &TotalReconciliation) {
    tracing::warn!(
        kind = %header.kind,
        header_id = %header.id,
        header_total = %reconciliation.header_total,
        recomputed_total = %reconciliation.recomputed_total,
        mismatched_lines = ?reconciliation.mismatched_lines,
        "Header total diverges from its lines"
    );
}

fn warn_stock(reconciliation: &StockReconciliation) {
    tracing::warn!(
        product_id = %reconciliation.product_id,
        live_stock = reconciliation.live_stock,
        recomputed_stock = reconciliation.recomputed_stock,
        issues = ?reconciliation.issues,
        "Product stock diverges from its history"
    );
}
