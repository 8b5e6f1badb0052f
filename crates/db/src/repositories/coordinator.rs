//! Transaction coordinator: one all-or-nothing unit of work per sale,
//! purchase, or inventory movement.
//!
//! Every request follows the same path:
//!
//! 1. Check the request shape (before any lock is taken)
//! 2. Begin a unit of work with a bounded lock wait
//! 3. Resolve client, employee, and supplier references
//! 4. Lock every touched product row in ascending id order
//! 5. Build the priced batch against the locked rows
//! 6. Insert the header, then each line followed by its stock mutation
//! 7. Recompute the total from the persisted lines and store it
//! 8. Commit
//!
//! Any failure rolls the whole unit of work back. Lock contention is retried
//! with a linear backoff and reported as `ConcurrentModification` once the
//! retry budget is spent.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use torque_core::inventory::{
    ErrorCategory, HeaderKind, HeaderRef, InventoryError, LineItemBatch, LineRequest,
    LineSnapshot, MovementKind, PricedLineItem, ReferenceKind, TransactionKind, UnitOfWorkState,
    lock_order, reconcile_total,
};
use torque_shared::types::{ClientId, EmployeeId, ProductId, SupplierId};

use super::catalog::CatalogRepository;
use super::error::TransactionError;
use super::retry::RetryPolicy;
use super::stock::{StockChange, StockMutator};
use crate::entities::{
    inventory_movements, movement_lines, purchase_lines, purchases, sale_lines, sales,
    sea_orm_active_enums::PaymentMethod,
};
use crate::unit_of_work::UnitOfWork;

/// Input for recording a sale.
#[derive(Debug, Clone)]
pub struct RecordSaleInput {
    /// Client buying.
    pub client_id: ClientId,
    /// Employee recording the sale.
    pub employee_id: EmployeeId,
    /// How the client pays.
    pub payment_method: PaymentMethod,
    /// Products and quantities; prices come from the catalog.
    pub lines: Vec<LineRequest>,
}

/// Input for recording a purchase.
#[derive(Debug, Clone)]
pub struct RecordPurchaseInput {
    /// Supplier selling.
    pub supplier_id: SupplierId,
    /// Employee in charge of the purchase.
    pub manager_id: EmployeeId,
    /// Products, quantities, and negotiated unit prices.
    pub lines: Vec<LineRequest>,
}

/// Input for recording a manual inventory movement.
#[derive(Debug, Clone)]
pub struct RecordMovementInput {
    /// Employee recording the movement.
    pub employee_id: EmployeeId,
    /// Product moved.
    pub product_id: ProductId,
    /// In or out.
    pub kind: MovementKind,
    /// Units moved.
    pub quantity: i32,
    /// Free-form reason.
    pub note: Option<String>,
}

/// A stock-changing request, tagged by kind.
#[derive(Debug, Clone)]
pub enum TransactionRequest {
    /// A sale.
    Sale(RecordSaleInput),
    /// A purchase.
    Purchase(RecordPurchaseInput),
    /// A manual movement.
    Movement(RecordMovementInput),
}

impl TransactionRequest {
    /// Returns the transaction kind.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        match self {
            Self::Sale(_) => TransactionKind::Sale,
            Self::Purchase(_) => TransactionKind::Purchase,
            Self::Movement(input) => TransactionKind::movement(input.kind),
        }
    }

    /// Returns the requested lines; a movement is a single line.
    #[must_use]
    pub fn lines(&self) -> Vec<LineRequest> {
        match self {
            Self::Sale(input) => input.lines.clone(),
            Self::Purchase(input) => input.lines.clone(),
            Self::Movement(input) => vec![LineRequest::new(input.product_id, input.quantity)],
        }
    }

    /// Returns the reference-data rows the request points at.
    #[must_use]
    pub fn references(&self) -> Vec<(ReferenceKind, Uuid)> {
        match self {
            Self::Sale(input) => vec![
                (ReferenceKind::Client, input.client_id.into_inner()),
                (ReferenceKind::Employee, input.employee_id.into_inner()),
            ],
            Self::Purchase(input) => vec![
                (ReferenceKind::Supplier, input.supplier_id.into_inner()),
                (ReferenceKind::Manager, input.manager_id.into_inner()),
            ],
            Self::Movement(input) => {
                vec![(ReferenceKind::Employee, input.employee_id.into_inner())]
            }
        }
    }
}

/// A committed header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "header", rename_all = "lowercase")]
pub enum Header {
    /// A sale.
    Sale(sales::Model),
    /// A purchase.
    Purchase(purchases::Model),
    /// A manual movement.
    Movement(inventory_movements::Model),
}

impl Header {
    /// Returns the header's id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::Sale(model) => model.id,
            Self::Purchase(model) => model.id,
            Self::Movement(model) => model.id,
        }
    }

    /// Returns the monetary total; movements carry none.
    #[must_use]
    pub const fn total(&self) -> Option<Decimal> {
        match self {
            Self::Sale(model) => Some(model.total),
            Self::Purchase(model) => Some(model.total),
            Self::Movement(_) => None,
        }
    }
}

/// Result of a committed unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recorded<H> {
    /// The committed header.
    pub header: H,
    /// Priced lines in request order.
    pub lines: Vec<PricedLineItem>,
    /// Stock changes in the order they were applied.
    pub stock_changes: Vec<StockChange>,
    /// Products left below their reorder threshold, in ascending id order.
    pub low_stock: Vec<ProductId>,
}

impl Recorded<Header> {
    fn narrow<H>(
        self,
        pick: impl FnOnce(Header) -> Option<H>,
    ) -> Result<Recorded<H>, TransactionError> {
        let header_id = self.header.id();
        let header = pick(self.header).ok_or_else(|| {
            InventoryError::integrity(format!("header {header_id} committed as the wrong kind"))
        })?;

        Ok(Recorded {
            header,
            lines: self.lines,
            stock_changes: self.stock_changes,
            low_stock: self.low_stock,
        })
    }
}

/// Coordinates header, line item, and stock writes into one unit of work.
#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    db: DatabaseConnection,
    policy: RetryPolicy,
    mutator: StockMutator,
}

impl TransactionCoordinator {
    /// Creates a new coordinator.
    #[must_use]
    pub fn new(db: DatabaseConnection, policy: RetryPolicy) -> Self {
        let mutator = StockMutator::new(db.clone(), policy);
        Self {
            db,
            policy,
            mutator,
        }
    }

    /// Records a sale priced at the current catalog sale prices.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request is malformed or a reference does not resolve
    /// - A product is unknown or inactive
    /// - Stock is insufficient for any line
    /// - Product locks stay contended after every retry
    #[instrument(
        skip(self, input),
        fields(
            client_id = %input.client_id,
            employee_id = %input.employee_id,
            lines = input.lines.len()
        ),
        err
    )]
    pub async fn record_sale(
        &self,
        input: RecordSaleInput,
    ) -> Result<Recorded<sales::Model>, TransactionError> {
        self.execute(TransactionRequest::Sale(input))
            .await?
            .narrow(|header| match header {
                Header::Sale(model) => Some(model),
                _ => None,
            })
    }

    /// Records a purchase at caller-supplied unit prices.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is malformed, a reference or product
    /// does not resolve, or product locks stay contended after every retry.
    #[instrument(
        skip(self, input),
        fields(
            supplier_id = %input.supplier_id,
            manager_id = %input.manager_id,
            lines = input.lines.len()
        ),
        err
    )]
    pub async fn record_purchase(
        &self,
        input: RecordPurchaseInput,
    ) -> Result<Recorded<purchases::Model>, TransactionError> {
        self.execute(TransactionRequest::Purchase(input))
            .await?
            .narrow(|header| match header {
                Header::Purchase(model) => Some(model),
                _ => None,
            })
    }

    /// Records a manual inventory movement.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is not positive, the employee or
    /// product does not resolve, an outbound movement exceeds stock, or the
    /// product lock stays contended after every retry.
    #[instrument(
        skip(self, input),
        fields(
            employee_id = %input.employee_id,
            product_id = %input.product_id,
            kind = %input.kind
        ),
        err
    )]
    pub async fn record_movement(
        &self,
        input: RecordMovementInput,
    ) -> Result<Recorded<inventory_movements::Model>, TransactionError> {
        self.execute(TransactionRequest::Movement(input))
            .await?
            .narrow(|header| match header {
                Header::Movement(model) => Some(model),
                _ => None,
            })
    }

    /// Runs a request to completion, retrying on lock contention.
    ///
    /// # Errors
    ///
    /// Returns the first non-contention failure, or `ConcurrentModification`
    /// once every attempt has lost a lock race.
    pub async fn execute(
        &self,
        request: TransactionRequest,
    ) -> Result<Recorded<Header>, TransactionError> {
        let kind = request.kind();
        let lines = request.lines();

        // Malformed requests never take locks.
        LineItemBatch::check_shape(kind, &lines)?;

        let (request, lines) = (&request, lines.as_slice());
        self.policy
            .run(kind, move || self.attempt(request, kind, lines))
            .await
    }

    async fn attempt(
        &self,
        request: &TransactionRequest,
        kind: TransactionKind,
        lines: &[LineRequest],
    ) -> Result<Recorded<Header>, TransactionError> {
        let mut state = UnitOfWorkState::Building;
        let uow = UnitOfWork::begin(&self.db, self.policy.lock_timeout).await?;

        let applied = self
            .apply(uow.transaction(), request, kind, lines, &mut state)
            .await;

        let recorded = match applied {
            Ok(recorded) => recorded,
            Err(err) => {
                state = state.advance(UnitOfWorkState::Aborted)?;
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(%kind, error = %rollback_err, "Rollback failed");
                }
                log_abort(kind, state, &err);
                return Err(err);
            }
        };

        uow.commit().await?;
        state = state.advance(UnitOfWorkState::Committed)?;

        info!(
            %kind,
            header_id = %recorded.header.id(),
            total = ?recorded.header.total(),
            lines = recorded.lines.len(),
            state = ?state,
            "Unit of work committed"
        );
        for product_id in &recorded.low_stock {
            warn!(%product_id, %kind, "Stock below minimum");
        }

        Ok(recorded)
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        request: &TransactionRequest,
        kind: TransactionKind,
        lines: &[LineRequest],
        state: &mut UnitOfWorkState,
    ) -> Result<Recorded<Header>, TransactionError> {
        *state = state.advance(UnitOfWorkState::Validating)?;

        for (reference, id) in request.references() {
            CatalogRepository::ensure_reference(txn, reference, id).await?;
        }

        let product_ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        let locked = CatalogRepository::lock_products(txn, &product_ids).await?;
        let batch = LineItemBatch::build(kind, lines, |id| locked.get(&id).cloned())?;

        *state = state.advance(UnitOfWorkState::Applying)?;

        let header_id = Uuid::new_v4();
        let source = HeaderRef {
            kind: kind.header_kind(),
            id: header_id,
        };
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

        let header = insert_header(txn, request, header_id, now).await?;

        let mut stock_changes = Vec::with_capacity(batch.lines().len());
        for line in batch.lines() {
            insert_line(txn, source, line).await?;
            let change = self
                .mutator
                .apply(txn, line.product_id, kind.signed_delta(line.quantity), source)
                .await?;
            stock_changes.push(change);
        }

        let header = if kind.carries_total() {
            finalize_total(txn, header, &batch).await?
        } else {
            header
        };

        debug!(%kind, header_id = %header_id, "Unit of work applied");

        Ok(Recorded {
            header,
            lines: batch.lines().to_vec(),
            low_stock: low_stock(&stock_changes),
            stock_changes,
        })
    }
}

async fn insert_header(
    txn: &DatabaseTransaction,
    request: &TransactionRequest,
    header_id: Uuid,
    now: sea_orm::prelude::DateTimeWithTimeZone,
) -> Result<Header, TransactionError> {
    let header = match request {
        TransactionRequest::Sale(input) => Header::Sale(
            sales::ActiveModel {
                id: Set(header_id),
                client_id: Set(input.client_id.into_inner()),
                employee_id: Set(input.employee_id.into_inner()),
                payment_method: Set(input.payment_method),
                total: Set(Decimal::ZERO),
                sold_at: Set(now),
                created_at: Set(now),
            }
            .insert(txn)
            .await?,
        ),
        TransactionRequest::Purchase(input) => Header::Purchase(
            purchases::ActiveModel {
                id: Set(header_id),
                supplier_id: Set(input.supplier_id.into_inner()),
                manager_id: Set(input.manager_id.into_inner()),
                total: Set(Decimal::ZERO),
                purchased_at: Set(now),
                created_at: Set(now),
            }
            .insert(txn)
            .await?,
        ),
        TransactionRequest::Movement(input) => Header::Movement(
            inventory_movements::ActiveModel {
                id: Set(header_id),
                employee_id: Set(input.employee_id.into_inner()),
                kind: Set(input.kind.into()),
                note: Set(input.note.clone()),
                moved_at: Set(now),
                created_at: Set(now),
            }
            .insert(txn)
            .await?,
        ),
    };

    Ok(header)
}

async fn insert_line(
    txn: &DatabaseTransaction,
    source: HeaderRef,
    line: &PricedLineItem,
) -> Result<(), TransactionError> {
    let priced = || {
        line.unit_price.ok_or_else(|| {
            InventoryError::integrity(format!(
                "line {} of {} {} has no unit price",
                line.line_number, source.kind, source.id
            ))
        })
    };

    match source.kind {
        HeaderKind::Sale => {
            sale_lines::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(source.id),
                line_number: Set(line.line_number),
                product_id: Set(line.product_id.into_inner()),
                quantity: Set(line.quantity),
                unit_price: Set(priced()?),
                subtotal: Set(line.subtotal),
            }
            .insert(txn)
            .await?;
        }
        HeaderKind::Purchase => {
            purchase_lines::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_id: Set(source.id),
                line_number: Set(line.line_number),
                product_id: Set(line.product_id.into_inner()),
                quantity: Set(line.quantity),
                unit_price: Set(priced()?),
                subtotal: Set(line.subtotal),
            }
            .insert(txn)
            .await?;
        }
        HeaderKind::Movement => {
            movement_lines::ActiveModel {
                id: Set(Uuid::new_v4()),
                movement_id: Set(source.id),
                line_number: Set(line.line_number),
                product_id: Set(line.product_id.into_inner()),
                quantity: Set(line.quantity),
            }
            .insert(txn)
            .await?;
        }
    }

    Ok(())
}

/// Recomputes the total from the persisted lines and writes it to the header.
async fn finalize_total(
    txn: &DatabaseTransaction,
    header: Header,
    batch: &LineItemBatch,
) -> Result<Header, TransactionError> {
    let header_id = header.id();
    let snapshots = persisted_lines(txn, &header).await?;
    let reconciliation = reconcile_total(batch.total(), &snapshots);

    if !reconciliation.is_consistent() {
        let subtotals: Vec<String> = snapshots
            .iter()
            .map(|line| format!("#{}={}", line.line_number, line.subtotal))
            .collect();
        error!(
            kind = %batch.kind(),
            %header_id,
            expected = %batch.total(),
            recomputed = %reconciliation.recomputed_total,
            mismatched_lines = ?reconciliation.mismatched_lines,
            subtotals = ?subtotals,
            "Header total does not match its persisted lines"
        );
        return Err(InventoryError::TotalMismatch {
            expected: batch.total(),
            recomputed: reconciliation.recomputed_total,
        }
        .into());
    }

    let total = reconciliation.recomputed_total;
    let header = match header {
        Header::Sale(model) => {
            let mut active: sales::ActiveModel = model.into();
            active.total = Set(total);
            Header::Sale(active.update(txn).await?)
        }
        Header::Purchase(model) => {
            let mut active: purchases::ActiveModel = model.into();
            active.total = Set(total);
            Header::Purchase(active.update(txn).await?)
        }
        Header::Movement(_) => {
            return Err(InventoryError::integrity(format!(
                "movement {header_id} cannot carry a total"
            ))
            .into());
        }
    };

    Ok(header)
}

async fn persisted_lines(
    txn: &DatabaseTransaction,
    header: &Header,
) -> Result<Vec<LineSnapshot>, TransactionError> {
    let snapshots = match header {
        Header::Sale(model) => sale_lines::Entity::find()
            .filter(sale_lines::Column::SaleId.eq(model.id))
            .order_by_asc(sale_lines::Column::LineNumber)
            .all(txn)
            .await?
            .into_iter()
            .map(|line| LineSnapshot {
                line_number: line.line_number,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
            })
            .collect(),
        Header::Purchase(model) => purchase_lines::Entity::find()
            .filter(purchase_lines::Column::PurchaseId.eq(model.id))
            .order_by_asc(purchase_lines::Column::LineNumber)
            .all(txn)
            .await?
            .into_iter()
            .map(|line| LineSnapshot {
                line_number: line.line_number,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
            })
            .collect(),
        Header::Movement(_) => Vec::new(),
    };

    Ok(snapshots)
}

/// Products whose final stock in this unit of work sits below their minimum.
fn low_stock(changes: &[StockChange]) -> Vec<ProductId> {
    let products = lock_order(changes.iter().map(|change| change.product_id));
    products
        .into_iter()
        .filter(|product_id| {
            changes
                .iter()
                .rev()
                .find(|change| change.product_id == *product_id)
                .is_some_and(|change| change.below_minimum)
        })
        .collect()
}

fn log_abort(kind: TransactionKind, state: UnitOfWorkState, err: &TransactionError) {
    let integrity = err
        .as_inventory()
        .is_some_and(|inner| inner.category() == ErrorCategory::Integrity);

    if integrity {
        error!(%kind, state = ?state, error = %err, "Unit of work aborted on integrity failure");
    } else {
        debug!(%kind, state = ?state, error = %err, "Unit of work aborted");
    }
}
