//! Stock mutator: the only code that writes `products.stock`.
//!
//! Each call locks the product row, checks the new value against the
//! non-negativity invariant, writes it, and appends one `stock_changes` row,
//! all inside the caller's transaction.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use uuid::Uuid;

use torque_core::inventory::{HeaderRef, InventoryError, ProductStock};
use torque_shared::types::ProductId;

use super::error::TransactionError;
use super::retry::RetryPolicy;
use crate::entities::{products, stock_changes};
use crate::unit_of_work::UnitOfWork;

/// Outcome of one applied stock delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockChange {
    /// The product.
    pub product_id: ProductId,
    /// Position of this change in the product's history.
    pub version: i64,
    /// Signed delta applied.
    pub delta: i32,
    /// Stock before the delta.
    pub stock_before: i32,
    /// Stock after the delta.
    pub stock_after: i32,
    /// True if `stock_after` sits below the product's reorder threshold.
    pub below_minimum: bool,
}

/// Applies signed stock deltas under a row lock.
#[derive(Debug, Clone)]
pub struct StockMutator {
    db: DatabaseConnection,
    policy: RetryPolicy,
}

impl StockMutator {
    /// Creates a new stock mutator.
    #[must_use]
    pub const fn new(db: DatabaseConnection, policy: RetryPolicy) -> Self {
        Self { db, policy }
    }

    /// Applies `delta` to the product's stock inside `txn`.
    ///
    /// The row stays locked until `txn` ends, so the read-modify-write cannot
    /// interleave with another writer. Nothing is visible to other readers
    /// until the caller commits.
    ///
    /// # Errors
    ///
    /// - `ZeroDelta` if `delta == 0`
    /// - `ProductNotFound` if the product does not exist
    /// - `InsufficientStock` if stock would go negative; stock is left unchanged
    /// - `Contention` if the row lock is not granted within the lock timeout
    pub async fn apply(
        &self,
        txn: &DatabaseTransaction,
        product_id: ProductId,
        delta: i32,
        source: HeaderRef,
    ) -> Result<StockChange, TransactionError> {
        if delta == 0 {
            return Err(InventoryError::ZeroDelta(product_id).into());
        }

        let contended = |err: DbErr| TransactionError::classify(err, Some(product_id));

        let model = products::Entity::find_by_id(product_id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(contended)?
            .ok_or(InventoryError::ProductNotFound(product_id))?;

        let current = ProductStock::from(&model);
        let stock_after = current.stock_after(delta)?;

        let mut product: products::ActiveModel = model.into();
        product.stock = Set(stock_after);
        product.updated_at = Set(chrono::Utc::now().into());
        product.update(txn).await.map_err(contended)?;

        let version = next_version(txn, product_id).await.map_err(contended)?;

        stock_changes::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id.into_inner()),
            version: Set(version),
            delta: Set(delta),
            stock_before: Set(current.stock),
            stock_after: Set(stock_after),
            source_kind: Set(source.kind.into()),
            source_id: Set(source.id),
            created_at: Set(chrono::Utc::now().into()),
        }
        .insert(txn)
        .await
        .map_err(contended)?;

        tracing::debug!(
            %product_id,
            delta,
            stock_before = current.stock,
            stock_after,
            version,
            source = %source.kind,
            source_id = %source.id,
            "Stock mutated"
        );

        Ok(StockChange {
            product_id,
            version,
            delta,
            stock_before: current.stock,
            stock_after,
            below_minimum: stock_after < current.stock_minimum,
        })
    }

    /// Applies `delta` in a unit of work of its own and commits before returning.
    ///
    /// Lock contention is retried with the mutator's backoff, each attempt in
    /// a fresh unit of work.
    ///
    /// # Errors
    ///
    /// Same as [`Self::apply`], plus any failure to begin or commit, except
    /// that contention outlasting every attempt is reported as
    /// `ConcurrentModification`.
    pub async fn apply_in_own_unit(
        &self,
        product_id: ProductId,
        delta: i32,
        source: HeaderRef,
    ) -> Result<StockChange, TransactionError> {
        self.policy
            .run(source.kind, move || self.apply_once(product_id, delta, source))
            .await
    }

    async fn apply_once(
        &self,
        product_id: ProductId,
        delta: i32,
        source: HeaderRef,
    ) -> Result<StockChange, TransactionError> {
        let uow = UnitOfWork::begin(&self.db, self.policy.lock_timeout).await?;

        let applied = self.apply(uow.transaction(), product_id, delta, source).await;
        match applied {
            Ok(change) => {
                uow.commit().await?;
                Ok(change)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::warn!(%product_id, error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

async fn next_version(
    txn: &DatabaseTransaction,
    product_id: ProductId,
) -> Result<i64, DbErr> {
    let latest = stock_changes::Entity::find()
        .filter(stock_changes::Column::ProductId.eq(product_id.into_inner()))
        .order_by_desc(stock_changes::Column::Version)
        .one(txn)
        .await?;

    Ok(latest.map_or(1, |change| change.version + 1))
}
