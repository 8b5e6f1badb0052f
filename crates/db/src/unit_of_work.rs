//! Unit-of-work transaction boundary.
//!
//! Every stock-changing operation runs inside exactly one [`UnitOfWork`]: a
//! database transaction with a bounded lock wait. Dropping a unit of work
//! without committing rolls it back, so a cancelled caller leaves no trace.
//!
//! # Usage
//!
//! ```ignore
//! use torque_db::unit_of_work::UnitOfWorkExt;
//!
//! let uow = db.unit_of_work(Duration::from_millis(2000)).await?;
//! let product = Products::find_by_id(id)
//!     .lock_exclusive()
//!     .one(uow.transaction())
//!     .await?;
//! uow.commit().await?;
//! ```

use std::time::Duration;

use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel,
    TransactionTrait,
};

/// A database transaction scoped to one stock-changing operation.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
}

impl UnitOfWork {
    /// Begins a unit of work whose row-lock waits give up after `lock_timeout`.
    ///
    /// The timeout is set with `SET LOCAL`, so it ends with the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the timeout
    /// cannot be set.
    pub async fn begin(db: &DatabaseConnection, lock_timeout: Duration) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        set_lock_timeout(&txn, lock_timeout).await?;
        Ok(Self { txn })
    }

    /// Begins a read-only snapshot for audits.
    ///
    /// Repeatable read gives every query in the audit the same view of the data.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub async fn snapshot(db: &DatabaseConnection) -> Result<Self, DbErr> {
        let txn = db
            .begin_with_config(
                Some(IsolationLevel::RepeatableRead),
                Some(AccessMode::ReadOnly),
            )
            .await?;
        Ok(Self { txn })
    }

    /// Returns the underlying transaction for executing queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the unit of work, making every change visible at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; nothing is persisted in that case.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Rolls back the unit of work, discarding all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

/// Extension trait for `DatabaseConnection` to open units of work.
#[async_trait::async_trait]
pub trait UnitOfWorkExt {
    /// Begins a unit of work with the given lock timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit of work cannot be started.
    async fn unit_of_work(&self, lock_timeout: Duration) -> Result<UnitOfWork, DbErr>;
}

#[async_trait::async_trait]
impl UnitOfWorkExt for DatabaseConnection {
    async fn unit_of_work(&self, lock_timeout: Duration) -> Result<UnitOfWork, DbErr> {
        UnitOfWork::begin(self, lock_timeout).await
    }
}

/// Sets the lock timeout on an existing transaction.
///
/// # Errors
///
/// Returns an error if the setting cannot be applied.
pub async fn set_lock_timeout(txn: &DatabaseTransaction, timeout: Duration) -> Result<(), DbErr> {
    txn.execute_unprepared(&lock_timeout_sql(timeout)).await?;
    Ok(())
}

fn lock_timeout_sql(timeout: Duration) -> String {
    // Zero would mean "wait forever" to PostgreSQL.
    let millis = timeout.as_millis().max(1);
    format!("SET LOCAL lock_timeout = '{millis}ms'")
}
