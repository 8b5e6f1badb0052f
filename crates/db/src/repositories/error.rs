//! Errors raised while running a unit of work against the database.

use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;
use uuid::Uuid;

use torque_core::inventory::InventoryError;
use torque_shared::AppError;
use torque_shared::types::ProductId;

/// SQLSTATE `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";
/// SQLSTATE `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// Two writers raced for the same stock history version.
const STOCK_VERSION_CONSTRAINT: &str = "uq_stock_change_version";

/// Error types for stock-changing operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Domain failure: validation, insufficient stock, exhausted retries, or integrity.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Lost the race for a row lock; the unit of work may be retried.
    #[error("Lock contention on {}: {source}", describe(.product_id))]
    Contention {
        /// The contended product, when known.
        product_id: Option<ProductId>,
        /// The underlying database error.
        #[source]
        source: DbErr,
    },

    /// Header not found.
    #[error("Header not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(DbErr),
}

#[allow(clippy::ref_option)]
fn describe(product_id: &Option<ProductId>) -> String {
    product_id.map_or_else(|| "unknown product".to_string(), |id| format!("product {id}"))
}

impl TransactionError {
    /// Classifies a database error, tagging lock contention with the product involved.
    #[must_use]
    pub fn classify(err: DbErr, product_id: Option<ProductId>) -> Self {
        if is_contention(&err) {
            Self::Contention {
                product_id,
                source: err,
            }
        } else {
            Self::Database(err)
        }
    }

    /// Returns true if the unit of work lost a lock race and may be retried.
    #[must_use]
    pub const fn is_contention(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }

    /// Returns the domain error, if this is one.
    #[must_use]
    pub const fn as_inventory(&self) -> Option<&InventoryError> {
        match self {
            Self::Inventory(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbErr> for TransactionError {
    fn from(err: DbErr) -> Self {
        Self::classify(err, None)
    }
}

impl From<TransactionError> for AppError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Inventory(inner) => inner.into(),
            TransactionError::Contention { .. } => Self::ConcurrentModification(err.to_string()),
            TransactionError::NotFound(_) => Self::NotFound(err.to_string()),
            TransactionError::Database(_) => Self::Database(err.to_string()),
        }
    }
}

/// Returns true if `err` is a lock timeout, deadlock, serialization failure,
/// or a collision on the stock history version.
#[must_use]
pub fn is_contention(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Query(runtime) | DbErr::Exec(runtime) => runtime,
        _ => return false,
    };

    let RuntimeErr::SqlxError(sqlx::Error::Database(db_err)) = runtime else {
        return false;
    };

    match db_err.code().as_deref() {
        Some(LOCK_NOT_AVAILABLE | DEADLOCK_DETECTED | SERIALIZATION_FAILURE) => true,
        Some(UNIQUE_VIOLATION) => db_err.constraint() == Some(STOCK_VERSION_CONSTRAINT),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_contention() {
        assert!(!is_contention(&DbErr::Custom("boom".to_string())));
        assert!(!is_contention(&DbErr::RecordNotFound("product".to_string())));
        assert!(!is_contention(&DbErr::Query(RuntimeErr::Internal(
            "timeout".to_string()
        ))));
    }

    #[test]
    fn test_classify_plain_database_error() {
        let err = TransactionError::classify(DbErr::Custom("boom".to_string()), None);
        assert!(matches!(err, TransactionError::Database(_)));
        assert!(!err.is_contention());
    }

    #[test]
    fn test_inventory_errors_pass_through_to_app_error() {
        let product_id = ProductId::new();
        let err: TransactionError = InventoryError::insufficient(product_id, 4, 1).into();
        assert_eq!(err.to_string(), InventoryError::insufficient(product_id, 4, 1).to_string());

        let app: AppError = err.into();
        assert_eq!(app.error_code(), "INSUFFICIENT_STOCK");
    }

    #[test]
    fn test_contention_maps_to_retryable_app_error() {
        let err = TransactionError::Contention {
            product_id: Some(ProductId::new()),
            source: DbErr::Custom("lock timeout".to_string()),
        };
        let app: AppError = err.into();
        assert_eq!(app.error_code(), "CONCURRENT_MODIFICATION");
        assert!(app.is_retryable());
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        let app: AppError = TransactionError::NotFound(Uuid::new_v4()).into();
        assert_eq!(app.error_code(), "NOT_FOUND");
    }
}
