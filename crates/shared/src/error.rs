//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Caller-facing error envelope.
///
/// Every failure the inventory core can produce collapses into one of these
/// variants before it leaves the library boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input (empty batch, non-positive quantity, unknown reference).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Stock would go negative.
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// Lock or retry budget exhausted while contending for a product.
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// An internal invariant was violated.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Integrity(_) => "INTEGRITY_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }
}
