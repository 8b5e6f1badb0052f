//! Inventory error types.
//!
//! Every failure the stock core can produce, grouped into the four categories
//! callers act on: validation, insufficient stock, contention, and integrity.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use torque_shared::AppError;
use torque_shared::types::ProductId;

/// The kind of reference-data record a transaction points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// The client a sale is made to.
    Client,
    /// The employee recording a sale or movement.
    Employee,
    /// The supplier a purchase is made from.
    Supplier,
    /// The employee in charge of a purchase.
    Manager,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Employee => write!(f, "employee"),
            Self::Supplier => write!(f, "supplier"),
            Self::Manager => write!(f, "manager"),
        }
    }
}

/// Coarse classification of an [`InventoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input; fix the request.
    Validation,
    /// Stock would go negative.
    InsufficientStock,
    /// Lost the race for a product lock; the request may be retried.
    ConcurrentModification,
    /// A bug: an internal invariant did not hold.
    Integrity,
}

/// Errors that can occur while validating or applying a stock-changing transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    // ========== Validation Errors ==========
    /// A transaction must carry at least one line item.
    #[error("Transaction must have at least one line item")]
    EmptyBatch,

    /// Line quantity must be strictly positive.
    #[error("Line {line}: quantity must be positive, got {quantity}")]
    NonPositiveQuantity {
        /// 1-based line number.
        line: usize,
        /// The rejected quantity.
        quantity: i32,
    },

    /// Purchase unit price cannot be negative.
    #[error("Line {line}: unit price cannot be negative, got {unit_price}")]
    NegativeUnitPrice {
        /// 1-based line number.
        line: usize,
        /// The rejected price.
        unit_price: Decimal,
    },

    /// Unit prices are stored as `NUMERIC(12, 2)`.
    #[error("Line {line}: unit price {unit_price} must have at most 2 decimal places and not exceed 9999999999.99")]
    InvalidUnitPrice {
        /// 1-based line number.
        line: usize,
        /// The rejected price.
        unit_price: Decimal,
    },

    /// A line subtotal does not fit `NUMERIC(14, 2)`.
    #[error("Line {line}: subtotal is out of range")]
    LineAmountOutOfRange {
        /// 1-based line number.
        line: usize,
    },

    /// The header total does not fit `NUMERIC(14, 2)`.
    #[error("Transaction total is out of range")]
    TotalOutOfRange,

    /// Purchases must state the negotiated unit price.
    #[error("Line {line}: purchase lines require a unit price")]
    MissingUnitPrice {
        /// 1-based line number.
        line: usize,
    },

    /// Sales and movements are priced by the system, not the caller.
    #[error("Line {line}: unit price is not accepted for this transaction kind")]
    UnexpectedUnitPrice {
        /// 1-based line number.
        line: usize,
    },

    /// Product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Inactive products cannot be sold.
    #[error("Product {0} is inactive")]
    ProductInactive(ProductId),

    /// A client, employee, or supplier reference does not resolve.
    #[error("Unknown {kind}: {id}")]
    ReferenceNotFound {
        /// Which reference table was consulted.
        kind: ReferenceKind,
        /// The unresolved identifier.
        id: Uuid,
    },

    /// Stock deltas must be non-zero.
    #[error("Stock delta for product {0} must be non-zero")]
    ZeroDelta(ProductId),

    /// The resulting stock does not fit the counter.
    #[error("Stock for product {0} would overflow")]
    StockOverflow(ProductId),

    // ========== Stock Errors ==========
    /// Stock would go negative.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}, short by {shortfall}"
    )]
    InsufficientStock {
        /// The offending product.
        product_id: ProductId,
        /// Units requested from the product, summed over the batch.
        requested: i64,
        /// Units on hand when the request was evaluated.
        available: i32,
        /// `requested - available`.
        shortfall: i64,
    },

    // ========== Contention Errors ==========
    /// Lock or retry budget exhausted.
    #[error("Concurrent modification detected after {attempts} attempt(s), please retry")]
    ConcurrentModification {
        /// The contended product, when known.
        product_id: Option<ProductId>,
        /// Attempts made before giving up.
        attempts: u32,
    },

    // ========== Integrity Errors ==========
    /// Recomputed header total differs from the batch total.
    #[error("Header total mismatch: expected {expected}, recomputed {recomputed}")]
    TotalMismatch {
        /// Total computed during validation.
        expected: Decimal,
        /// Total recomputed from persisted line items.
        recomputed: Decimal,
    },

    /// Any other internal invariant violation.
    #[error("Integrity violation: {0}")]
    Integrity(String),
}

impl InventoryError {
    /// Creates an integrity error from a message.
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Builds an insufficient-stock error, deriving the shortfall.
    #[must_use]
    pub fn insufficient(product_id: ProductId, requested: i64, available: i32) -> Self {
        Self::InsufficientStock {
            product_id,
            requested,
            available,
            shortfall: requested - i64::from(available),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InsufficientStock { .. } => ErrorCategory::InsufficientStock,
            Self::ConcurrentModification { .. } => ErrorCategory::ConcurrentModification,
            Self::TotalMismatch { .. } | Self::Integrity(_) => ErrorCategory::Integrity,
            _ => ErrorCategory::Validation,
        }
    }

    /// Returns true if the same request may succeed when retried unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::ConcurrentModification)
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        let msg = err.to_string();
        match err.category() {
            ErrorCategory::Validation => match err {
                InventoryError::ProductNotFound(_) => Self::NotFound(msg),
                _ => Self::Validation(msg),
            },
            ErrorCategory::InsufficientStock => Self::InsufficientStock(msg),
            ErrorCategory::ConcurrentModification => Self::ConcurrentModification(msg),
            ErrorCategory::Integrity => Self::Integrity(msg),
        }
    }
}
