//! Unit-of-work state machine.
//!
//! ```text
//! Building -> Validating -> Applying -> Committed
//!     \            \            \
//!      +------------+------------+--> Aborted
//! ```

use serde::Serialize;

use super::error::InventoryError;

/// State of one stock-changing unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfWorkState {
    /// Request accepted, transaction boundary being opened.
    Building,
    /// Products locked, batch being validated and priced.
    Validating,
    /// Header, lines, and stock deltas being written.
    Applying,
    /// Committed and visible to other readers.
    Committed,
    /// Rolled back with no observable effects.
    Aborted,
}

impl UnitOfWorkState {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }

    /// Returns true if `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_advance_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Building, Self::Validating)
                | (Self::Validating, Self::Applying)
                | (Self::Applying, Self::Committed)
                | (Self::Building | Self::Validating | Self::Applying, Self::Aborted)
        )
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns an integrity error on an illegal transition; that is a bug in
    /// the caller, not a user error.
    pub fn advance(self, next: Self) -> Result<Self, InventoryError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(InventoryError::integrity(format!(
                "illegal unit-of-work transition {self:?} -> {next:?}"
            )))
        }
    }
}
