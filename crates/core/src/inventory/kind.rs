//! Transaction kinds and the stock effect each one implies.
//!
//! Sales, purchases, and manual movements share one code path; everything that
//! differs between them is answered by [`TransactionKind`].

use serde::{Deserialize, Serialize};

/// Direction of a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    /// Stock increases.
    Inflow,
    /// Stock decreases.
    Outflow,
}

/// Kind of manual inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Goods enter the shop ("entrada").
    In,
    /// Goods leave the shop ("salida").
    Out,
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::In => write!(f, "in"),
            Self::Out => write!(f, "out"),
        }
    }
}

impl std::str::FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" | "entrada" => Ok(Self::In),
            "out" | "salida" => Ok(Self::Out),
            _ => Err(format!("Unknown movement kind: {s}")),
        }
    }
}

/// Header type that owns line items and sources stock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderKind {
    /// A sale to a client.
    Sale,
    /// A purchase from a supplier.
    Purchase,
    /// A manual inventory movement.
    Movement,
}

impl std::fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sale => write!(f, "sale"),
            Self::Purchase => write!(f, "purchase"),
            Self::Movement => write!(f, "movement"),
        }
    }
}

/// Where a line's unit price comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingRule {
    /// The product's current sale price, snapshotted at validation.
    SalePrice,
    /// Supplied by the caller (negotiated purchase price).
    CallerSupplied,
    /// No price attached.
    Unpriced,
}

/// The kind of a stock-changing transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Sale: stock decreases, priced at the sale price.
    Sale,
    /// Purchase: stock increases, priced by the caller.
    Purchase,
    /// Inbound movement: stock increases, unpriced.
    MovementIn,
    /// Outbound movement: stock decreases, unpriced.
    MovementOut,
}

impl TransactionKind {
    /// Returns the kind for a manual movement.
    #[must_use]
    pub const fn movement(kind: MovementKind) -> Self {
        match kind {
            MovementKind::In => Self::MovementIn,
            MovementKind::Out => Self::MovementOut,
        }
    }

    /// Returns the header type that records this kind.
    #[must_use]
    pub const fn header_kind(self) -> HeaderKind {
        match self {
            Self::Sale => HeaderKind::Sale,
            Self::Purchase => HeaderKind::Purchase,
            Self::MovementIn | Self::MovementOut => HeaderKind::Movement,
        }
    }

    /// Returns the direction of the stock change.
    #[must_use]
    pub const fn direction(self) -> StockDirection {
        match self {
            Self::Sale | Self::MovementOut => StockDirection::Outflow,
            Self::Purchase | Self::MovementIn => StockDirection::Inflow,
        }
    }

    /// Returns how lines of this kind are priced.
    #[must_use]
    pub const fn pricing(self) -> PricingRule {
        match self {
            Self::Sale => PricingRule::SalePrice,
            Self::Purchase => PricingRule::CallerSupplied,
            Self::MovementIn | Self::MovementOut => PricingRule::Unpriced,
        }
    }

    /// Returns true if the header carries a monetary total.
    #[must_use]
    pub const fn carries_total(self) -> bool {
        !matches!(self.pricing(), PricingRule::Unpriced)
    }

    /// Returns true if the kind draws down stock and must be checked for sufficiency.
    #[must_use]
    pub const fn requires_stock(self) -> bool {
        matches!(self.direction(), StockDirection::Outflow)
    }

    /// Converts a positive line quantity into the signed stock delta.
    #[must_use]
    pub const fn signed_delta(self, quantity: i32) -> i32 {
        match self.direction() {
            StockDirection::Inflow => quantity,
            StockDirection::Outflow => -quantity,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sale => write!(f, "sale"),
            Self::Purchase => write!(f, "purchase"),
            Self::MovementIn => write!(f, "movement-in"),
            Self::MovementOut => write!(f, "movement-out"),
        }
    }
}
