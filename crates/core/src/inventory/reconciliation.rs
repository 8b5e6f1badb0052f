//! Header total and stock history reconciliation.
//!
//! Read-only arithmetic used by the audit reporter and the test suite. A
//! divergence found here is a data-integrity warning; nothing is corrected.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use torque_shared::types::ProductId;

use super::kind::HeaderKind;

/// Reference to a committed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderRef {
    /// Header type.
    pub kind: HeaderKind,
    /// Header id.
    pub id: Uuid,
}

/// The persisted fields of a priced line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSnapshot {
    /// 1-based position in the header.
    pub line_number: i32,
    /// Units moved.
    pub quantity: i32,
    /// Unit price at creation.
    pub unit_price: Decimal,
    /// Stored subtotal.
    pub subtotal: Decimal,
}

/// Result of comparing a header total with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalReconciliation {
    /// Total stored on the header.
    pub header_total: Decimal,
    /// Sum of the stored line subtotals.
    pub recomputed_total: Decimal,
    /// Number of lines inspected.
    pub line_count: usize,
    /// Lines whose stored subtotal differs from `quantity * unit_price`.
    pub mismatched_lines: Vec<i32>,
}

impl TotalReconciliation {
    /// Returns true if the header total and every subtotal agree.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.header_total == self.recomputed_total && self.mismatched_lines.is_empty()
    }
}

/// Recomputes a header total from its lines.
#[must_use]
pub fn reconcile_total(header_total: Decimal, lines: &[LineSnapshot]) -> TotalReconciliation {
    let recomputed_total = lines.iter().map(|line| line.subtotal).sum();
    let mismatched_lines = lines
        .iter()
        .filter(|line| line.subtotal != line.unit_price * Decimal::from(line.quantity))
        .map(|line| line.line_number)
        .collect();

    TotalReconciliation {
        header_total,
        recomputed_total,
        line_count: lines.len(),
        mismatched_lines,
    }
}

/// One applied stock delta, as recorded in the stock history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockHistoryEntry {
    /// Per-product sequence number, starting at 1.
    pub version: i64,
    /// Signed delta applied.
    pub delta: i32,
    /// Stock before the delta.
    pub stock_before: i32,
    /// Stock after the delta.
    pub stock_after: i32,
}

/// A specific inconsistency found in a product's stock history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum StockIssue {
    /// Live stock differs from `opening_stock + sum(delta)`.
    LiveStockMismatch {
        /// Stock on the product row.
        live: i64,
        /// Stock recomputed from history.
        recomputed: i64,
    },
    /// A history row does not continue from its predecessor.
    BrokenChain {
        /// Version of the offending row.
        version: i64,
        /// `stock_after` of the previous row (or the opening stock).
        expected_before: i32,
        /// `stock_before` recorded on the row.
        actual_before: i32,
    },
    /// A history row's own arithmetic is wrong.
    InconsistentEntry {
        /// Version of the offending row.
        version: i64,
    },
    /// Versions skip or repeat.
    VersionGap {
        /// Version expected at this position.
        expected: i64,
        /// Version found.
        found: i64,
    },
    /// A row records negative stock.
    NegativeStock {
        /// Version of the offending row.
        version: i64,
    },
}

/// Result of recomputing a product's stock from its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReconciliation {
    /// The product.
    pub product_id: ProductId,
    /// Stock at catalog creation.
    pub opening_stock: i32,
    /// Stock on the product row.
    pub live_stock: i32,
    /// `opening_stock + sum(delta)`.
    pub recomputed_stock: i64,
    /// Number of history rows inspected.
    pub applied_changes: usize,
    /// Everything that did not add up.
    pub issues: Vec<StockIssue>,
}

impl StockReconciliation {
    /// Returns true if no issue was found.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Recomputes a product's stock from its opening stock and applied deltas.
///
/// `history` must be ordered by version.
#[must_use]
pub fn reconcile_stock(
    product_id: ProductId,
    opening_stock: i32,
    live_stock: i32,
    history: &[StockHistoryEntry],
) -> StockReconciliation {
    let mut issues = Vec::new();
    let mut expected_before = opening_stock;
    let mut recomputed_stock = i64::from(opening_stock);

    for (position, entry) in (1_i64..).zip(history) {
        if entry.version != position {
            issues.push(StockIssue::VersionGap {
                expected: position,
                found: entry.version,
            });
        }
        if entry.stock_before != expected_before {
            issues.push(StockIssue::BrokenChain {
                version: entry.version,
                expected_before,
                actual_before: entry.stock_before,
            });
        }
        if i64::from(entry.stock_before) + i64::from(entry.delta) != i64::from(entry.stock_after) {
            issues.push(StockIssue::InconsistentEntry {
                version: entry.version,
            });
        }
        if entry.stock_after < 0 {
            issues.push(StockIssue::NegativeStock {
                version: entry.version,
            });
        }

        recomputed_stock += i64::from(entry.delta);
        expected_before = entry.stock_after;
    }

    if recomputed_stock != i64::from(live_stock) {
        issues.push(StockIssue::LiveStockMismatch {
            live: i64::from(live_stock),
            recomputed: recomputed_stock,
        });
    }

    StockReconciliation {
        product_id,
        opening_stock,
        live_stock,
        recomputed_stock,
        applied_changes: history.len(),
        issues,
    }
}

/// One divergence reported by an audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Divergence {
    /// A header total that does not match its lines.
    HeaderTotal {
        /// The header.
        header: HeaderRef,
        /// Details.
        reconciliation: TotalReconciliation,
    },
    /// A product whose stock does not match its history.
    Stock {
        /// Details.
        reconciliation: StockReconciliation,
    },
}

/// Outcome of a full audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Headers inspected.
    pub headers_checked: usize,
    /// Products inspected.
    pub products_checked: usize,
    /// Divergences found.
    pub divergences: Vec<Divergence>,
}

impl AuditReport {
    /// Returns true if nothing diverged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.divergences.is_empty()
    }

    /// Records a header check, keeping it if it diverged.
    pub fn record_total(&mut self, header: HeaderRef, reconciliation: TotalReconciliation) {
        self.headers_checked += 1;
        if !reconciliation.is_consistent() {
            self.divergences.push(Divergence::HeaderTotal {
                header,
                reconciliation,
            });
        }
    }

    /// Records a product check, keeping it if it diverged.
    pub fn record_stock(&mut self, reconciliation: StockReconciliation) {
        self.products_checked += 1;
        if !reconciliation.is_consistent() {
            self.divergences.push(Divergence::Stock { reconciliation });
        }
    }
}
