//! Core business logic for Torque.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All stock rules, line-item pricing, and reconciliation arithmetic live here;
//! the database crate decides *when* they run and under which locks.
//!
//! # Modules
//!
//! - `inventory` - Product stock invariants, transaction kinds, line-item batches,
//!   unit-of-work states, and reconciliation checks

pub mod inventory;
