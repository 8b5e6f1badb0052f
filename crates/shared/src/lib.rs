//! Shared types, errors, and configuration for Torque.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - The caller-facing error envelope
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, StockConfig};
pub use error::{AppError, AppResult};
