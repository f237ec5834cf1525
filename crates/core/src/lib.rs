//! Evolve core data models.
//!
//! This crate defines the records shared by every part of the
//! self-evolving agent: tagged context values, experiences, strategies
//! and performance history.

#![warn(missing_docs)]

// Identities
mod id;

// Values and records
mod value;
mod experience;
mod strategy;
mod performance;

mod error;

// Re-exports
pub use id::*;
pub use value::{Context, Value};
pub use experience::{task_type, Experience};
pub use strategy::{context_uncertainty, Strategy};
pub use performance::{PerformanceRecord, Trend};
pub use error::SnapshotError;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
