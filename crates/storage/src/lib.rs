//! In-memory stores for the agent's learned state.
//!
//! The stores are safe to read from inspection code while the agent
//! writes to them. Snapshots give an optional JSON file round-trip.

#![warn(missing_docs)]

mod error;
mod memory;
mod strategies;
mod performance;
mod snapshot;

pub use error::{StorageError, Result};
pub use memory::ExperienceMemory;
pub use strategies::StrategyTable;
pub use performance::PerformanceLog;
pub use snapshot::AgentSnapshot;
