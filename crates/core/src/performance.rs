//! Performance history entries.

use crate::Time;
use serde::{Deserialize, Serialize};

/// Snapshot of cumulative performance after one processed task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// When the task finished
    pub timestamp: Time,
    /// Cumulative success rate so far
    pub success_rate: f64,
    /// Tasks processed so far
    pub total_tasks: u64,
}

impl PerformanceRecord {
    /// Create a record stamped with the current time.
    pub fn new(success_rate: f64, total_tasks: u64) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            success_rate,
            total_tasks,
        }
    }
}

/// Direction of recent performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Recent mean above overall mean
    Improving,
    /// Recent mean at or below overall mean
    Declining,
    /// Fewer records than the comparison window
    InsufficientData,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Improving => "improving",
            Self::Declining => "declining",
            Self::InsufficientData => "insufficient_data",
        };
        write!(f, "{}", s)
    }
}
