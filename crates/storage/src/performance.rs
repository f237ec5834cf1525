//! Append-only performance log.

use evolve_core::{PerformanceRecord, Trend};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct LogState {
    records: Vec<PerformanceRecord>,
    total: u64,
    successful: u64,
}

/// Cumulative success tracking, one record per processed task.
#[derive(Debug, Default)]
pub struct PerformanceLog {
    state: RwLock<LogState>,
}

impl PerformanceLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one processed task and append the resulting record.
    pub fn record(&self, success: bool) -> PerformanceRecord {
        let mut state = self.state.write();
        state.total += 1;
        if success {
            state.successful += 1;
        }
        let record = PerformanceRecord::new(
            state.successful as f64 / state.total as f64,
            state.total,
        );
        state.records.push(record);
        record
    }

    /// Mean cumulative success rate over the last `window` records.
    ///
    /// `None` until at least `window` records exist.
    pub fn recent_mean(&self, window: usize) -> Option<f64> {
        let state = self.state.read();
        if window == 0 || state.records.len() < window {
            return None;
        }
        let recent = &state.records[state.records.len() - window..];
        Some(recent.iter().map(|r| r.success_rate).sum::<f64>() / window as f64)
    }

    /// Compare the last `window` records against the whole history.
    pub fn trend(&self, window: usize) -> Trend {
        let Some(recent) = self.recent_mean(window) else {
            return Trend::InsufficientData;
        };
        let state = self.state.read();
        let overall =
            state.records.iter().map(|r| r.success_rate).sum::<f64>() / state.records.len() as f64;
        if recent > overall {
            Trend::Improving
        } else {
            Trend::Declining
        }
    }

    /// Most recent record.
    pub fn latest(&self) -> Option<PerformanceRecord> {
        self.state.read().records.last().copied()
    }

    /// Copies of all records, oldest first.
    pub fn records(&self) -> Vec<PerformanceRecord> {
        self.state.read().records.clone()
    }

    /// Tasks processed so far.
    pub fn total_tasks(&self) -> u64 {
        self.state.read().total
    }

    /// Successful tasks so far.
    pub fn successful_tasks(&self) -> u64 {
        self.state.read().successful
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_rate() {
        let log = PerformanceLog::new();
        log.record(true);
        log.record(false);
        let last = log.record(true);
        assert_eq!(last.total_tasks, 3);
        assert!((last.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(log.successful_tasks(), 2);
    }

    #[test]
    fn test_recent_mean_requires_window() {
        let log = PerformanceLog::new();
        for _ in 0..9 {
            log.record(false);
        }
        assert!(log.recent_mean(10).is_none());
        log.record(false);
        assert_eq!(log.recent_mean(10), Some(0.0));
    }

    #[test]
    fn test_trend() {
        let log = PerformanceLog::new();
        assert_eq!(log.trend(10), Trend::InsufficientData);
        for _ in 0..10 {
            log.record(false);
        }
        for _ in 0..10 {
            log.record(true);
        }
        assert_eq!(log.trend(10), Trend::Improving);
    }
}
