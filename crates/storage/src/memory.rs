//! Bounded experience memory with FIFO eviction.

use evolve_core::{Experience, ExperienceId};
use parking_lot::RwLock;
use std::collections::VecDeque;
use tracing::debug;

/// Keeps the most recent experiences, evicting the oldest once full.
///
/// Readers can inspect the memory while the agent appends to it.
#[derive(Debug)]
pub struct ExperienceMemory {
    capacity: usize,
    records: RwLock<VecDeque<Experience>>,
}

impl ExperienceMemory {
    /// Create a memory holding at most `capacity` experiences (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Append an experience, returning the evicted one if the memory was full.
    pub fn push(&self, experience: Experience) -> Option<Experience> {
        let mut records = self.records.write();
        records.push_back(experience);
        if records.len() > self.capacity {
            let evicted = records.pop_front();
            if let Some(old) = &evicted {
                debug!("Evicted experience {} ({})", old.id, old.task);
            }
            evicted
        } else {
            None
        }
    }

    /// Attach reflection text to a stored experience.
    ///
    /// Returns `false` if the experience is no longer in memory.
    pub fn attach_reflection(&self, id: ExperienceId, reflection: &str) -> bool {
        let mut records = self.records.write();
        match records.iter_mut().rev().find(|e| e.id == id) {
            Some(exp) => {
                exp.reflection = Some(reflection.to_string());
                true
            }
            None => false,
        }
    }

    /// Look up an experience by ID.
    pub fn get(&self, id: ExperienceId) -> Option<Experience> {
        self.records.read().iter().find(|e| e.id == id).cloned()
    }

    /// The last `n` experiences, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Experience> {
        let records = self.records.read();
        let skip = records.len().saturating_sub(n);
        records.iter().skip(skip).cloned().collect()
    }

    /// All retained experiences, oldest first.
    pub fn all(&self) -> Vec<Experience> {
        self.records.read().iter().cloned().collect()
    }

    /// Number of retained experiences.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Maximum number of retained experiences.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every retained experience.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolve_core::{Context, Value};

    fn create_test_experience(i: usize) -> Experience {
        Experience::new(format!("task {}", i), Context::new(), "search", Value::Null, true, 0.5)
    }

    #[test]
    fn test_fifo_eviction_keeps_most_recent() {
        let memory = ExperienceMemory::new(3);
        for i in 0..5 {
            memory.push(create_test_experience(i));
            assert_eq!(memory.len(), (i + 1).min(3));
        }
        let tasks: Vec<_> = memory.all().into_iter().map(|e| e.task).collect();
        assert_eq!(tasks, vec!["task 2", "task 3", "task 4"]);
    }

    #[test]
    fn test_push_returns_evicted() {
        let memory = ExperienceMemory::new(1);
        assert!(memory.push(create_test_experience(0)).is_none());
        let evicted = memory.push(create_test_experience(1)).unwrap();
        assert_eq!(evicted.task, "task 0");
    }

    #[test]
    fn test_recent_window() {
        let memory = ExperienceMemory::new(10);
        for i in 0..6 {
            memory.push(create_test_experience(i));
        }
        let recent: Vec<_> = memory.recent(2).into_iter().map(|e| e.task).collect();
        assert_eq!(recent, vec!["task 4", "task 5"]);
        assert_eq!(memory.recent(100).len(), 6);
    }

    #[test]
    fn test_attach_reflection() {
        let memory = ExperienceMemory::new(2);
        let exp = create_test_experience(0);
        let id = exp.id;
        memory.push(exp);
        assert!(memory.attach_reflection(id, "looks good"));
        assert_eq!(memory.get(id).unwrap().reflection.as_deref(), Some("looks good"));

        memory.push(create_test_experience(1));
        memory.push(create_test_experience(2));
        assert!(!memory.attach_reflection(id, "gone"));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let memory = ExperienceMemory::new(0);
        memory.push(create_test_experience(0));
        assert_eq!(memory.capacity(), 1);
        assert_eq!(memory.len(), 1);
    }
}
