//! JSON snapshot files.
//!
//! A snapshot holds experiences and strategies in their generic map form
//! so that a later run can pick up where an earlier one stopped.

use crate::{ExperienceMemory, Result, StrategyTable};
use evolve_core::{Context, Experience, Strategy, Time};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Serializable copy of the agent's learned state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// When the snapshot was taken
    pub saved_at: Option<Time>,
    /// Experiences, oldest first
    pub experiences: Vec<Context>,
    /// Strategies, sorted by name
    pub strategies: Vec<Context>,
}

impl AgentSnapshot {
    /// Capture the current contents of the stores.
    pub fn capture(memory: &ExperienceMemory, strategies: &StrategyTable) -> Self {
        Self {
            saved_at: Some(chrono::Utc::now()),
            experiences: memory.all().iter().map(Experience::to_map).collect(),
            strategies: strategies.snapshot().iter().map(Strategy::to_map).collect(),
        }
    }

    /// Load the snapshot into the stores.
    ///
    /// Experiences are appended in order (so the memory bound still
    /// applies) and strategies are upserted by name. Returns the number of
    /// experiences and strategies restored.
    pub fn restore(&self, memory: &ExperienceMemory, strategies: &StrategyTable) -> Result<(usize, usize)> {
        let experiences = self
            .experiences
            .iter()
            .map(Experience::from_map)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let restored_strategies = self
            .strategies
            .iter()
            .map(Strategy::from_map)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let counts = (experiences.len(), restored_strategies.len());
        for exp in experiences {
            memory.push(exp);
        }
        for strategy in restored_strategies {
            strategies.upsert(strategy);
        }
        debug!("Restored {} experiences and {} strategies", counts.0, counts.1);
        Ok(counts)
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json.as_bytes()).await?;
        info!("Saved snapshot to {}", path.display());
        Ok(())
    }

    /// Read a snapshot from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let snapshot = serde_json::from_str(&content)?;
        info!("Loaded snapshot from {}", path.display());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolve_core::Value;

    fn create_test_stores() -> (ExperienceMemory, StrategyTable) {
        let memory = ExperienceMemory::new(10);
        memory.push(Experience::new(
            "calculate: 2*3",
            Context::new(),
            "calculate",
            Value::Number(6.0),
            true,
            1.0,
        ));
        (memory, StrategyTable::with_defaults())
    }

    #[test]
    fn test_capture_and_restore() {
        let (memory, strategies) = create_test_stores();
        let snapshot = AgentSnapshot::capture(&memory, &strategies);

        let fresh_memory = ExperienceMemory::new(10);
        let fresh_strategies = StrategyTable::new();
        let counts = snapshot.restore(&fresh_memory, &fresh_strategies).unwrap();

        assert_eq!(counts, (1, 2));
        assert_eq!(fresh_memory.all()[0].task, "calculate: 2*3");
        assert!(fresh_strategies.contains("explore"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (memory, strategies) = create_test_stores();
        let snapshot = AgentSnapshot::capture(&memory, &strategies);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        snapshot.save(&path).await.unwrap();
        let loaded = AgentSnapshot::load(&path).await.unwrap();

        assert_eq!(loaded.experiences, snapshot.experiences);
        assert_eq!(loaded.strategies.len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = AgentSnapshot::load("/nonexistent/evolve/state.json").await;
        assert!(matches!(result, Err(crate::StorageError::Io(_))));
    }
}
