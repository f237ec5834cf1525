//! Agent configuration.

use evolve_evolution::EvolutionConfig;
use evolve_reflection::ReflectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for [`AgentConfig`]
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for configuration.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Agent configuration. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent name
    pub name: String,
    /// EMA rate for strategy success rates and edge weights
    pub learning_rate: f64,
    /// Initial exploration rate
    pub exploration_rate: f64,
    /// Experience memory capacity
    pub memory_size: usize,
    /// Run an evolution pass every this many tasks
    pub evolution_interval: u64,
    /// Seed for reproducible runs
    pub seed: Option<u64>,
    /// Reflection settings
    pub reflection: ReflectionConfig,
    /// Evolution settings
    pub evolution: EvolutionConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "evolve".to_string(),
            learning_rate: 0.1,
            exploration_rate: 0.2,
            memory_size: 1000,
            evolution_interval: 50,
            seed: None,
            reflection: ReflectionConfig::default(),
            evolution: EvolutionConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Create a default config with a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Load and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<()> {
        unit_interval("learning_rate", self.learning_rate)?;
        unit_interval("exploration_rate", self.exploration_rate)?;
        unit_interval(
            "evolution.prune_max_success_rate",
            self.evolution.prune_max_success_rate,
        )?;
        unit_interval(
            "evolution.similarity_threshold",
            self.evolution.similarity_threshold,
        )?;

        let exploration = &self.evolution.exploration;
        if exploration.min_rate > exploration.max_rate {
            return Err(ConfigError::Invalid {
                field: "evolution.exploration",
                reason: format!(
                    "min_rate {} exceeds max_rate {}",
                    exploration.min_rate, exploration.max_rate
                ),
            });
        }
        if self.memory_size == 0 {
            return Err(ConfigError::Invalid {
                field: "memory_size",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.evolution_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "evolution_interval",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} is outside [0, 1]", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.memory_size, 1000);
        assert_eq!(config.evolution.combo_window, 50);
        assert_eq!(config.reflection.history_limit, 500);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"name": "probe", "evolution": {"pattern_window": 20}}"#)
                .unwrap();
        assert_eq!(config.name, "probe");
        assert_eq!(config.evolution.pattern_window, 20);
        assert_eq!(config.evolution.similarity_threshold, 0.8);
        assert_eq!(config.exploration_rate, 0.2);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = AgentConfig {
            exploration_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "exploration_rate", .. })
        ));

        let config = AgentConfig {
            memory_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"memory_size": 5, "seed": 9}}"#).unwrap();

        let config = AgentConfig::from_file(&path).unwrap();
        assert_eq!(config.memory_size, 5);
        assert_eq!(config.seed, Some(9));

        std::fs::write(&path, r#"{"learning_rate": -1}"#).unwrap();
        assert!(AgentConfig::from_file(&path).is_err());
        assert!(matches!(
            AgentConfig::from_file(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
