//! Execution layer - perception, action selection, outcome scoring and the agent loop.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod outcome;
pub mod perception;
pub mod selector;

pub use config::{AgentConfig, ConfigError};
pub use engine::{Agent, CyclePhase, TaskResult, NO_ACTION};
pub use outcome::{evaluate_result, Outcome};
pub use perception::{context_similarity, estimate_uncertainty, perceive, string_similarity, Perception};
pub use selector::{ActionSelector, EpsilonGreedySelector, ScriptedSelector};
