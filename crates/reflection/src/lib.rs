//! Reflection layer - explains outcomes and mines patterns from experience.

#![warn(missing_docs, unused_crate_dependencies)]

mod advisor;
mod analyzer;
mod engine;
mod patterns;

pub use advisor::{advise, Advice, Advisor, OllamaAdvisor, TemplateAdvisor, ADVICE_UNAVAILABLE};
pub use analyzer::{summarize_context, Analyzer, Insight};
pub use engine::{ReflectionConfig, ReflectionEngine, ReflectionKind, ReflectionRecord};
pub use patterns::{MinerConfig, Pattern, PatternKind, PatternMiner};
