//! Reports produced by evolution passes and performance tracking.

use evolve_core::{Time, Trend};
use evolve_reflection::Pattern;
use serde::{Deserialize, Serialize};

/// Outcome of one evolution pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionReport {
    /// Patterns mined over the recent window
    pub patterns: Vec<Pattern>,
    /// Names of removed strategies
    pub pruned_strategies: Vec<String>,
    /// `similar_to` edges added or reinforced
    pub similarity_links: usize,
    /// Names of newly registered combo tools
    pub new_tools: Vec<String>,
    /// When the pass ran
    pub ran_at: Time,
}

/// Snapshot of the agent's overall performance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Tasks processed
    pub total_tasks: u64,
    /// Tasks that succeeded
    pub successful_tasks: u64,
    /// Cumulative success rate after the latest task
    pub current_success_rate: f64,
    /// Recent mean versus overall mean
    pub trend: Trend,
    /// Strategies in the table
    pub strategies_count: usize,
    /// Experiences in memory
    pub experiences_count: usize,
    /// Current exploration rate
    pub exploration_rate: f64,
    /// Concepts in the graph
    pub knowledge_concepts: usize,
}

impl std::fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "total tasks:       {}", self.total_tasks)?;
        writeln!(f, "successful tasks:  {}", self.successful_tasks)?;
        writeln!(f, "success rate:      {:.1}%", self.current_success_rate * 100.0)?;
        writeln!(f, "trend:             {}", self.trend)?;
        writeln!(f, "strategies:        {}", self.strategies_count)?;
        writeln!(f, "experiences:       {}", self.experiences_count)?;
        writeln!(f, "exploration rate:  {:.3}", self.exploration_rate)?;
        write!(f, "knowledge concepts: {}", self.knowledge_concepts)
    }
}
