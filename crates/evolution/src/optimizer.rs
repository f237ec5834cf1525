//! Evolution optimizer - periodic maintenance of the agent's stores.

use crate::EvolutionReport;
use evolve_core::Experience;
use evolve_knowledge::ConceptGraph;
use evolve_reflection::ReflectionEngine;
use evolve_storage::{ExperienceMemory, StrategyTable};
use evolve_tools::{combo_name, ComboTool, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Relation added between near-duplicate concepts.
pub const SIMILAR_TO: &str = "similar_to";

/// Thresholds for exploration-rate adaptation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Performance records averaged before adapting
    pub window: usize,
    /// Mean success rate below which exploration is raised
    pub raise_below: f64,
    /// Mean success rate above which exploration is lowered
    pub lower_above: f64,
    /// Increment when raising
    pub raise_step: f64,
    /// Decrement when lowering
    pub lower_step: f64,
    /// Ceiling for the exploration rate
    pub max_rate: f64,
    /// Floor for the exploration rate
    pub min_rate: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            window: 10,
            raise_below: 0.6,
            lower_above: 0.8,
            raise_step: 0.05,
            lower_step: 0.02,
            max_rate: 0.5,
            min_rate: 0.1,
        }
    }
}

/// Configuration for the evolution pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Strategies used more than this many times are prune candidates
    pub prune_min_usage: u32,
    /// Prune candidates below this success rate are removed
    pub prune_max_success_rate: f64,
    /// Similarity above which concepts get a `similar_to` edge
    pub similarity_threshold: f64,
    /// Cap on concepts compared pairwise (most accessed first)
    pub max_integration_concepts: usize,
    /// Recent experiences scanned for action pairs
    pub combo_window: usize,
    /// Occurrences an action pair needs to become a combo
    pub combo_min_occurrences: usize,
    /// Recent experiences mined for patterns
    pub pattern_window: usize,
    /// Exploration adaptation
    pub exploration: ExplorationConfig,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            prune_min_usage: 10,
            prune_max_success_rate: 0.3,
            similarity_threshold: 0.8,
            max_integration_concepts: 500,
            combo_window: 50,
            combo_min_occurrences: 3,
            pattern_window: 100,
            exploration: ExplorationConfig::default(),
        }
    }
}

/// Adjustment to an agent parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterAdjustment {
    /// Parameter name
    pub parameter: String,
    /// New value
    pub value: f64,
    /// Reason for adjustment
    pub reason: String,
}

/// The stores one evolution pass works on.
pub struct EvolutionTargets<'a> {
    /// Experience memory (read)
    pub memory: &'a ExperienceMemory,
    /// Strategy table (pruned)
    pub strategies: &'a StrategyTable,
    /// Concept graph (linked)
    pub graph: &'a ConceptGraph,
    /// Tool registry (extended)
    pub registry: &'a ToolRegistry,
    /// Reflection engine (patterns)
    pub reflection: &'a ReflectionEngine,
}

/// Prunes, integrates and expands the agent's stores.
#[derive(Debug, Clone, Default)]
pub struct EvolutionOptimizer {
    config: EvolutionConfig,
}

impl EvolutionOptimizer {
    /// Create a new optimizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: EvolutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Whether a pass is due after `total_tasks` tasks.
    pub fn is_due(total_tasks: u64, interval: u64) -> bool {
        interval > 0 && total_tasks > 0 && total_tasks % interval == 0
    }

    /// Run a full pass: mine patterns, then prune, integrate and expand.
    ///
    /// Each sub-pass is independent; none of them can fail.
    pub async fn evolve(&self, targets: EvolutionTargets<'_>) -> EvolutionReport {
        info!("Starting evolution pass");

        let window = targets.memory.recent(self.config.pattern_window);
        let mut patterns = targets.reflection.identify_patterns(&window);
        targets.reflection.annotate_patterns(&mut patterns).await;

        let pruned_strategies = self.prune_strategies(targets.strategies);
        let similarity_links = self.integrate_knowledge(targets.graph);
        let recent = targets.memory.recent(self.config.combo_window);
        let new_tools = self.expand_capabilities(&recent, targets.registry);

        let report = EvolutionReport {
            patterns,
            pruned_strategies,
            similarity_links,
            new_tools,
            ran_at: chrono::Utc::now(),
        };
        info!(
            "Evolution pass done: {} patterns, {} pruned, {} links, {} new tools",
            report.patterns.len(),
            report.pruned_strategies.len(),
            report.similarity_links,
            report.new_tools.len()
        );
        report
    }

    /// Remove heavily used strategies with a poor success rate.
    pub fn prune_strategies(&self, strategies: &StrategyTable) -> Vec<String> {
        let min_usage = self.config.prune_min_usage;
        let max_rate = self.config.prune_max_success_rate;
        strategies.remove_where(|s| s.usage_count > min_usage && s.success_rate < max_rate)
    }

    /// Link near-duplicate concepts with `similar_to` edges.
    ///
    /// Compares every unordered pair among the most accessed concepts.
    /// Returns the number of edges added or reinforced.
    pub fn integrate_knowledge(&self, graph: &ConceptGraph) -> usize {
        let concepts = graph.most_accessed_concepts(self.config.max_integration_concepts);
        let mut links = 0;

        for (i, a) in concepts.iter().enumerate() {
            for b in &concepts[i + 1..] {
                let similarity = graph.concept_similarity(a, b);
                if similarity > self.config.similarity_threshold {
                    graph.add_relation(a, b, SIMILAR_TO, similarity);
                    debug!("Linked {} ~ {} ({:.3})", a, b, similarity);
                    links += 1;
                }
            }
        }
        links
    }

    /// Action pairs that follow each other often among successes.
    ///
    /// `window` is in memory order. Pairs whose timestamps go backwards are
    /// skipped. Result is sorted by pair.
    pub fn frequent_sequences(&self, window: &[Experience]) -> Vec<(String, String)> {
        let successes: Vec<&Experience> = window.iter().filter(|e| e.success).collect();

        let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        for pair in successes.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            if current.timestamp <= next.timestamp {
                *counts
                    .entry((current.action.as_str(), next.action.as_str()))
                    .or_default() += 1;
            }
        }

        counts
            .into_iter()
            .filter(|(_, count)| *count >= self.config.combo_min_occurrences)
            .map(|((a, b), _)| (a.to_string(), b.to_string()))
            .collect()
    }

    /// Register combo tools for frequent action pairs. Returns new names.
    pub fn expand_capabilities(&self, window: &[Experience], registry: &ToolRegistry) -> Vec<String> {
        let mut added = Vec::new();

        for (first, second) in self.frequent_sequences(window) {
            let name = combo_name(&first, &second);
            if registry.contains(&name) {
                continue;
            }
            let (Some(a), Some(b)) = (registry.get(&first), registry.get(&second)) else {
                debug!("Skipping combo {}: missing component tool", name);
                continue;
            };
            if registry.register_if_absent(Arc::new(ComboTool::new(a, b))) {
                info!("Synthesized combo tool {}", name);
                added.push(name);
            }
        }
        added
    }

    /// Adapt the exploration rate from the recent mean success rate.
    ///
    /// `recent_mean` is `None` until enough records exist.
    pub fn adjust_exploration(
        &self,
        current: f64,
        recent_mean: Option<f64>,
    ) -> Option<ParameterAdjustment> {
        let cfg = &self.config.exploration;
        let mean = recent_mean?;

        let (value, reason) = if mean < cfg.raise_below {
            (
                (current + cfg.raise_step).min(cfg.max_rate),
                format!("low recent success ({:.0}%), exploring more", mean * 100.0),
            )
        } else if mean > cfg.lower_above {
            (
                (current - cfg.lower_step).max(cfg.min_rate),
                format!("high recent success ({:.0}%), exploring less", mean * 100.0),
            )
        } else {
            return None;
        };

        Some(ParameterAdjustment {
            parameter: "exploration_rate".to_string(),
            value,
            reason,
        })
    }
}
