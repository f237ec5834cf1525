//! Pattern mining over a window of experiences.

use evolve_core::{Context, Experience, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Family a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// An action that keeps succeeding
    SuccessAction,
    /// A task/action pair that keeps failing
    FailureCombo,
    /// Rewards rising across the window
    ImprovementTrend,
    /// Rewards falling across the window
    DeclineTrend,
    /// A context entry strongly tied to success or failure
    ContextInfluence,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SuccessAction => "success_action",
            Self::FailureCombo => "failure_combo",
            Self::ImprovementTrend => "improvement_trend",
            Self::DeclineTrend => "decline_trend",
            Self::ContextInfluence => "context_influence",
        };
        write!(f, "{}", s)
    }
}

/// A regularity found in recent experiences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Pattern family
    pub kind: PatternKind,
    /// Human readable description
    pub description: String,
    /// Strength in `[0, 1]`
    pub strength: f64,
    /// Supporting observations
    pub evidences: Vec<String>,
    /// Extra annotations
    pub metadata: Context,
}

impl Pattern {
    fn new(kind: PatternKind, description: String, strength: f64) -> Self {
        Self {
            kind,
            description,
            strength: strength.clamp(0.0, 1.0),
            evidences: Vec::new(),
            metadata: Context::new(),
        }
    }

    fn with_evidence(mut self, evidence: String) -> Self {
        self.evidences.push(evidence);
        self
    }
}

/// Thresholds for the pattern miners.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Successes an action needs before it is considered
    pub min_action_successes: usize,
    /// Success rate an action must exceed
    pub action_success_rate: f64,
    /// Failures a task/action pair needs
    pub min_combo_failures: usize,
    /// Window size needed for trend detection
    pub min_trend_window: usize,
    /// Mean reward delta that counts as a trend
    pub trend_delta: f64,
    /// Occurrences a context entry needs
    pub min_context_occurrences: usize,
    /// Success rate above which a context entry is favorable
    pub favorable_rate: f64,
    /// Success rate below which a context entry is unfavorable
    pub unfavorable_rate: f64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            min_action_successes: 3,
            action_success_rate: 0.7,
            min_combo_failures: 2,
            min_trend_window: 5,
            trend_delta: 0.2,
            min_context_occurrences: 3,
            favorable_rate: 0.8,
            unfavorable_rate: 0.2,
        }
    }
}

/// Runs the four independent miners over the same window.
#[derive(Debug, Clone, Default)]
pub struct PatternMiner {
    config: MinerConfig,
}

impl PatternMiner {
    /// Create a miner with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thresholds.
    pub fn with_config(mut self, config: MinerConfig) -> Self {
        self.config = config;
        self
    }

    /// Union of all miners, in miner order.
    pub fn identify_patterns(&self, window: &[Experience]) -> Vec<Pattern> {
        let mut patterns = self.success_actions(window);
        patterns.extend(self.failure_combos(window));
        patterns.extend(self.temporal_trend(window));
        patterns.extend(self.context_influence(window));
        patterns
    }

    /// Actions with enough successes and a high success rate over all uses.
    pub fn success_actions(&self, window: &[Experience]) -> Vec<Pattern> {
        // action -> (successes, uses)
        let mut stats: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for exp in window {
            let entry = stats.entry(exp.action.as_str()).or_default();
            entry.1 += 1;
            if exp.success {
                entry.0 += 1;
            }
        }

        stats
            .into_iter()
            .filter(|(_, (successes, _))| *successes >= self.config.min_action_successes)
            .filter_map(|(action, (successes, uses))| {
                let rate = successes as f64 / uses as f64;
                (rate > self.config.action_success_rate).then(|| {
                    Pattern::new(
                        PatternKind::SuccessAction,
                        format!(
                            "high success action '{}' ({:.1}% success, {} successes)",
                            action,
                            rate * 100.0,
                            successes
                        ),
                        rate,
                    )
                    .with_evidence(format!(
                        "action '{}' succeeded {} of {} times",
                        action, successes, uses
                    ))
                })
            })
            .collect()
    }

    /// Task/action pairs that failed repeatedly.
    pub fn failure_combos(&self, window: &[Experience]) -> Vec<Pattern> {
        let mut failures: BTreeMap<String, usize> = BTreeMap::new();
        for exp in window.iter().filter(|e| !e.success) {
            *failures.entry(format!("{}:{}", exp.task, exp.action)).or_default() += 1;
        }

        failures
            .into_iter()
            .filter(|(_, count)| *count >= self.config.min_combo_failures)
            .map(|(combo, count)| {
                Pattern::new(
                    PatternKind::FailureCombo,
                    format!("recurring failure: {} ({} failures)", combo, count),
                    count as f64 / window.len() as f64,
                )
                .with_evidence(format!("combo '{}' failed {} times", combo, count))
            })
            .collect()
    }

    /// Mean reward of the first half versus the second half.
    pub fn temporal_trend(&self, window: &[Experience]) -> Vec<Pattern> {
        if window.len() < self.config.min_trend_window.max(2) {
            return Vec::new();
        }

        let mid = window.len() / 2;
        let mean = |slice: &[Experience]| {
            slice.iter().map(|e| e.reward).sum::<f64>() / slice.len() as f64
        };
        let early = mean(&window[..mid]);
        let late = mean(&window[mid..]);

        if late > early + self.config.trend_delta {
            vec![Pattern::new(
                PatternKind::ImprovementTrend,
                format!("improving: mean reward rose from {:.2} to {:.2}", early, late),
                late - early,
            )
            .with_evidence(format!("recent rewards up by {:.2}", late - early))]
        } else if early > late + self.config.trend_delta {
            vec![Pattern::new(
                PatternKind::DeclineTrend,
                format!("declining: mean reward fell from {:.2} to {:.2}", early, late),
                early - late,
            )
            .with_evidence(format!("recent rewards down by {:.2}", early - late))]
        } else {
            Vec::new()
        }
    }

    /// `key=value` context entries strongly associated with an outcome.
    pub fn context_influence(&self, window: &[Experience]) -> Vec<Pattern> {
        // "key=value" -> (successes, occurrences)
        let mut stats: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for exp in window {
            for (key, value) in &exp.context {
                let entry = stats.entry(context_key(key, value)).or_default();
                entry.1 += 1;
                if exp.success {
                    entry.0 += 1;
                }
            }
        }

        stats
            .into_iter()
            .filter(|(_, (_, seen))| *seen >= self.config.min_context_occurrences)
            .filter_map(|(entry, (successes, seen))| {
                let rate = successes as f64 / seen as f64;
                let label = if rate > self.config.favorable_rate {
                    "favorable"
                } else if rate < self.config.unfavorable_rate {
                    "unfavorable"
                } else {
                    return None;
                };
                Some(
                    Pattern::new(
                        PatternKind::ContextInfluence,
                        format!("{} context: {} ({:.1}% success)", label, entry, rate * 100.0),
                        (rate - 0.5).abs() * 2.0,
                    )
                    .with_evidence(format!("succeeded {} of {} occurrences", successes, seen)),
                )
            })
            .collect()
    }
}

fn context_key(key: &str, value: &Value) -> String {
    format!("{}={}", key, value)
}
