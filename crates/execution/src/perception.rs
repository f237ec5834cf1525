//! Perception - what the agent knows about the current context.

use evolve_core::{Context, Experience, Strategy, Value};
use evolve_storage::{ExperienceMemory, StrategyTable};
use std::collections::HashSet;

/// Most recent experiences scanned for relevance.
pub const RELEVANCE_SCAN: usize = 50;

/// Context similarity an experience must exceed to be relevant.
pub const RELEVANCE_THRESHOLD: f64 = 0.5;

/// Relevant experiences kept (best reward first).
pub const MAX_RELEVANT: usize = 10;

/// Result of the perceive phase.
#[derive(Debug, Clone)]
pub struct Perception {
    /// Similar past experiences, highest reward first
    pub relevant_experiences: Vec<Experience>,
    /// Strategies matching the context, best success rate first
    pub applicable_strategies: Vec<Strategy>,
    /// Uncertainty in `[0, 1]`
    pub uncertainty: f64,
}

/// Gather relevant experiences, matching strategies and uncertainty.
pub fn perceive(memory: &ExperienceMemory, strategies: &StrategyTable, context: &Context) -> Perception {
    let relevant_experiences = relevant_experiences(memory, context);
    let uncertainty = estimate_uncertainty(context, relevant_experiences.len());
    Perception {
        relevant_experiences,
        applicable_strategies: strategies.matching(context),
        uncertainty,
    }
}

/// Recent experiences whose context resembles `context`.
pub fn relevant_experiences(memory: &ExperienceMemory, context: &Context) -> Vec<Experience> {
    let mut relevant: Vec<Experience> = memory
        .recent(RELEVANCE_SCAN)
        .into_iter()
        .filter(|e| context_similarity(&e.context, context) > RELEVANCE_THRESHOLD)
        .collect();
    relevant.sort_by(|a, b| b.reward.total_cmp(&a.reward));
    relevant.truncate(MAX_RELEVANT);
    relevant
}

/// Mean per-key similarity over the keys both contexts share.
///
/// Text values compare by word overlap, other values by equality.
/// No shared keys gives `0.0`.
pub fn context_similarity(a: &Context, b: &Context) -> f64 {
    let scores: Vec<f64> = a
        .iter()
        .filter_map(|(key, left)| b.get(key).map(|right| (left, right)))
        .map(|(left, right)| match (left, right) {
            (Value::Text(l), Value::Text(r)) => string_similarity(l, r),
            _ if left == right => 1.0,
            _ => 0.0,
        })
        .collect();

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Jaccard similarity of whitespace-separated words.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    let union = left.union(&right).count();
    if union == 0 {
        // two blank strings
        return if a == b { 1.0 } else { 0.0 };
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// Average of task complexity (when a task is present) and sparsity of
/// relevant experience.
pub fn estimate_uncertainty(context: &Context, relevant_count: usize) -> f64 {
    let mut factors = Vec::with_capacity(2);
    if let Some(task) = context.get("task").and_then(Value::as_str) {
        factors.push((task.split_whitespace().count() as f64 / 10.0).min(1.0));
    }
    factors.push((1.0 - relevant_count as f64 / MAX_RELEVANT as f64).max(0.0));
    factors.iter().sum::<f64>() / factors.len() as f64
}
