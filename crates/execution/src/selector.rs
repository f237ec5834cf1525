//! Action selection strategies.

use crate::Perception;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Strategy for choosing the next action.
pub trait ActionSelector: Send + Sync {
    /// Choose an action. `available` lists registered action names.
    ///
    /// Returns `None` only when there is nothing to choose from.
    fn select(&self, perception: &Perception, available: &[String], exploration_rate: f64) -> Option<String>;
}

/// Exploit the best strategy, otherwise explore.
///
/// With probability `1 - exploration_rate` an action of the best matching
/// strategy is picked. Otherwise, or with no matching strategy, an action
/// that succeeded in a relevant experience is picked, falling back to any
/// available action.
pub struct EpsilonGreedySelector {
    rng: Mutex<StdRng>,
}

impl EpsilonGreedySelector {
    /// Create a selector; a seed makes choices reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng: Mutex::new(rng) }
    }
}

impl Default for EpsilonGreedySelector {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ActionSelector for EpsilonGreedySelector {
    fn select(&self, perception: &Perception, available: &[String], exploration_rate: f64) -> Option<String> {
        let mut rng = self.rng.lock();

        if let Some(best) = perception.applicable_strategies.first() {
            if !best.actions.is_empty() && rng.gen::<f64>() > exploration_rate {
                return best.actions.choose(&mut *rng).cloned();
            }
        }

        let successful: Vec<&String> = perception
            .relevant_experiences
            .iter()
            .filter(|e| e.success)
            .map(|e| &e.action)
            .collect();
        if let Some(action) = successful.choose(&mut *rng) {
            return Some((*action).clone());
        }

        available.choose(&mut *rng).cloned()
    }
}

/// Plays back a fixed list of actions, then repeats the last one.
///
/// For reproducing a known action sequence.
pub struct ScriptedSelector {
    script: Vec<String>,
    cursor: Mutex<usize>,
}

impl ScriptedSelector {
    /// Create from a sequence of action names.
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(Into::into).collect(),
            cursor: Mutex::new(0),
        }
    }
}

impl ActionSelector for ScriptedSelector {
    fn select(&self, _perception: &Perception, available: &[String], _exploration_rate: f64) -> Option<String> {
        let mut cursor = self.cursor.lock();
        let action = self
            .script
            .get(*cursor)
            .or_else(|| self.script.last())
            .cloned()
            .or_else(|| available.first().cloned());
        *cursor += 1;
        action
    }
}
