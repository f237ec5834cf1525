//! Name-keyed strategy table.

use dashmap::DashMap;
use evolve_core::{Context, Strategy};
use tracing::{debug, info};

/// Concurrent table of strategies keyed by name.
///
/// Inserts are upserts, so a name can never appear twice.
#[derive(Debug, Default)]
pub struct StrategyTable {
    strategies: DashMap<String, Strategy>,
}

impl StrategyTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding the two starter strategies.
    ///
    /// `explore` favours information gathering under high uncertainty,
    /// `exploit` favours planning and calculation when confidence is high.
    pub fn with_defaults() -> Self {
        let table = Self::new();

        let mut explore = Context::new();
        explore.insert("uncertainty".into(), "high".into());
        table.upsert(Strategy::new(
            "explore",
            "Explore when the situation is uncertain",
            explore,
            vec!["search".into(), "analyze".into()],
            0.5,
            0,
        ));

        let mut exploit = Context::new();
        exploit.insert("confidence".into(), "high".into());
        table.upsert(Strategy::new(
            "exploit",
            "Use methods known to work",
            exploit,
            vec!["plan".into(), "calculate".into()],
            0.8,
            0,
        ));

        table
    }

    /// Insert or replace a strategy by name.
    pub fn upsert(&self, strategy: Strategy) {
        self.strategies.insert(strategy.name.clone(), strategy);
    }

    /// Record an outcome for a named strategy.
    ///
    /// An existing strategy gets an EMA update; otherwise `create` builds
    /// the initial entry. Returns `true` if the strategy was created.
    pub fn record_outcome<F>(&self, name: &str, success: bool, alpha: f64, create: F) -> bool
    where
        F: FnOnce() -> Strategy,
    {
        let mut created = false;
        self.strategies
            .entry(name.to_string())
            .and_modify(|s| s.update_success_rate(success, alpha))
            .or_insert_with(|| {
                created = true;
                create()
            });
        if created {
            debug!("Created strategy {}", name);
        }
        created
    }

    /// Get a copy of a strategy.
    pub fn get(&self, name: &str) -> Option<Strategy> {
        self.strategies.get(name).map(|s| s.value().clone())
    }

    /// Whether a strategy exists.
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Remove a strategy.
    pub fn remove(&self, name: &str) -> Option<Strategy> {
        self.strategies.remove(name).map(|(_, s)| s)
    }

    /// Strategies matching a context, best success rate first.
    ///
    /// Ties are ordered by name so selection stays reproducible.
    pub fn matching(&self, context: &Context) -> Vec<Strategy> {
        let mut matched: Vec<Strategy> = self
            .strategies
            .iter()
            .filter(|s| s.matches_context(context))
            .map(|s| s.value().clone())
            .collect();
        matched.sort_by(|a, b| {
            b.success_rate
                .total_cmp(&a.success_rate)
                .then_with(|| a.name.cmp(&b.name))
        });
        matched
    }

    /// Remove every strategy matching `predicate`, returning removed names.
    pub fn remove_where<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&Strategy) -> bool,
    {
        let mut doomed: Vec<String> = self
            .strategies
            .iter()
            .filter(|s| predicate(s.value()))
            .map(|s| s.key().clone())
            .collect();
        doomed.sort();

        for name in &doomed {
            self.strategies.remove(name);
            info!("Removed strategy {}", name);
        }
        doomed
    }

    /// Copies of all strategies, sorted by name.
    pub fn snapshot(&self) -> Vec<Strategy> {
        let mut all: Vec<Strategy> = self.strategies.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Number of strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_strategy(name: &str, rate: f64, usage: u32) -> Strategy {
        Strategy::new(name, "test", Context::new(), vec!["search".into()], rate, usage)
    }

    #[test]
    fn test_defaults() {
        let table = StrategyTable::with_defaults();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("exploit").unwrap().actions, vec!["plan", "calculate"]);
    }

    #[test]
    fn test_upsert_replaces() {
        let table = StrategyTable::new();
        table.upsert(create_test_strategy("a", 0.1, 0));
        table.upsert(create_test_strategy("a", 0.9, 3));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a").unwrap().usage_count, 3);
    }

    #[test]
    fn test_record_outcome_creates_then_updates() {
        let table = StrategyTable::new();
        let created = table.record_outcome("a", true, 0.1, || create_test_strategy("a", 1.0, 1));
        assert!(created);

        let created = table.record_outcome("a", false, 0.1, || unreachable!());
        assert!(!created);
        let s = table.get("a").unwrap();
        assert_eq!(s.usage_count, 2);
        assert!((s.success_rate - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_matching_sorted_by_rate() {
        let table = StrategyTable::new();
        table.upsert(create_test_strategy("low", 0.2, 0));
        table.upsert(create_test_strategy("high", 0.9, 0));
        table.upsert(create_test_strategy("mid", 0.5, 0));
        let names: Vec<_> = table.matching(&Context::new()).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_remove_where() {
        let table = StrategyTable::new();
        table.upsert(create_test_strategy("weak", 0.2, 11));
        table.upsert(create_test_strategy("young", 0.1, 2));
        let removed = table.remove_where(|s| s.usage_count > 10 && s.success_rate < 0.3);
        assert_eq!(removed, vec!["weak"]);
        assert!(table.contains("young"));
    }
}
