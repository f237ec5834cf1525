//! Strategy - a learned condition to action-set policy.

use crate::error::{required, required_f64, required_map, required_str, required_time, time_to_value};
use crate::experience::task_type;
use crate::{Context, SnapshotError, Time, Value};
use serde::{Deserialize, Serialize};

/// A condition-matched policy mapping a context shape to candidate actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Unique name (table key)
    pub name: String,

    /// Human readable description
    pub description: String,

    /// Conditions a context must satisfy; empty matches everything
    pub conditions: Context,

    /// Candidate actions
    pub actions: Vec<String>,

    /// Estimated success rate in `[0, 1]`
    pub success_rate: f64,

    /// Number of recorded uses
    pub usage_count: u32,

    /// Last time the rate changed
    pub last_updated: Time,
}

impl Strategy {
    /// Create a new strategy.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        conditions: Context,
        actions: Vec<String>,
        success_rate: f64,
        usage_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            conditions,
            actions,
            success_rate: success_rate.clamp(0.0, 1.0),
            usage_count,
            last_updated: chrono::Utc::now(),
        }
    }

    /// Blend an outcome into the success rate with an exponential moving average.
    ///
    /// `rate <- (1 - alpha) * rate + alpha * sample`, where the sample is
    /// 1.0 on success and 0.0 otherwise.
    pub fn update_success_rate(&mut self, success: bool, alpha: f64) {
        let sample = if success { 1.0 } else { 0.0 };
        let alpha = alpha.clamp(0.0, 1.0);
        self.success_rate = ((1.0 - alpha) * self.success_rate + alpha * sample).clamp(0.0, 1.0);
        self.usage_count += 1;
        self.last_updated = chrono::Utc::now();
    }

    /// Check whether this strategy applies to a context.
    ///
    /// Every condition key must either be present in the context with an
    /// equal value or be inferable from it. `uncertainty` and `task_type`
    /// are inferable; any other missing key fails the match.
    pub fn matches_context(&self, context: &Context) -> bool {
        self.conditions.iter().all(|(key, expected)| match context.get(key) {
            Some(actual) => actual == expected,
            None => infer_condition(key, expected, context),
        })
    }

    /// Flatten into a generic string-keyed map.
    pub fn to_map(&self) -> Context {
        let mut map = Context::new();
        map.insert("name".into(), self.name.clone().into());
        map.insert("description".into(), self.description.clone().into());
        map.insert("conditions".into(), Value::Map(self.conditions.clone()));
        map.insert("actions".into(), Value::list(self.actions.iter().cloned()));
        map.insert("success_rate".into(), self.success_rate.into());
        map.insert("usage_count".into(), u64::from(self.usage_count).into());
        map.insert("last_updated".into(), time_to_value(&self.last_updated));
        map
    }

    /// Rebuild from a map produced by [`Strategy::to_map`].
    pub fn from_map(map: &Context) -> Result<Self, SnapshotError> {
        let actions = required(map, "actions")?
            .as_list()
            .ok_or(SnapshotError::InvalidField { field: "actions", expected: "list" })?
            .iter()
            .map(|a| {
                a.as_str().map(str::to_string).ok_or(SnapshotError::InvalidField {
                    field: "actions",
                    expected: "list of text",
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let usage = required_f64(map, "usage_count")?;
        if usage < 0.0 {
            return Err(SnapshotError::InvalidField {
                field: "usage_count",
                expected: "non-negative number",
            });
        }

        Ok(Self {
            name: required_str(map, "name")?,
            description: required_str(map, "description")?,
            conditions: required_map(map, "conditions")?,
            actions,
            success_rate: required_f64(map, "success_rate")?.clamp(0.0, 1.0),
            usage_count: usage as u32,
            last_updated: required_time(map, "last_updated")?,
        })
    }
}

fn infer_condition(key: &str, expected: &Value, context: &Context) -> bool {
    match key {
        "uncertainty" => {
            let level = context_uncertainty(context);
            match expected.as_str() {
                Some("high") => level >= 0.5,
                Some("low") => level <= 0.5,
                _ => false,
            }
        }
        "task_type" => match (context.get("task").and_then(Value::as_str), expected.as_str()) {
            (Some(task), Some(expected)) => task_type(task) == expected,
            _ => false,
        },
        _ => false,
    }
}

/// Uncertainty estimate used when matching `uncertainty` conditions.
///
/// Longer tasks raise it, richer contexts lower it. Always in `[0, 1]`.
pub fn context_uncertainty(context: &Context) -> f64 {
    let words = context
        .get("task")
        .and_then(Value::as_str)
        .map(|t| t.split_whitespace().count())
        .unwrap_or(0);
    let complexity = (words as f64 / 10.0).min(1.0);
    let information = (context.len() as f64 / 5.0).min(1.0);
    (complexity * (1.0 - information * 0.5)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;

    fn create_test_strategy(conditions: Context) -> Strategy {
        Strategy::new("s", "test", conditions, vec!["search".into()], 0.5, 0)
    }

    #[test]
    fn test_ema_increases_toward_one() {
        let mut s = create_test_strategy(Context::new());
        let mut last = s.success_rate;
        for _ in 0..50 {
            s.update_success_rate(true, 0.1);
            assert!(s.success_rate > last);
            assert!(s.success_rate <= 1.0);
            last = s.success_rate;
        }
        assert_eq!(s.usage_count, 50);
    }

    #[test]
    fn test_ema_decreases_toward_zero() {
        let mut s = create_test_strategy(Context::new());
        let mut last = s.success_rate;
        for _ in 0..50 {
            s.update_success_rate(false, 0.1);
            assert!(s.success_rate < last);
            assert!(s.success_rate >= 0.0);
            last = s.success_rate;
        }
    }

    #[test]
    fn test_empty_conditions_match_everything() {
        let s = create_test_strategy(Context::new());
        assert!(s.matches_context(&Context::new()));
        assert!(s.matches_context(&context! { "anything" => 1i64 }));
    }

    #[test]
    fn test_literal_condition() {
        let s = create_test_strategy(context! { "confidence" => "high" });
        assert!(s.matches_context(&context! { "confidence" => "high" }));
        assert!(!s.matches_context(&context! { "confidence" => "low" }));
        // unknown, non-inferable key
        assert!(!s.matches_context(&context! { "task" => "plan: x" }));
    }

    #[test]
    fn test_task_type_inference() {
        let s = create_test_strategy(context! { "task_type" => "search" });
        assert!(s.matches_context(&context! { "task" => "search: rust" }));
        assert!(!s.matches_context(&context! { "task" => "plan: rust" }));
        assert!(!s.matches_context(&Context::new()));
    }

    #[test]
    fn test_uncertainty_inference() {
        let high = create_test_strategy(context! { "uncertainty" => "high" });
        let low = create_test_strategy(context! { "uncertainty" => "low" });

        // 12 words, only the task key: complexity 1.0, information 0.2 -> 0.9
        let long_task = context! {
            "task" => "search for every single detail about the many async runtimes out there"
        };
        assert!(high.matches_context(&long_task));
        assert!(!low.matches_context(&long_task));

        // short task -> low uncertainty
        let short_task = context! { "task" => "plan: x" };
        assert!(low.matches_context(&short_task));
        assert!(!high.matches_context(&short_task));
    }

    #[test]
    fn test_map_round_trip() {
        let mut s = create_test_strategy(context! { "task_type" => "search" });
        s.update_success_rate(true, 0.1);
        let restored = Strategy::from_map(&s.to_map()).unwrap();
        assert_eq!(restored, s);
        assert_eq!(restored.usage_count, 1);
    }
}
