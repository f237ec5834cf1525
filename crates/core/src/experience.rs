//! Experience - the record of one task attempt.

use crate::error::{required, required_bool, required_f64, required_map, required_str, required_time, time_to_value};
use crate::{Context, ExperienceId, SnapshotError, Time, Value};
use serde::{Deserialize, Serialize};

/// One attempt at a task and its scored outcome.
///
/// Everything except `reflection` is fixed at creation; the reflection is
/// attached once the reflection engine has looked at the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// Unique ID
    pub id: ExperienceId,

    /// Task description as submitted
    pub task: String,

    /// Context the task ran with (includes the `task` key)
    pub context: Context,

    /// Action (tool name) that was executed
    pub action: String,

    /// Raw tool result
    pub result: Value,

    /// Whether the outcome counted as a success
    pub success: bool,

    /// Scalar reward from outcome scoring
    pub reward: f64,

    /// When the attempt happened
    pub timestamp: Time,

    /// Reflection text, filled in after the attempt
    pub reflection: Option<String>,
}

impl Experience {
    /// Create a new experience stamped with the current time.
    pub fn new(
        task: impl Into<String>,
        context: Context,
        action: impl Into<String>,
        result: Value,
        success: bool,
        reward: f64,
    ) -> Self {
        Self {
            id: ExperienceId::new(),
            task: task.into(),
            context,
            action: action.into(),
            result,
            success,
            reward,
            timestamp: chrono::Utc::now(),
            reflection: None,
        }
    }

    /// Override the timestamp.
    pub fn with_timestamp(mut self, timestamp: Time) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach reflection text.
    pub fn with_reflection(mut self, reflection: impl Into<String>) -> Self {
        self.reflection = Some(reflection.into());
        self
    }

    /// Task type: the prefix before the first `:`, or the whole task.
    pub fn task_type(&self) -> &str {
        task_type(&self.task)
    }

    /// Flatten into a generic string-keyed map.
    ///
    /// Timestamps are stored as RFC 3339 text with nanoseconds.
    pub fn to_map(&self) -> Context {
        let mut map = Context::new();
        map.insert("id".into(), self.id.to_string().into());
        map.insert("task".into(), self.task.clone().into());
        map.insert("context".into(), Value::Map(self.context.clone()));
        map.insert("action".into(), self.action.clone().into());
        map.insert("result".into(), self.result.clone());
        map.insert("success".into(), self.success.into());
        map.insert("reward".into(), self.reward.into());
        map.insert("timestamp".into(), time_to_value(&self.timestamp));
        map.insert("reflection".into(), self.reflection.clone().into());
        map
    }

    /// Rebuild from a map produced by [`Experience::to_map`].
    ///
    /// A missing `id` gets a fresh one; a missing `reflection` is `None`.
    pub fn from_map(map: &Context) -> Result<Self, SnapshotError> {
        let id = match map.get("id").and_then(Value::as_str) {
            Some(raw) => raw.parse().map_err(|_| SnapshotError::InvalidField {
                field: "id",
                expected: "ulid",
            })?,
            None => ExperienceId::new(),
        };

        let reflection = match map.get("reflection") {
            None | Some(Value::Null) => None,
            Some(Value::Text(s)) => Some(s.clone()),
            Some(_) => {
                return Err(SnapshotError::InvalidField {
                    field: "reflection",
                    expected: "text or null",
                })
            }
        };

        Ok(Self {
            id,
            task: required_str(map, "task")?,
            context: required_map(map, "context")?,
            action: required_str(map, "action")?,
            result: required(map, "result")?.clone(),
            success: required_bool(map, "success")?,
            reward: required_f64(map, "reward")?,
            timestamp: required_time(map, "timestamp")?,
            reflection,
        })
    }
}

/// Task type of a task string: the prefix before the first `:`.
pub fn task_type(task: &str) -> &str {
    task.split_once(':').map(|(prefix, _)| prefix).unwrap_or(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;

    fn create_test_experience() -> Experience {
        Experience::new(
            "search: rust async",
            context! { "task" => "search: rust async", "difficulty" => "beginner" },
            "search",
            Value::Map(context! { "confidence" => 0.9 }),
            true,
            0.9,
        )
    }

    #[test]
    fn test_map_round_trip() {
        let exp = create_test_experience().with_reflection("worked well");
        let restored = Experience::from_map(&exp.to_map()).unwrap();

        assert_eq!(restored, exp);
        assert_eq!(restored.reflection.as_deref(), Some("worked well"));
    }

    #[test]
    fn test_map_round_trip_keeps_nanoseconds() {
        let at = chrono::DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let exp = create_test_experience().with_timestamp(at);
        let restored = Experience::from_map(&exp.to_map()).unwrap();
        assert_eq!(restored, exp);
        assert_eq!(restored.timestamp.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_from_map_rejects_bad_timestamp() {
        let mut map = create_test_experience().to_map();
        map.insert("timestamp".into(), 1_700_000_000_000.0.into());
        let err = Experience::from_map(&map).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidField { field: "timestamp", .. }));
    }

    #[test]
    fn test_from_map_missing_field() {
        let mut map = create_test_experience().to_map();
        map.remove("action");
        let err = Experience::from_map(&map).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingField("action")));
    }

    #[test]
    fn test_task_type() {
        assert_eq!(task_type("search: rust"), "search");
        assert_eq!(task_type("no prefix here"), "no prefix here");
        assert_eq!(create_test_experience().task_type(), "search");
    }
}
