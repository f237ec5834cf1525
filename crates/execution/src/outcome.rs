//! Outcome scoring.

use evolve_core::Value;
use serde::{Deserialize, Serialize};

/// Success flag and reward for one result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether the attempt counts as a success
    pub success: bool,
    /// Scalar reward
    pub reward: f64,
}

impl Outcome {
    const fn new(success: bool, reward: f64) -> Self {
        Self { success, reward }
    }
}

/// Score a tool result.
///
/// Rules, first match wins:
/// - `error` key: failure, `-1.0`
/// - boolean `success`: that flag, `1.0` or `-0.5`
/// - numeric `confidence`: success above 0.7 with the confidence as
///   reward, else `-0.3`
/// - any other map: success, `0.5`
/// - a non-map result: success, `0.3`
pub fn evaluate_result(result: &Value) -> Outcome {
    let Value::Map(map) = result else {
        return Outcome::new(true, 0.3);
    };

    if map.contains_key("error") {
        return Outcome::new(false, -1.0);
    }
    if let Some(success) = map.get("success").and_then(Value::as_bool) {
        return Outcome::new(success, if success { 1.0 } else { -0.5 });
    }
    if let Some(confidence) = map.get("confidence").and_then(Value::as_f64) {
        return if confidence > 0.7 {
            Outcome::new(true, confidence)
        } else {
            Outcome::new(false, -0.3)
        };
    }
    Outcome::new(true, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolve_core::context;

    #[test]
    fn test_scoring_rules() {
        let error = context! { "error" => "boom", "success" => true }.into();
        assert_eq!(evaluate_result(&error), Outcome::new(false, -1.0));

        let explicit = context! { "success" => false, "confidence" => 0.9 }.into();
        assert_eq!(evaluate_result(&explicit), Outcome::new(false, -0.5));
        let explicit = context! { "success" => true }.into();
        assert_eq!(evaluate_result(&explicit), Outcome::new(true, 1.0));

        let confident = context! { "confidence" => 0.75 }.into();
        assert_eq!(evaluate_result(&confident), Outcome::new(true, 0.75));
        let unsure = context! { "confidence" => 0.7 }.into();
        assert_eq!(evaluate_result(&unsure), Outcome::new(false, -0.3));

        let plain = context! { "plan" => "x" }.into();
        assert_eq!(evaluate_result(&plain), Outcome::new(true, 0.5));

        assert_eq!(evaluate_result(&Value::from("raw")), Outcome::new(true, 0.3));
        assert_eq!(evaluate_result(&Value::Null), Outcome::new(true, 0.3));
    }

    #[test]
    fn test_non_boolean_success_falls_through() {
        let odd = context! { "success" => "yes", "confidence" => 0.9 }.into();
        assert_eq!(evaluate_result(&odd), Outcome::new(true, 0.9));
    }
}
