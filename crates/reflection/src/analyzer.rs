//! Analyzes experiences and explains their outcome.

use evolve_core::{Context, Experience, Value};

/// Heuristic explanation of one experience.
#[derive(Debug, Clone, PartialEq)]
pub struct Insight {
    /// Whether the experience was a success
    pub success: bool,
    /// Headline sentence
    pub summary: String,
    /// Success factors or failure causes
    pub factors: Vec<String>,
    /// Improvement suggestions (failures only)
    pub suggestions: Vec<String>,
}

impl Insight {
    /// Render as a single paragraph.
    pub fn render(&self) -> String {
        let mut text = self.summary.clone();
        if !self.factors.is_empty() {
            let label = if self.success { "Success factors" } else { "Possible causes" };
            text.push_str(&format!(" {}: {}.", label, self.factors.join(", ")));
        }
        if !self.suggestions.is_empty() {
            text.push_str(&format!(" Suggestions: {}.", self.suggestions.join(", ")));
        }
        text
    }
}

/// Analyzes experience outcomes.
pub struct Analyzer;

impl Analyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Analyze an experience.
    pub fn analyze(&self, experience: &Experience) -> Insight {
        if experience.success {
            Insight {
                success: true,
                summary: format!(
                    "Success analysis: task '{}' completed, action '{}' worked well in context {}.",
                    experience.task,
                    experience.action,
                    summarize_context(&experience.context)
                ),
                factors: self.success_factors(experience),
                suggestions: Vec::new(),
            }
        } else {
            Insight {
                success: false,
                summary: format!(
                    "Failure analysis: task '{}' failed, action '{}' did not fit this context.",
                    experience.task, experience.action
                ),
                factors: self.failure_reasons(experience),
                suggestions: self.improvements(experience),
            }
        }
    }

    /// What made a success work.
    pub fn success_factors(&self, experience: &Experience) -> Vec<String> {
        let mut factors = Vec::new();
        let ctx = &experience.context;

        if matches!(text(ctx, "difficulty"), Some("easy" | "beginner")) {
            factors.push("task difficulty was manageable".to_string());
        }
        let confident = match ctx.get("confidence") {
            Some(Value::Number(c)) => *c > 0.8,
            Some(Value::Text(level)) => level == "high",
            _ => false,
        };
        if confident {
            factors.push("high-confidence conditions".to_string());
        }
        match experience.action.as_str() {
            "search" => factors.push("effective information search".to_string()),
            "plan" => factors.push("sound planning".to_string()),
            "analyze" => factors.push("thorough analysis".to_string()),
            _ => {}
        }
        if experience.reward > 0.8 {
            factors.push("high-quality result".to_string());
        }
        factors
    }

    /// Likely causes of a failure.
    pub fn failure_reasons(&self, experience: &Experience) -> Vec<String> {
        let mut reasons = Vec::new();

        if text(&experience.context, "difficulty") == Some("hard") {
            reasons.push("task difficulty too high".to_string());
        }
        if experience.result.get("error").is_some() {
            reasons.push("an error occurred during execution".to_string());
        }
        if let Some(confidence) = experience.result.get("confidence").and_then(Value::as_f64) {
            if confidence < 0.5 {
                reasons.push("result confidence too low".to_string());
            }
        }
        if experience.reward < -0.5 {
            reasons.push("poor result quality".to_string());
        }
        reasons
    }

    /// What to try next time.
    pub fn improvements(&self, experience: &Experience) -> Vec<String> {
        let mut suggestions = Vec::new();

        match experience.action.as_str() {
            "search" => suggestions.push("use more precise search keywords".to_string()),
            "calculate" => suggestions.push("check the expression format".to_string()),
            "analyze" => suggestions.push("deepen the analysis".to_string()),
            "plan" => suggestions.push("make a more detailed plan".to_string()),
            _ => {}
        }

        let task = experience.task.to_lowercase();
        if task.contains("search") {
            suggestions.push("consider a combined search strategy".to_string());
        }
        if task.contains("calculat") {
            suggestions.push("verify the input data".to_string());
        }
        if task.contains("analy") {
            suggestions.push("collect more relevant data".to_string());
        }

        if experience.reward < 0.0 {
            suggestions.push("look for alternative approaches".to_string());
        }
        suggestions
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// `{k=v, ...}` over the first three entries, or `empty context`.
pub fn summarize_context(context: &Context) -> String {
    if context.is_empty() {
        return "empty context".to_string();
    }
    let shown: Vec<String> = context
        .iter()
        .take(3)
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    let more = if context.len() > 3 { ", ..." } else { "" };
    format!("{{{}{}}}", shown.join(", "), more)
}

fn text<'a>(context: &'a Context, key: &str) -> Option<&'a str> {
    context.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolve_core::context;

    #[test]
    fn test_summarize_context() {
        assert_eq!(summarize_context(&Context::new()), "empty context");
        assert_eq!(summarize_context(&context! { "a" => 1.0 }), "{a=1}");
        let long = context! { "a" => "x", "b" => "y", "c" => "z", "d" => "w" };
        assert_eq!(summarize_context(&long), "{a=x, b=y, c=z, ...}");
    }

    #[test]
    fn test_success_factors() {
        let exp = Experience::new(
            "search: rust",
            context! { "difficulty" => "beginner", "confidence" => 0.9 },
            "search",
            Value::Null,
            true,
            1.0,
        );
        let insight = Analyzer::new().analyze(&exp);
        assert!(insight.success);
        assert!(insight.summary.starts_with("Success analysis: task 'search: rust'"));
        assert_eq!(
            insight.factors,
            vec![
                "task difficulty was manageable",
                "high-confidence conditions",
                "effective information search",
                "high-quality result",
            ]
        );
        assert!(insight.suggestions.is_empty());
    }

    #[test]
    fn test_failure_reasons_and_suggestions() {
        let exp = Experience::new(
            "calculate: 1/0",
            context! { "difficulty" => "hard" },
            "calculate",
            context! { "error" => "division by zero" }.into(),
            false,
            -1.0,
        );
        let insight = Analyzer::new().analyze(&exp);
        assert_eq!(
            insight.factors,
            vec![
                "task difficulty too high",
                "an error occurred during execution",
                "poor result quality",
            ]
        );
        assert_eq!(
            insight.suggestions,
            vec![
                "check the expression format",
                "verify the input data",
                "look for alternative approaches",
            ]
        );
        let text = insight.render();
        assert!(text.contains("Possible causes: task difficulty too high"));
        assert!(text.ends_with("look for alternative approaches."));
    }
}
