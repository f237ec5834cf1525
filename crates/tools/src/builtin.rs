//! Built-in tools (search, calculate, analyze, plan).
//!
//! These are simulated capabilities: they shape their output like real
//! tools so that outcome scoring and learning have something to work on.
//! Randomness comes from a seedable generator shared by all built-ins.

use super::r#trait::*;
use async_trait::async_trait;
use evolve_core::{Context, Value};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use std::sync::{Arc, OnceLock};

type SharedRng = Arc<Mutex<StdRng>>;

fn shared_rng(seed: Option<u64>) -> SharedRng {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Arc::new(Mutex::new(rng))
}

fn text_or<'a>(context: &'a Context, key: &str, default: &'a str) -> &'a str {
    context.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Create the four built-in tools sharing one random generator.
pub fn builtin_tools(seed: Option<u64>) -> Vec<Arc<dyn Tool>> {
    let rng = shared_rng(seed);
    vec![
        Arc::new(SearchTool { rng: rng.clone() }),
        Arc::new(CalculateTool::new()),
        Arc::new(AnalyzeTool { rng: rng.clone() }),
        Arc::new(PlanTool { rng }),
    ]
}

/// Simulated information search.
pub struct SearchTool {
    rng: SharedRng,
}

impl SearchTool {
    /// Create with its own seeded generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: shared_rng(Some(seed)),
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search for information about a query"
    }

    async fn execute(&self, context: &Context) -> Result<Value, anyhow::Error> {
        let query = text_or(context, "query", "default query");
        let confidence = 0.5 + self.rng.lock().gen::<f64>() * 0.5;

        let mut result = Context::new();
        result.insert(
            "results".into(),
            Value::list((1..=3).map(|i| format!("search result {} for {}", i, query))),
        );
        result.insert("confidence".into(), confidence.into());
        Ok(Value::Map(result))
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            inputs: vec![Parameter::new("query", "What to search for", Some("default query"))],
        }
    }
}

/// Binary arithmetic on an `expression` such as `2 * 3`.
pub struct CalculateTool {
    pattern: &'static Regex,
}

/// `a op b` with optional signs and decimals, compiled once per process.
fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*([-+*/])\s*(-?\d+(?:\.\d+)?)\s*$")
            .expect("expression pattern is a valid literal")
    })
}

impl CalculateTool {
    /// Create the tool.
    pub fn new() -> Self {
        Self {
            pattern: expression_pattern(),
        }
    }

    /// Evaluate `a op b`, or a bare number.
    pub fn evaluate(&self, expression: &str) -> Result<f64, String> {
        if let Ok(n) = expression.trim().parse::<f64>() {
            return Ok(n);
        }

        let caps = self
            .pattern
            .captures(expression)
            .ok_or_else(|| format!("unsupported expression: {}", expression))?;

        let lhs: f64 = caps[1].parse().map_err(|_| format!("bad number: {}", &caps[1]))?;
        let rhs: f64 = caps[3].parse().map_err(|_| format!("bad number: {}", &caps[3]))?;

        match &caps[2] {
            "+" => Ok(lhs + rhs),
            "-" => Ok(lhs - rhs),
            "*" => Ok(lhs * rhs),
            "/" if rhs == 0.0 => Err("division by zero".to_string()),
            "/" => Ok(lhs / rhs),
            op => Err(format!("unsupported operator: {}", op)),
        }
    }
}

impl Default for CalculateTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a simple arithmetic expression"
    }

    async fn execute(&self, context: &Context) -> Result<Value, anyhow::Error> {
        let expression = text_or(context, "expression", "1+1");

        let mut result = Context::new();
        match self.evaluate(expression) {
            Ok(value) => {
                result.insert("result".into(), value.into());
                result.insert("success".into(), true.into());
            }
            Err(message) => {
                result.insert("result".into(), Value::Null);
                result.insert("success".into(), false.into());
                result.insert("error".into(), message.into());
            }
        }
        Ok(Value::Map(result))
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            inputs: vec![Parameter::new("expression", "Expression like `2 * 3`", Some("1+1"))],
        }
    }
}

/// Simulated data analysis.
pub struct AnalyzeTool {
    rng: SharedRng,
}

#[async_trait]
impl Tool for AnalyzeTool {
    fn name(&self) -> &str {
        "analyze"
    }

    fn description(&self) -> &str {
        "Analyze data and report insights"
    }

    async fn execute(&self, context: &Context) -> Result<Value, anyhow::Error> {
        let chars = match context.get("data") {
            Some(data) => data.to_string().chars().count(),
            None => Value::Map(context.clone()).to_string().chars().count(),
        };
        let confidence = 0.6 + self.rng.lock().gen::<f64>() * 0.3;

        let mut result = Context::new();
        result.insert("analysis".into(), format!("data contains {} characters", chars).into());
        result.insert(
            "insights".into(),
            Value::list(["feature analysis of the data", "trend identification"]),
        );
        result.insert("confidence".into(), confidence.into());
        Ok(Value::Map(result))
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            inputs: vec![Parameter::new("data", "Data to analyze", Some("the whole context"))],
        }
    }
}

/// Simulated step planning.
pub struct PlanTool {
    rng: SharedRng,
}

#[async_trait]
impl Tool for PlanTool {
    fn name(&self) -> &str {
        "plan"
    }

    fn description(&self) -> &str {
        "Break a goal into steps"
    }

    async fn execute(&self, context: &Context) -> Result<Value, anyhow::Error> {
        let goal = text_or(context, "goal", "default goal");
        let (effort, probability) = {
            let mut rng = self.rng.lock();
            (rng.gen_range(1..=10u32), 0.7 + rng.gen::<f64>() * 0.25)
        };

        let mut result = Context::new();
        result.insert(
            "plan".into(),
            Value::list((1..=3).map(|i| format!("step {}: handle part {} of {}", i, i, goal))),
        );
        result.insert("estimated_effort".into(), u64::from(effort).into());
        result.insert("success_probability".into(), probability.into());
        Ok(Value::Map(result))
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            inputs: vec![Parameter::new("goal", "Goal to plan for", Some("default goal"))],
        }
    }
}
