//! Tool abstraction.

use async_trait::async_trait;
use evolve_core::{Context, Value};
use serde::{Deserialize, Serialize};

/// An action the agent can take.
///
/// Tools read what they need from the task context and return a structured
/// result. Conventional result keys are `error`, `success`, `confidence`
/// and `results`; outcome scoring relies only on those.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get tool name (the action name).
    fn name(&self) -> &str;

    /// Get tool description.
    fn description(&self) -> &str;

    /// Execute the tool.
    async fn execute(&self, context: &Context) -> Result<Value, anyhow::Error>;

    /// Get tool schema (for listing and discovery).
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            inputs: Vec::new(),
        }
    }
}

/// Tool executor - runs tools by name.
///
/// Execution never fails: unknown names and tool errors come back as a
/// map holding an `error` key.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool by name.
    async fn execute_tool(&self, tool: &str, context: &Context) -> Value;
}

/// Tool schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,

    /// Description
    pub description: String,

    /// Context keys the tool reads
    pub inputs: Vec<Parameter>,
}

/// A context key read by a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Context key
    pub name: String,

    /// Description
    pub description: String,

    /// Value used when the key is absent
    pub default: Option<String>,
}

impl Parameter {
    /// Create a parameter description.
    pub fn new(name: &str, description: &str, default: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            default: default.map(str::to_string),
        }
    }
}

/// Build the structured error result used for failed executions.
pub fn error_result(message: impl Into<String>) -> Value {
    let mut map = Context::new();
    map.insert("error".into(), Value::Text(message.into()));
    Value::Map(map)
}
