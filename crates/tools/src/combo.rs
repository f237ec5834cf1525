//! Composite tools synthesized from frequently chained actions.

use crate::Tool;
use async_trait::async_trait;
use evolve_core::{Context, Value};
use std::sync::Arc;

/// Runs two tools in sequence, feeding the first result into the second.
///
/// The second tool sees the incoming context plus a `previous_result`
/// key. The combined result carries both sub-results and the final one.
pub struct ComboTool {
    name: String,
    description: String,
    first: Arc<dyn Tool>,
    second: Arc<dyn Tool>,
}

impl ComboTool {
    /// Chain `first` then `second`. The tool is named `combo_<first>_<second>`.
    pub fn new(first: Arc<dyn Tool>, second: Arc<dyn Tool>) -> Self {
        let name = combo_name(first.name(), second.name());
        let description = format!("Run {} then {}", first.name(), second.name());
        Self {
            name,
            description,
            first,
            second,
        }
    }
}

/// Name given to the combo of two actions.
pub fn combo_name(first: &str, second: &str) -> String {
    format!("combo_{}_{}", first, second)
}

#[async_trait]
impl Tool for ComboTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, context: &Context) -> Result<Value, anyhow::Error> {
        let first = self.first.execute(context).await?;

        let mut chained = context.clone();
        chained.insert("previous_result".into(), first.clone());
        let second = self.second.execute(&chained).await?;

        let mut result = Context::new();
        result.insert("sequence_results".into(), Value::List(vec![first, second.clone()]));
        result.insert("final_result".into(), second);
        result.insert("combo_success".into(), true.into());
        Ok(Value::Map(result))
    }
}
