//! Tool registry - name to tool map.

use crate::{error_result, Tool, ToolExecutor, ToolSchema};
use async_trait::async_trait;
use dashmap::DashMap;
use evolve_core::{Context, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Concurrent registry of tools keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-loaded with the built-in tools.
    pub fn with_builtins(seed: Option<u64>) -> Self {
        let registry = Self::new();
        for tool in crate::builtin_tools(seed) {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!("Replaced tool {}", name);
        } else {
            info!("Registered tool {}", name);
        }
    }

    /// Register a tool only if the name is free. Returns whether it was added.
    pub fn register_if_absent(&self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        let mut added = false;
        self.tools.entry(name.clone()).or_insert_with(|| {
            added = true;
            tool
        });
        if added {
            info!("Registered tool {}", name);
        }
        added
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|t| Arc::clone(t.value()))
    }

    /// Whether a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|t| t.key().clone()).collect();
        names.sort();
        names
    }

    /// Schemas of all registered tools, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.iter().map(|t| t.value().schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute_tool(&self, tool: &str, context: &Context) -> Value {
        // Clone the handle so no map guard is held across the await.
        let Some(handle) = self.get(tool) else {
            warn!("Unknown action: {}", tool);
            return error_result(format!("unknown action: {}", tool));
        };

        match handle.execute(context).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Tool {} failed: {}", tool, e);
                error_result(e.to_string())
            }
        }
    }
}
