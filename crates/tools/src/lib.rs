//! Tool Integration
//!
//! Actions the agent can execute, looked up by name in a registry.

#![warn(missing_docs)]

pub mod r#trait;
pub mod builtin;
pub mod combo;
pub mod registry;

pub use r#trait::{error_result, Parameter, Tool, ToolExecutor, ToolSchema};
pub use builtin::{builtin_tools, AnalyzeTool, CalculateTool, PlanTool, SearchTool};
pub use combo::{combo_name, ComboTool};
pub use registry::ToolRegistry;
