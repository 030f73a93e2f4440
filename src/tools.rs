//! The tool collaborator interface: named, schema-described functions the
//! engine can invoke on the model's behalf.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::llm::ToolDeclaration;

/// Errors a [`Tool`] body can raise. Recorded as `ToolExecutionFailed`
/// events by the tool step; never propagated as exceptions past it.
#[derive(Debug, Clone)]
pub enum ToolError {
    /// No tool registered under this name.
    NotFound(String),
    /// The tool ran and signalled an application-level failure.
    ExecutionFailed(String),
    /// The supplied arguments did not match the tool's parameter schema.
    InvalidParameters(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::NotFound(name) => write!(f, "tool not found: {}", name),
            ToolError::ExecutionFailed(msg) => write!(f, "tool execution failed: {}", msg),
            ToolError::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
        }
    }
}

impl Error for ToolError {}

/// A named, schema-described function the engine can invoke.
///
/// Tool bodies are synchronous: the spec treats a tool call as a bounded
/// unit of work the step executor times, not a long-running task.
pub trait Tool: Send + Sync {
    /// Name as it will appear in the LLM's `tools` declaration and in
    /// `ToolExecutionRequested.tool_name`.
    fn name(&self) -> &str;

    /// Human-readable description surfaced to the LLM to aid tool selection.
    fn description(&self) -> &str;

    /// JSON Schema object describing the accepted parameters.
    fn parameters_schema(&self) -> Value;

    /// Run the tool body against already-parsed JSON arguments.
    ///
    /// Argument validation is the tool's own responsibility; a mismatch
    /// should be signalled as [`ToolError::InvalidParameters`] rather than
    /// a panic.
    fn execute(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// A read-only, name-keyed collection of tools built once at startup.
///
/// No reflection happens at call time; lookup is a single map access.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Register a tool, overwriting any previous registration under the
    /// same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// The JSON-Schema-compatible declarations for every registered tool,
    /// in the shape an [`crate::llm::LlmClient`] expects.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools
            .values()
            .map(|tool| ToolDeclaration {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters_schema: tool.parameters_schema(),
            })
            .collect()
    }
}
