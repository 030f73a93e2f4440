//! The LLM collaborator interface.
//!
//! The engine depends on [`LlmClient`] rather than any concrete provider.
//! Vendor adapters (OpenAI, Anthropic, a local model server) live outside
//! this crate and implement the trait.

use async_trait::async_trait;
use std::error::Error;
use std::fmt;

use crate::events::TokenUsage;
use crate::projections::llm_context::LlmMessage;

/// A tool schema advertised to the LLM alongside a chat request.
#[derive(Debug, Clone)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the accepted parameters.
    pub parameters_schema: serde_json::Value,
}

/// One tool invocation the model asked for in its response.
#[derive(Debug, Clone)]
pub struct LlmToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The result of a single LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// `None` when the model responded with tool calls only.
    pub text: Option<String>,
    pub tool_calls: Vec<LlmToolCall>,
    pub model_name: String,
    pub token_usage: Option<TokenUsage>,
}

/// An error raised by an [`LlmClient`] implementation, distinguished from
/// store/engine errors so the LLM step can tell a model-layer failure
/// apart from a bug in its own bookkeeping.
#[derive(Debug, Clone)]
pub struct LlmError {
    pub message: String,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LLM call failed: {}", self.message)
    }
}

impl Error for LlmError {}

impl LlmError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Trait-driven abstraction over a concrete LLM provider.
///
/// Implementations must be thread-safe (`Send + Sync`) so a single client
/// can be shared across concurrently running sessions.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `context` (with an optional leading system prompt) and a set of
    /// callable tools to the model, returning its response.
    async fn call(
        &self,
        context: &[LlmMessage],
        tools: &[ToolDeclaration],
        system_prompt: Option<&str>,
    ) -> Result<LlmResponse, LlmError>;

    /// The identifier used to select the upstream model, recorded on every
    /// [`LlmResponse`] this client produces.
    fn model_name(&self) -> &str;
}
