//! Typed payloads for every event type the core appends.
//!
//! These mirror the `data` shapes in the event JSON table: constructing one
//! of these structs and serializing it with `serde_json::to_value` gives
//! the exact payload [`crate::store::EventStore::append`] expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `SessionStarted` — the first event in every stream.
pub const SESSION_STARTED: &str = "SessionStarted";
/// `UserMessageAdded`.
pub const USER_MESSAGE_ADDED: &str = "UserMessageAdded";
/// `LLMResponseReceived`.
pub const LLM_RESPONSE_RECEIVED: &str = "LLMResponseReceived";
/// `LLMCallFailed`.
pub const LLM_CALL_FAILED: &str = "LLMCallFailed";
/// `ToolExecutionRequested`.
pub const TOOL_EXECUTION_REQUESTED: &str = "ToolExecutionRequested";
/// `ToolExecutionCompleted`.
pub const TOOL_EXECUTION_COMPLETED: &str = "ToolExecutionCompleted";
/// `ToolExecutionFailed`.
pub const TOOL_EXECUTION_FAILED: &str = "ToolExecutionFailed";
/// `SessionTerminationRequested`.
pub const SESSION_TERMINATION_REQUESTED: &str = "SessionTerminationRequested";
/// `SessionCompleted`.
pub const SESSION_COMPLETED: &str = "SessionCompleted";
/// `PositionRecorded`, appended by the message-store-backed position store.
pub const POSITION_RECORDED: &str = "PositionRecorded";

/// Payload for [`SESSION_STARTED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStartedData {
    pub thread_id: String,
}

/// Payload for [`USER_MESSAGE_ADDED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMessageAddedData {
    pub message: String,
    /// ISO-8601 timestamp of when the message was submitted.
    pub timestamp: DateTime<Utc>,
}

/// One tool invocation requested by the model in a single LLM turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Token accounting reported by the LLM client, when available.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Payload for [`LLM_RESPONSE_RECEIVED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmResponseReceivedData {
    pub response_text: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub model_name: String,
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
}

/// Payload for [`LLM_CALL_FAILED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmCallFailedData {
    pub error_message: String,
    pub retry_count: u32,
}

/// Payload for [`TOOL_EXECUTION_REQUESTED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolExecutionRequestedData {
    pub tool_name: String,
    pub arguments: Value,
}

/// Payload for [`TOOL_EXECUTION_COMPLETED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolExecutionCompletedData {
    pub tool_name: String,
    pub result: Value,
    pub execution_time_ms: f64,
}

/// Payload for [`TOOL_EXECUTION_FAILED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolExecutionFailedData {
    pub tool_name: String,
    pub error_message: String,
    pub retry_count: u32,
}

/// Payload for [`SESSION_TERMINATION_REQUESTED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionTerminationRequestedData {
    #[serde(default = "default_termination_reason")]
    pub reason: String,
}

fn default_termination_reason() -> String {
    "user_request".to_string()
}

/// Payload for [`SESSION_COMPLETED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionCompletedData {
    pub completion_reason: String,
}

/// Reason string used when the engine's iteration cap is reached.
pub const REASON_MAX_ITERATIONS_REACHED: &str = "max_iterations_reached";

/// Metadata attached to tool-step events for correlation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolEventMetadata {
    pub tool_id: String,
    pub tool_index: usize,
}

/// Metadata attached to LLM-step events recording the retry attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RetryMetadata {
    pub retry_count: u32,
}

/// Payload for [`POSITION_RECORDED`], appended by
/// [`crate::subscriber::position::MessageStorePositionStore`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionRecordedData {
    pub position: i64,
}
