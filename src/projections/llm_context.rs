//! Projects an event stream into the role-tagged message list an LLM call
//! needs for context.

use serde_json::Value;

use crate::events::{
    LLM_RESPONSE_RECEIVED, TOOL_EXECUTION_COMPLETED, TOOL_EXECUTION_FAILED, USER_MESSAGE_ADDED,
};
use crate::store::event::Event;

/// The speaker a message in LLM context is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    User,
    Assistant,
    Tool,
}

/// One turn of conversation context, built from a single source event.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub text: Option<String>,
    pub tool_name: Option<String>,
    pub tool_result: Option<Value>,
}

impl LlmMessage {
    fn user(text: String) -> Self {
        Self {
            role: LlmRole::User,
            text: Some(text),
            tool_name: None,
            tool_result: None,
        }
    }

    fn assistant(text: String) -> Self {
        Self {
            role: LlmRole::Assistant,
            text: Some(text),
            tool_name: None,
            tool_result: None,
        }
    }

    fn tool_completed(tool_name: String, result: Value) -> Self {
        Self {
            role: LlmRole::Tool,
            text: None,
            tool_name: Some(tool_name),
            tool_result: Some(result),
        }
    }

    fn tool_failed(tool_name: String, error: String) -> Self {
        Self {
            role: LlmRole::Tool,
            text: Some(error),
            tool_name: Some(tool_name),
            tool_result: None,
        }
    }
}

/// Fold an event stream into an ordered sequence of LLM-ready messages.
///
/// `UserMessageAdded` becomes a user turn, non-empty `LLMResponseReceived`
/// text becomes an assistant turn, and completed/failed tool executions
/// become tool turns. Every other event type is skipped. Empty input
/// yields an empty context.
pub fn project_to_llm_context(events: &[Event]) -> Vec<LlmMessage> {
    let mut context = Vec::new();
    for event in events {
        match event.event_type.as_str() {
            USER_MESSAGE_ADDED => {
                if let Some(message) = event.data.get("message").and_then(Value::as_str) {
                    context.push(LlmMessage::user(message.to_string()));
                }
            }
            LLM_RESPONSE_RECEIVED => {
                if let Some(text) = event.data.get("response_text").and_then(Value::as_str) {
                    if !text.is_empty() {
                        context.push(LlmMessage::assistant(text.to_string()));
                    }
                }
            }
            TOOL_EXECUTION_COMPLETED => {
                let tool_name = event
                    .data
                    .get("tool_name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let result = event.data.get("result").cloned().unwrap_or(Value::Null);
                context.push(LlmMessage::tool_completed(tool_name, result));
            }
            TOOL_EXECUTION_FAILED => {
                let tool_name = event
                    .data
                    .get("tool_name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let error = event
                    .data
                    .get("error_message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                context.push(LlmMessage::tool_failed(tool_name, error));
            }
            _ => {}
        }
    }
    context
}

/// The most recent `UserMessageAdded` text, if any.
pub fn get_last_user_message(events: &[Event]) -> Option<String> {
    events
        .iter()
        .rev()
        .find(|e| e.event_type == USER_MESSAGE_ADDED)
        .and_then(|e| e.data.get("message").and_then(Value::as_str))
        .map(|s| s.to_string())
}

/// The number of `UserMessageAdded` events in the stream.
pub fn count_conversation_turns(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| e.event_type == USER_MESSAGE_ADDED)
        .count()
}
