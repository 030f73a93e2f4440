//! Projects the pending tool calls out of the most recent LLM response.

use serde_json::Value;

use crate::events::LLM_RESPONSE_RECEIVED;
use crate::store::event::Event;

/// One tool call awaiting execution, taken from the latest
/// `LLMResponseReceived` event.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Return the tool calls attached to the most recent `LLMResponseReceived`
/// event, scanning from the tail. Returns an empty list if no such event
/// exists, or if it carried no tool calls.
pub fn project_to_tool_arguments(events: &[Event]) -> Vec<PendingToolCall> {
    let latest = events
        .iter()
        .rev()
        .find(|e| e.event_type == LLM_RESPONSE_RECEIVED);

    let Some(event) = latest else {
        return Vec::new();
    };

    let Some(tool_calls) = event.data.get("tool_calls").and_then(Value::as_array) else {
        return Vec::new();
    };

    tool_calls
        .iter()
        .filter_map(|call| {
            let id = call.get("id")?.as_str()?.to_string();
            let name = call.get("name")?.as_str()?.to_string();
            let arguments = call.get("arguments").cloned().unwrap_or(Value::Null);
            Some(PendingToolCall { id, name, arguments })
        })
        .collect()
}

/// Find a pending tool call by name, if present.
pub fn get_tool_call_by_name(events: &[Event], name: &str) -> Option<PendingToolCall> {
    project_to_tool_arguments(events)
        .into_iter()
        .find(|call| call.name == name)
}

/// The distinct tool names the most recent LLM response asked for.
pub fn get_all_tool_names(events: &[Event]) -> Vec<String> {
    project_to_tool_arguments(events)
        .into_iter()
        .map(|call| call.name)
        .collect()
}

/// Whether the most recent LLM response has any pending tool calls.
pub fn has_pending_tool_calls(events: &[Event]) -> bool {
    !project_to_tool_arguments(events).is_empty()
}

/// The number of pending tool calls in the most recent LLM response.
pub fn count_tool_calls(events: &[Event]) -> usize {
    project_to_tool_arguments(events).len()
}
