//! Projects an event stream into the next step the processing loop should
//! take.

use serde_json::Value;

use crate::events::{
    LLM_CALL_FAILED, LLM_RESPONSE_RECEIVED, SESSION_COMPLETED, SESSION_STARTED,
    SESSION_TERMINATION_REQUESTED, TOOL_EXECUTION_COMPLETED, TOOL_EXECUTION_FAILED,
    TOOL_EXECUTION_REQUESTED, USER_MESSAGE_ADDED,
};
use crate::projections::tool_args::{project_to_tool_arguments, PendingToolCall};
use crate::store::event::Event;

/// The number of LLM retries attempted before a failure is considered
/// exhausted. Matches the engine's `max_retries` default.
pub const MAX_RETRIES: u32 = 2;

/// The decision driving the processing loop's next action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    CallLlm,
    ExecuteTools,
    Done,
    Failed,
}

/// Decide the next step from an event history.
///
/// Evaluated as seven ordered rules (first match wins):
/// 1. Any `SessionCompleted` anywhere in the stream → `Done`.
/// 2. Tail is an exhausted `LLMCallFailed` → `Failed`.
/// 3. Tail is an `LLMResponseReceived` with pending tool calls → `ExecuteTools`.
/// 4. Tail is an `LLMResponseReceived` with no tool calls → `Done`.
/// 5. Tail is a tool result that resolves every pending call from the last
///    LLM response → `CallLlm`.
/// 6. Tail is `UserMessageAdded` or `SessionStarted` → `CallLlm`.
/// 7. Otherwise (defensive) → `Done`.
pub fn project_to_next_step(events: &[Event]) -> NextStep {
    if events.iter().any(|e| e.event_type == SESSION_COMPLETED) {
        return NextStep::Done;
    }

    let Some(tail) = events.last() else {
        return NextStep::Done;
    };

    if tail.event_type == LLM_CALL_FAILED {
        let retry_count = tail
            .data
            .get("retry_count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        if retry_count >= MAX_RETRIES {
            return NextStep::Failed;
        }
        // LLMCallFailed is only ever appended once retries are exhausted;
        // a lower retry_count here is unexpected input, treat it the same.
        return NextStep::Failed;
    }

    if tail.event_type == LLM_RESPONSE_RECEIVED {
        let has_tool_calls = tail
            .data
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| !calls.is_empty())
            .unwrap_or(false);
        return if has_tool_calls {
            NextStep::ExecuteTools
        } else {
            NextStep::Done
        };
    }

    if tail.event_type == TOOL_EXECUTION_COMPLETED || tail.event_type == TOOL_EXECUTION_FAILED {
        if all_tool_calls_resolved(events) {
            return NextStep::CallLlm;
        }
        return NextStep::Done;
    }

    if tail.event_type == USER_MESSAGE_ADDED || tail.event_type == SESSION_STARTED {
        return NextStep::CallLlm;
    }

    NextStep::Done
}

/// Whether every tool call from the most recent LLM response has a
/// matching `ToolExecutionCompleted`/`ToolExecutionFailed` event after it.
fn all_tool_calls_resolved(events: &[Event]) -> bool {
    let Some((llm_index, llm_event)) = events
        .iter()
        .enumerate()
        .rev()
        .find(|(_, e)| e.event_type == LLM_RESPONSE_RECEIVED)
    else {
        return false;
    };

    let expected = llm_event
        .data
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| calls.len())
        .unwrap_or(0);

    if expected == 0 {
        return false;
    }

    let resolved = events[llm_index + 1..]
        .iter()
        .filter(|e| e.event_type == TOOL_EXECUTION_COMPLETED || e.event_type == TOOL_EXECUTION_FAILED)
        .count();

    resolved >= expected
}

/// Whether `next_step` would stop the processing loop.
pub fn should_terminate(events: &[Event]) -> bool {
    matches!(project_to_next_step(events), NextStep::Done | NextStep::Failed)
}

/// The reason from a tail `SessionTerminationRequested` event awaiting a
/// matching `SessionCompleted`, if any.
///
/// A `SessionCompleted` event anywhere in the stream already short-circuits
/// [`project_to_next_step`] to `Done` (rule 1), so a termination request is
/// only ever "pending" while it is the last event in the stream. The
/// processing loop consults this ahead of `project_to_next_step` so it can
/// append the completion event the request asked for.
pub fn pending_termination_reason(events: &[Event]) -> Option<String> {
    let tail = events.last()?;
    if tail.event_type != SESSION_TERMINATION_REQUESTED {
        return None;
    }
    tail.data
        .get("reason")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

/// The pending tool calls from the most recent LLM response. Alias over
/// [`project_to_tool_arguments`] kept for parity with the step-decision API.
pub fn get_pending_tool_calls(events: &[Event]) -> Vec<PendingToolCall> {
    project_to_tool_arguments(events)
}

/// Count the processing steps taken so far: each `LLMResponseReceived` or
/// `LLMCallFailed` is one `CallLlm` step; each batch of tool executions
/// (identified by a `ToolExecutionRequested` at `tool_index = 0`) is one
/// `ExecuteTools` step.
pub fn count_steps_taken(events: &[Event]) -> usize {
    let llm_steps = events
        .iter()
        .filter(|e| e.event_type == LLM_RESPONSE_RECEIVED || e.event_type == LLM_CALL_FAILED)
        .count();
    let tool_steps = events
        .iter()
        .filter(|e| {
            e.event_type == TOOL_EXECUTION_REQUESTED
                && e.metadata
                    .as_ref()
                    .and_then(|m| m.get("tool_index"))
                    .and_then(Value::as_u64)
                    == Some(0)
        })
        .count();
    llm_steps + tool_steps
}
