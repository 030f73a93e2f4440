//! Pure, deterministic fold functions over event histories.
//!
//! A projection is a function `&[Event] -> T`. Every projection in this
//! module is side-effect free: no I/O, no randomness, no mutable external
//! state. Each handles empty input by returning an identity value and
//! ignores event types it does not recognise, so new event types can be
//! introduced without breaking existing projections.

pub mod llm_context;
pub mod next_step;
pub mod session_state;
pub mod tool_args;

pub use llm_context::{project_to_llm_context, LlmMessage, LlmRole};
pub use next_step::{pending_termination_reason, project_to_next_step, should_terminate, NextStep};
pub use session_state::{project_to_session_state, SessionState, SessionStatus};
pub use tool_args::{project_to_tool_arguments, PendingToolCall};

use crate::store::event::Event;

/// The result of running a projection, annotated with how much of the
/// stream it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult<T> {
    pub value: T,
    pub event_count: usize,
    pub last_position: Option<i64>,
}

/// Run `f` over `events` and wrap the result with processed-event metadata.
pub fn project_with_metadata<T>(
    events: &[Event],
    f: impl FnOnce(&[Event]) -> T,
) -> ProjectionResult<T> {
    let value = f(events);
    ProjectionResult {
        value,
        event_count: events.len(),
        last_position: events.last().map(|e| e.position),
    }
}

/// Evaluate a slice of projections against the same event list in a single
/// pass over the argument (each projection still folds independently, but
/// callers get one call site instead of N).
pub fn compose_projections<T>(
    events: &[Event],
    projections: &[Box<dyn Fn(&[Event]) -> T>],
) -> Vec<T> {
    projections.iter().map(|f| f(events)).collect()
}
