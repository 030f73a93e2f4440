//! Folds an event stream into the derived session state.

use chrono::{DateTime, Duration, Utc};

use crate::events::{
    LLM_CALL_FAILED, LLM_RESPONSE_RECEIVED, SESSION_COMPLETED, SESSION_STARTED,
    TOOL_EXECUTION_COMPLETED, TOOL_EXECUTION_FAILED, USER_MESSAGE_ADDED,
};
use crate::projections::next_step::{project_to_next_step, NextStep};
use crate::store::event::Event;

/// The lifecycle state of a session, derived from its event history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    Active,
    Terminated,
    Failed,
}

/// A point-in-time summary of a session, entirely derived from its events.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub user_message_count: usize,
    pub llm_call_count: usize,
    pub tool_call_count: usize,
}

impl SessionState {
    fn not_started() -> Self {
        Self {
            status: SessionStatus::NotStarted,
            start_time: None,
            end_time: None,
            user_message_count: 0,
            llm_call_count: 0,
            tool_call_count: 0,
        }
    }
}

/// Fold an event stream into its [`SessionState`].
///
/// A session without a `SessionStarted` event is `NotStarted`. Otherwise its
/// status tracks the next-step projection's own terminal/non-terminal split:
/// `Terminated` once the next step is `Done` (whether via an explicit
/// `SessionCompleted` event or a natural text-only reply that ends the
/// conversation), `Failed` once it reaches an exhausted LLM failure, and
/// `Active` while the loop still has a `CallLlm`/`ExecuteTools` step ahead
/// of it.
pub fn project_to_session_state(events: &[Event]) -> SessionState {
    let Some(started) = events.iter().find(|e| e.event_type == SESSION_STARTED) else {
        return SessionState::not_started();
    };

    let completed = events.iter().rev().find(|e| e.event_type == SESSION_COMPLETED);

    let status = match project_to_next_step(events) {
        NextStep::Done => SessionStatus::Terminated,
        NextStep::Failed => SessionStatus::Failed,
        NextStep::CallLlm | NextStep::ExecuteTools => SessionStatus::Active,
    };

    SessionState {
        status,
        start_time: Some(started.time),
        end_time: completed.map(|e| e.time),
        user_message_count: events.iter().filter(|e| e.event_type == USER_MESSAGE_ADDED).count(),
        llm_call_count: events
            .iter()
            .filter(|e| e.event_type == LLM_RESPONSE_RECEIVED || e.event_type == LLM_CALL_FAILED)
            .count(),
        tool_call_count: events
            .iter()
            .filter(|e| e.event_type == TOOL_EXECUTION_COMPLETED || e.event_type == TOOL_EXECUTION_FAILED)
            .count(),
    }
}

/// Whether a session is currently active (started, not yet terminated or
/// failed).
pub fn is_session_active(events: &[Event]) -> bool {
    project_to_session_state(events).status == SessionStatus::Active
}

/// The wall-clock duration between session start and end, if the session
/// has ended. Returns `None` for an active or not-started session, since
/// projections cannot consult the current time.
pub fn get_session_duration(events: &[Event]) -> Option<Duration> {
    let state = project_to_session_state(events);
    match (state.start_time, state.end_time) {
        (Some(start), Some(end)) => Some(end - start),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn make_event(event_type: &str, data: serde_json::Value, time: DateTime<Utc>, position: i64) -> Event {
        Event {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            data,
            metadata: None,
            position,
            global_position: position,
            time,
            stream_name: "agent:v0-thread".to_string(),
        }
    }

    #[test]
    fn empty_stream_is_not_started() {
        let state = project_to_session_state(&[]);
        assert_eq!(state.status, SessionStatus::NotStarted);
        assert_eq!(state.start_time, None);
    }

    #[test]
    fn dangling_session_started_is_active_not_terminated() {
        let t0 = Utc::now();
        let events = vec![make_event(SESSION_STARTED, json!({"thread_id": "abc"}), t0, 0)];
        let state = project_to_session_state(&events);
        assert_eq!(state.status, SessionStatus::Active);
        assert_eq!(state.start_time, Some(t0));
    }

    #[test]
    fn completed_session_is_terminated_with_counts() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(5);
        let events = vec![
            make_event(SESSION_STARTED, json!({"thread_id": "abc"}), t0, 0),
            make_event(USER_MESSAGE_ADDED, json!({"message": "hi"}), t0, 1),
            make_event(
                LLM_RESPONSE_RECEIVED,
                json!({"response_text": "Hi there", "tool_calls": []}),
                t0,
                2,
            ),
            make_event(SESSION_COMPLETED, json!({"completion_reason": "done"}), t1, 3),
        ];
        let state = project_to_session_state(&events);
        assert_eq!(state.status, SessionStatus::Terminated);
        assert_eq!(state.user_message_count, 1);
        assert_eq!(state.llm_call_count, 1);
        assert_eq!(state.tool_call_count, 0);
        assert_eq!(get_session_duration(&events), Some(Duration::seconds(5)));
    }

    #[test]
    fn exhausted_llm_failure_is_failed_without_session_completed() {
        let t0 = Utc::now();
        let events = vec![
            make_event(SESSION_STARTED, json!({"thread_id": "abc"}), t0, 0),
            make_event(USER_MESSAGE_ADDED, json!({"message": "hi"}), t0, 1),
            make_event(
                LLM_CALL_FAILED,
                json!({"error_message": "timeout", "retry_count": 2}),
                t0,
                2,
            ),
        ];
        let state = project_to_session_state(&events);
        assert_eq!(state.status, SessionStatus::Failed);
        assert_eq!(state.end_time, None);
        assert!(!is_session_active(&events));
    }

    #[test]
    fn active_session_has_no_duration() {
        let t0 = Utc::now();
        let events = vec![
            make_event(SESSION_STARTED, json!({"thread_id": "abc"}), t0, 0),
            make_event(USER_MESSAGE_ADDED, json!({"message": "hi"}), t0, 1),
        ];
        assert!(is_session_active(&events));
        assert_eq!(get_session_duration(&events), None);
    }
}
