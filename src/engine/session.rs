//! Session start/terminate: the two operations that bookend a thread's
//! event stream.

use std::error::Error;
use std::fmt;

use chrono::Utc;

use crate::events::{
    SessionStartedData, SessionTerminationRequestedData, UserMessageAddedData, SESSION_STARTED,
    SESSION_TERMINATION_REQUESTED, USER_MESSAGE_ADDED,
};
use crate::store::stream::{build_stream_name, generate_thread_id, DEFAULT_CATEGORY, DEFAULT_VERSION};
use crate::store::{EventStore, StoreError};

/// Raised when starting or terminating a session fails: either the
/// initial message was rejected before any I/O happened, or an append
/// failed partway through.
#[derive(Debug)]
pub struct SessionError(pub StoreError);

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session error: {}", self.0)
    }
}

impl Error for SessionError {}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError(err)
    }
}

/// Start a new session: generate a thread id, compose its stream name, and
/// seed the stream with `SessionStarted` followed by `UserMessageAdded`.
///
/// # Errors
///
/// Returns [`SessionError`] wrapping [`StoreError::InvalidArgument`] if
/// `initial_message` is empty or whitespace-only, or wrapping whatever the
/// backend reports if either append fails. A dangling `SessionStarted`
/// with no follow-up message is tolerated by the rest of the system — the
/// next-step projection treats it like any other inactive session.
pub async fn start_session(
    initial_message: &str,
    store: &dyn EventStore,
) -> Result<String, SessionError> {
    start_session_in(initial_message, store, DEFAULT_CATEGORY, DEFAULT_VERSION).await
}

/// Same as [`start_session`] but with an explicit category/version instead
/// of the `agent:v0` default.
pub async fn start_session_in(
    initial_message: &str,
    store: &dyn EventStore,
    category: &str,
    version: &str,
) -> Result<String, SessionError> {
    if initial_message.trim().is_empty() {
        return Err(SessionError(StoreError::InvalidArgument(
            "initial_message cannot be empty or whitespace-only".into(),
        )));
    }

    let thread_id = generate_thread_id();
    let stream_name = build_stream_name(category, version, &thread_id)?;

    let started = SessionStartedData { thread_id: thread_id.clone() };
    store
        .append(
            &stream_name,
            SESSION_STARTED,
            serde_json::to_value(started).expect("SessionStartedData always serializes"),
            None,
            None,
        )
        .await?;

    let user_message = UserMessageAddedData {
        message: initial_message.to_string(),
        timestamp: Utc::now(),
    };
    store
        .append(
            &stream_name,
            USER_MESSAGE_ADDED,
            serde_json::to_value(user_message).expect("UserMessageAddedData always serializes"),
            None,
            None,
        )
        .await?;

    Ok(thread_id)
}

/// Request termination of `stream_name`. The processing loop observes this
/// on its next projection pass and appends `SessionCompleted` itself; this
/// function only records the request.
pub async fn terminate_session(
    stream_name: &str,
    reason: &str,
    store: &dyn EventStore,
) -> Result<(), SessionError> {
    let request = SessionTerminationRequestedData { reason: reason.to_string() };
    store
        .append(
            stream_name,
            SESSION_TERMINATION_REQUESTED,
            serde_json::to_value(request).expect("SessionTerminationRequestedData always serializes"),
            None,
            None,
        )
        .await?;
    Ok(())
}
