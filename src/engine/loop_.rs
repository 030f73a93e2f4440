//! The processing loop: read, project, decide, execute, append, repeat.

use std::error::Error;
use std::fmt;

use log::{info, warn};

use crate::events::{SessionCompletedData, REASON_MAX_ITERATIONS_REACHED, SESSION_COMPLETED};
use crate::engine::steps::{execute_llm_step, execute_tool_step, ApprovalInterface};
use crate::llm::LlmClient;
use crate::projections::next_step::{pending_termination_reason, project_to_next_step, NextStep};
use crate::projections::session_state::{project_to_session_state, SessionState};
use crate::store::{EventStore, StoreError};
use crate::tools::ToolRegistry;

/// Read the entire stream each iteration rather than paging; see the
/// module-level note on projection caching as an optional optimisation.
const READ_BATCH_SIZE: i64 = 10_000;

/// Default retry budget for the LLM step.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Tunables for [`process_thread`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_iterations: u32,
    pub auto_approve_tools: bool,
    pub system_prompt: Option<String>,
    pub max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            auto_approve_tools: true,
            system_prompt: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// How [`process_thread`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOutcome {
    /// The next-step projection reached `Done` or `Failed`.
    Completed,
    /// The configured iteration cap was hit; a `SessionCompleted` event
    /// with `completion_reason = "max_iterations_reached"` was appended.
    MaxIterationsExceeded,
}

/// A fatal failure that aborts the processing loop: a store operation that
/// prevents an event from being written. Step failures that are already
/// recorded as events (`LLMCallFailed`, `ToolExecutionFailed`) are not
/// errors here — the next projection decides what to do with them.
#[derive(Debug)]
pub struct EngineError(pub StoreError);

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "processing loop aborted: {}", self.0)
    }
}

impl Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError(err)
    }
}

impl From<crate::engine::steps::LlmStepError> for EngineError {
    fn from(err: crate::engine::steps::LlmStepError) -> Self {
        EngineError(err.0)
    }
}

impl From<crate::engine::steps::ToolStepError> for EngineError {
    fn from(err: crate::engine::steps::ToolStepError) -> Self {
        EngineError(err.0)
    }
}

/// Drive a single thread to completion: read its stream, project the next
/// step, execute it, and repeat until the projection reaches `Done`/`Failed`
/// or the iteration cap is hit.
///
/// Returns the final [`SessionState`] alongside how the loop stopped.
#[allow(clippy::too_many_arguments)]
pub async fn process_thread(
    stream_name: &str,
    store: &dyn EventStore,
    llm: &dyn LlmClient,
    tools: &ToolRegistry,
    approval: &dyn ApprovalInterface,
    config: &EngineConfig,
) -> Result<(EngineOutcome, SessionState), EngineError> {
    let mut iteration = 0u32;

    loop {
        let events = store.read_stream(stream_name, 0, READ_BATCH_SIZE).await?;

        if let Some(reason) = pending_termination_reason(&events) {
            info!("engine: {} observed termination request ({})", stream_name, reason);
            let completed = SessionCompletedData { completion_reason: reason };
            store
                .append(
                    stream_name,
                    SESSION_COMPLETED,
                    serde_json::to_value(completed).expect("SessionCompletedData always serializes"),
                    None,
                    None,
                )
                .await?;
            let events = store.read_stream(stream_name, 0, READ_BATCH_SIZE).await?;
            let state = project_to_session_state(&events);
            return Ok((EngineOutcome::Completed, state));
        }

        let step = project_to_next_step(&events);

        if matches!(step, NextStep::Done | NextStep::Failed) {
            info!("engine: {} reached terminal step {:?}", stream_name, step);
            let state = project_to_session_state(&events);
            return Ok((EngineOutcome::Completed, state));
        }

        if iteration >= config.max_iterations {
            warn!(
                "engine: {} hit iteration cap of {}",
                stream_name, config.max_iterations
            );
            let completed = SessionCompletedData {
                completion_reason: REASON_MAX_ITERATIONS_REACHED.to_string(),
            };
            store
                .append(
                    stream_name,
                    SESSION_COMPLETED,
                    serde_json::to_value(completed).expect("SessionCompletedData always serializes"),
                    None,
                    None,
                )
                .await?;
            let events = store.read_stream(stream_name, 0, READ_BATCH_SIZE).await?;
            let state = project_to_session_state(&events);
            return Ok((EngineOutcome::MaxIterationsExceeded, state));
        }

        match step {
            NextStep::CallLlm => {
                execute_llm_step(
                    &events,
                    llm,
                    tools,
                    stream_name,
                    store,
                    config.system_prompt.as_deref(),
                    config.max_retries,
                )
                .await?;
            }
            NextStep::ExecuteTools => {
                execute_tool_step(
                    &events,
                    tools,
                    stream_name,
                    store,
                    approval,
                    config.auto_approve_tools,
                )
                .await?;
            }
            NextStep::Done | NextStep::Failed => unreachable!("handled above"),
        }

        iteration += 1;
    }
}
