//! The tool step: execute each pending tool call in order, recording a
//! requested/completed/failed event for every one.

use std::error::Error;
use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;

use crate::events::{
    ToolEventMetadata, ToolExecutionCompletedData, ToolExecutionFailedData,
    ToolExecutionRequestedData, TOOL_EXECUTION_COMPLETED, TOOL_EXECUTION_FAILED,
    TOOL_EXECUTION_REQUESTED,
};
use crate::projections::tool_args::{project_to_tool_arguments, PendingToolCall};
use crate::store::event::Event;
use crate::store::{EventStore, StoreError};
use crate::tools::ToolRegistry;

/// Raised when the tool step cannot record an outcome as an event.
#[derive(Debug)]
pub struct ToolStepError(pub StoreError);

impl fmt::Display for ToolStepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tool step failed to record its outcome: {}", self.0)
    }
}

impl Error for ToolStepError {}

/// The external gate a tool call must pass before it runs when the engine
/// is configured with `auto_approve_tools = false`.
#[async_trait]
pub trait ApprovalInterface: Send + Sync {
    /// Decide whether `tool_name` may run with `arguments`.
    async fn approve(&self, tool_name: &str, arguments: &Value) -> bool;
}

/// An [`ApprovalInterface`] that approves every call, used when
/// `auto_approve_tools = true`.
pub struct AutoApprove;

#[async_trait]
impl ApprovalInterface for AutoApprove {
    async fn approve(&self, _tool_name: &str, _arguments: &Value) -> bool {
        true
    }
}

/// Execute one tool step: run every pending tool call from the last LLM
/// response, in order, recording its outcome.
///
/// Returns `Ok(true)` if every call succeeded (or there were none to run),
/// `Ok(false)` if any failed. An append failure is `Err(ToolStepError)`.
pub async fn execute_tool_step(
    events: &[Event],
    tool_registry: &ToolRegistry,
    stream_name: &str,
    store: &dyn EventStore,
    approval: &dyn ApprovalInterface,
    auto_approve_tools: bool,
) -> Result<bool, ToolStepError> {
    let tool_calls = project_to_tool_arguments(events);
    debug!("tool step: {} pending calls for {}", tool_calls.len(), stream_name);

    if tool_calls.is_empty() {
        warn!("tool step: no pending tool calls for {}", stream_name);
        return Ok(true);
    }

    let mut all_successful = true;

    for (index, call) in tool_calls.iter().enumerate() {
        let PendingToolCall { id, name, arguments } = call;
        let metadata = ToolEventMetadata { tool_id: id.clone(), tool_index: index };
        let metadata_value =
            serde_json::to_value(&metadata).expect("ToolEventMetadata always serializes");

        let requested = ToolExecutionRequestedData {
            tool_name: name.clone(),
            arguments: arguments.clone(),
        };
        store
            .append(
                stream_name,
                TOOL_EXECUTION_REQUESTED,
                serde_json::to_value(requested)
                    .expect("ToolExecutionRequestedData always serializes"),
                Some(metadata_value.clone()),
                None,
            )
            .await
            .map_err(ToolStepError)?;

        if !auto_approve_tools && !approval.approve(name, arguments).await {
            info!("tool step: {} rejected by approval interface", name);
            all_successful = false;
            let failed = ToolExecutionFailedData {
                tool_name: name.clone(),
                error_message: "rejected_by_user".to_string(),
                retry_count: 0,
            };
            store
                .append(
                    stream_name,
                    TOOL_EXECUTION_FAILED,
                    serde_json::to_value(failed).expect("ToolExecutionFailedData always serializes"),
                    Some(metadata_value),
                    None,
                )
                .await
                .map_err(ToolStepError)?;
            continue;
        }

        let Some(tool) = tool_registry.get(name) else {
            warn!("tool step: {} not found in registry", name);
            all_successful = false;
            let failed = ToolExecutionFailedData {
                tool_name: name.clone(),
                error_message: "tool_not_found".to_string(),
                retry_count: 0,
            };
            store
                .append(
                    stream_name,
                    TOOL_EXECUTION_FAILED,
                    serde_json::to_value(failed).expect("ToolExecutionFailedData always serializes"),
                    Some(metadata_value),
                    None,
                )
                .await
                .map_err(ToolStepError)?;
            continue;
        };

        let start = Instant::now();
        let outcome = tool.execute(arguments.clone());
        let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(result) => {
                info!("tool step: {} succeeded in {:.2}ms", name, execution_time_ms);
                let completed = ToolExecutionCompletedData {
                    tool_name: name.clone(),
                    result,
                    execution_time_ms,
                };
                store
                    .append(
                        stream_name,
                        TOOL_EXECUTION_COMPLETED,
                        serde_json::to_value(completed)
                            .expect("ToolExecutionCompletedData always serializes"),
                        Some(metadata_value),
                        None,
                    )
                    .await
                    .map_err(ToolStepError)?;
            }
            Err(tool_error) => {
                warn!("tool step: {} failed: {}", name, tool_error);
                all_successful = false;
                // No retries in the basic tool step; richer retry policies
                // are left to future work.
                let failed = ToolExecutionFailedData {
                    tool_name: name.clone(),
                    error_message: tool_error.to_string(),
                    retry_count: 0,
                };
                store
                    .append(
                        stream_name,
                        TOOL_EXECUTION_FAILED,
                        serde_json::to_value(failed)
                            .expect("ToolExecutionFailedData always serializes"),
                        Some(metadata_value),
                        None,
                    )
                    .await
                    .map_err(ToolStepError)?;
            }
        }
    }

    Ok(all_successful)
}
