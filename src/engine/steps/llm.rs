//! The LLM step: one call out to the model, recorded as an event.

use std::error::Error;
use std::fmt;

use log::{debug, error, info, warn};
use serde_json::json;

use crate::events::{
    LlmCallFailedData, LlmResponseReceivedData, RetryMetadata, ToolCall, LLM_CALL_FAILED,
    LLM_RESPONSE_RECEIVED,
};
use crate::llm::{LlmClient, LlmToolCall};
use crate::projections::llm_context::project_to_llm_context;
use crate::store::event::Event;
use crate::store::{EventStore, StoreError};
use crate::tools::ToolRegistry;

/// Raised when the LLM step cannot record its outcome as an event.
///
/// A failed LLM *call* is not an error here — it is recorded as an
/// `LLMCallFailed` event and reported via the `Ok(false)` return. This
/// type only covers failures to write to the store itself.
#[derive(Debug)]
pub struct LlmStepError(pub StoreError);

impl fmt::Display for LlmStepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LLM step failed to record its outcome: {}", self.0)
    }
}

impl Error for LlmStepError {}

/// Execute one LLM step: project context, call the model, and record the
/// outcome.
///
/// Retries the call up to `max_retries` times on a model-layer error with
/// no backoff. On success, appends `LLMResponseReceived` and returns
/// `Ok(true)`. On exhaustion, appends `LLMCallFailed` and returns
/// `Ok(false)`. Either append failing is `Err(LlmStepError)`.
pub async fn execute_llm_step(
    events: &[Event],
    llm_client: &dyn LlmClient,
    tool_registry: &ToolRegistry,
    stream_name: &str,
    store: &dyn EventStore,
    system_prompt: Option<&str>,
    max_retries: u32,
) -> Result<bool, LlmStepError> {
    let context = project_to_llm_context(events);
    debug!(
        "llm step: projected {} context messages for {}",
        context.len(),
        stream_name
    );

    let declarations = tool_registry.declarations();

    let mut retry_count = 0u32;
    loop {
        match llm_client.call(&context, &declarations, system_prompt).await {
            Ok(response) => {
                info!(
                    "llm step: call succeeded on attempt {} for {}",
                    retry_count, stream_name
                );
                let tool_calls: Vec<ToolCall> = response
                    .tool_calls
                    .iter()
                    .map(|tc: &LlmToolCall| ToolCall {
                        id: tc.id.clone(),
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    })
                    .collect();
                let data = LlmResponseReceivedData {
                    response_text: Some(response.text.unwrap_or_default()),
                    tool_calls,
                    model_name: response.model_name,
                    token_usage: response.token_usage,
                };
                let metadata = RetryMetadata { retry_count };

                store
                    .append(
                        stream_name,
                        LLM_RESPONSE_RECEIVED,
                        serde_json::to_value(data).expect("LlmResponseReceivedData always serializes"),
                        Some(
                            serde_json::to_value(metadata).expect("RetryMetadata always serializes"),
                        ),
                        None,
                    )
                    .await
                    .map_err(LlmStepError)?;
                return Ok(true);
            }
            Err(call_error) => {
                warn!(
                    "llm step: call failed on attempt {} for {}: {}",
                    retry_count, stream_name, call_error
                );
                retry_count += 1;
                if retry_count > max_retries {
                    error!(
                        "llm step: exhausted {} retries for {}",
                        max_retries, stream_name
                    );
                    let data = LlmCallFailedData {
                        error_message: call_error.message,
                        retry_count: retry_count - 1,
                    };
                    let metadata = json!({"error_type": "LlmError"});
                    store
                        .append(
                            stream_name,
                            LLM_CALL_FAILED,
                            serde_json::to_value(data).expect("LlmCallFailedData always serializes"),
                            Some(metadata),
                            None,
                        )
                        .await
                        .map_err(LlmStepError)?;
                    return Ok(false);
                }
            }
        }
    }
}
