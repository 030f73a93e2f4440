mod support;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventagent::engine::steps::AutoApprove;
use eventagent::engine::{process_thread, EngineConfig, EngineOutcome};
use eventagent::llm::{LlmClient, LlmError, LlmResponse, LlmToolCall, ToolDeclaration};
use eventagent::projections::llm_context::LlmMessage;
use eventagent::projections::session_state::SessionStatus;
use eventagent::store::EventStore;
use eventagent::tools::{Tool, ToolError, ToolRegistry};
use eventagent::{start_session, terminate_session};
use serde_json::{json, Value};
use support::FakeStore;

/// An [`LlmClient`] that returns one scripted response per call, in order.
struct ScriptedLlm {
    responses: Mutex<Vec<Result<LlmResponse, LlmError>>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<Result<LlmResponse, LlmError>>) -> Self {
        // Calls are consumed front-to-back; store reversed so `pop` works.
        let mut responses = responses;
        responses.reverse();
        Self { responses: Mutex::new(responses) }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn call(
        &self,
        _context: &[LlmMessage],
        _tools: &[ToolDeclaration],
        _system_prompt: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(LlmError::new("script exhausted")))
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

fn text_response(text: &str) -> Result<LlmResponse, LlmError> {
    Ok(LlmResponse {
        text: Some(text.to_string()),
        tool_calls: vec![],
        model_name: "scripted-model".to_string(),
        token_usage: None,
    })
}

fn tool_call_response(id: &str, name: &str, arguments: Value) -> Result<LlmResponse, LlmError> {
    Ok(LlmResponse {
        text: None,
        tool_calls: vec![LlmToolCall { id: id.to_string(), name: name.to_string(), arguments }],
        model_name: "scripted-model".to_string(),
        token_usage: None,
    })
}

struct Calculator;

impl Tool for Calculator {
    fn name(&self) -> &str {
        "add"
    }
    fn description(&self) -> &str {
        "Adds two numbers."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}})
    }
    fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let a = arguments["a"].as_f64().ok_or_else(|| ToolError::InvalidParameters("a".into()))?;
        let b = arguments["b"].as_f64().ok_or_else(|| ToolError::InvalidParameters("b".into()))?;
        Ok(json!(a + b))
    }
}

struct AlwaysFails;

impl Tool for AlwaysFails {
    fn name(&self) -> &str {
        "explode"
    }
    fn description(&self) -> &str {
        "Always fails."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
    fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Err(ToolError::ExecutionFailed("boom".into()))
    }
}

#[tokio::test]
async fn text_only_conversation_completes_in_one_iteration() {
    let store = FakeStore::new();
    let thread_id = start_session("What is the capital of France?", &store).await.unwrap();
    let stream_name = format!("agent:v0-{}", thread_id);

    let llm = ScriptedLlm::new(vec![text_response("Paris.")]);
    let tools = ToolRegistry::new();
    let approval = AutoApprove;
    let config = EngineConfig::default();

    let (outcome, state) =
        process_thread(&stream_name, &store, &llm, &tools, &approval, &config).await.unwrap();

    assert_eq!(outcome, EngineOutcome::Completed);
    assert_eq!(state.status, SessionStatus::Terminated);
    assert_eq!(state.llm_call_count, 1);
    assert_eq!(state.tool_call_count, 0);
}

#[tokio::test]
async fn single_tool_call_round_trips_back_through_the_llm() {
    let store = FakeStore::new();
    let thread_id = start_session("add 2 and 3", &store).await.unwrap();
    let stream_name = format!("agent:v0-{}", thread_id);

    let llm = ScriptedLlm::new(vec![
        tool_call_response("call-1", "add", json!({"a": 2, "b": 3})),
        text_response("The sum is 5."),
    ]);
    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(Calculator));
    let approval = AutoApprove;
    let config = EngineConfig::default();

    let (outcome, state) =
        process_thread(&stream_name, &store, &llm, &tools, &approval, &config).await.unwrap();

    assert_eq!(outcome, EngineOutcome::Completed);
    assert_eq!(state.llm_call_count, 2);
    assert_eq!(state.tool_call_count, 1);

    let events = store.read_stream(&stream_name, 0, 100).await.unwrap();
    let completed = events.iter().find(|e| e.event_type == "ToolExecutionCompleted").unwrap();
    assert_eq!(completed.data["result"], json!(5.0));
}

#[tokio::test]
async fn failing_tool_still_lets_the_loop_recover_on_the_next_llm_turn() {
    let store = FakeStore::new();
    let thread_id = start_session("please explode", &store).await.unwrap();
    let stream_name = format!("agent:v0-{}", thread_id);

    let llm = ScriptedLlm::new(vec![
        tool_call_response("call-1", "explode", json!({})),
        text_response("Sorry, that tool failed."),
    ]);
    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(AlwaysFails));
    let approval = AutoApprove;
    let config = EngineConfig::default();

    let (outcome, state) =
        process_thread(&stream_name, &store, &llm, &tools, &approval, &config).await.unwrap();

    assert_eq!(outcome, EngineOutcome::Completed);
    assert_eq!(state.tool_call_count, 1);

    let events = store.read_stream(&stream_name, 0, 100).await.unwrap();
    let failed = events.iter().find(|e| e.event_type == "ToolExecutionFailed").unwrap();
    assert_eq!(failed.data["error_message"], "tool execution failed: boom");
}

#[tokio::test]
async fn llm_failure_is_retried_and_then_recorded_once_exhausted() {
    let store = FakeStore::new();
    let thread_id = start_session("hi", &store).await.unwrap();
    let stream_name = format!("agent:v0-{}", thread_id);

    let llm = ScriptedLlm::new(vec![
        Err(LlmError::new("timeout")),
        Err(LlmError::new("timeout")),
        Err(LlmError::new("timeout")),
    ]);
    let tools = ToolRegistry::new();
    let approval = AutoApprove;
    let config = EngineConfig::default();

    let (outcome, state) =
        process_thread(&stream_name, &store, &llm, &tools, &approval, &config).await.unwrap();

    assert_eq!(outcome, EngineOutcome::Completed);
    assert_eq!(state.status, SessionStatus::Failed);

    let events = store.read_stream(&stream_name, 0, 100).await.unwrap();
    let failure = events.iter().find(|e| e.event_type == "LLMCallFailed").unwrap();
    assert_eq!(failure.data["retry_count"], 2);
}

#[tokio::test]
async fn iteration_cap_terminates_a_runaway_tool_loop() {
    let store = FakeStore::new();
    let thread_id = start_session("loop forever", &store).await.unwrap();
    let stream_name = format!("agent:v0-{}", thread_id);

    // Every LLM turn asks for another tool call, so the loop never reaches
    // a natural Done/Failed step on its own.
    let responses: Vec<_> = (0..20)
        .map(|i| tool_call_response(&format!("call-{}", i), "add", json!({"a": 1, "b": 1})))
        .collect();
    let llm = ScriptedLlm::new(responses);
    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(Calculator));
    let approval = AutoApprove;
    let config = EngineConfig { max_iterations: 3, ..EngineConfig::default() };

    let (outcome, state) =
        process_thread(&stream_name, &store, &llm, &tools, &approval, &config).await.unwrap();

    assert_eq!(outcome, EngineOutcome::MaxIterationsExceeded);
    assert_eq!(state.status, SessionStatus::Terminated);

    let events = store.read_stream(&stream_name, 0, 100).await.unwrap();
    let completed = events.last().unwrap();
    assert_eq!(completed.event_type, "SessionCompleted");
    assert_eq!(completed.data["completion_reason"], "max_iterations_reached");
}

#[tokio::test]
async fn concurrent_append_with_a_stale_expected_version_is_rejected() {
    let store = FakeStore::new();
    let thread_id = start_session("hi", &store).await.unwrap();
    let stream_name = format!("agent:v0-{}", thread_id);

    // Two callers both think the stream is at version 1 (after
    // SessionStarted + UserMessageAdded) and race to append next.
    store
        .append(&stream_name, "LLMResponseReceived", json!({"tool_calls": []}), None, Some(1))
        .await
        .unwrap();

    let err = store
        .append(&stream_name, "LLMResponseReceived", json!({"tool_calls": []}), None, Some(1))
        .await
        .unwrap_err();

    assert!(matches!(err, eventagent::store::StoreError::ConcurrencyConflict { .. }));
}

#[tokio::test]
async fn terminated_session_is_not_picked_back_up_by_the_engine() {
    let store = FakeStore::new();
    let thread_id = start_session("hi", &store).await.unwrap();
    let stream_name = format!("agent:v0-{}", thread_id);

    let llm = ScriptedLlm::new(vec![text_response("done")]);
    let tools = ToolRegistry::new();
    let approval = AutoApprove;
    let config = EngineConfig::default();

    process_thread(&stream_name, &store, &llm, &tools, &approval, &config).await.unwrap();

    terminate_session(&stream_name, "user_request", &store).await.unwrap();
    store
        .append(
            &stream_name,
            "SessionCompleted",
            json!({"completion_reason": "user_terminated"}),
            None,
            None,
        )
        .await
        .unwrap();

    let (outcome, state) =
        process_thread(&stream_name, &store, &llm, &tools, &approval, &config).await.unwrap();

    assert_eq!(outcome, EngineOutcome::Completed);
    assert_eq!(state.status, SessionStatus::Terminated);
}

#[tokio::test]
async fn engine_observes_termination_request_and_appends_session_completed() {
    let store = FakeStore::new();
    let thread_id = start_session("hi", &store).await.unwrap();
    let stream_name = format!("agent:v0-{}", thread_id);

    let llm = ScriptedLlm::new(vec![text_response("done")]);
    let tools = ToolRegistry::new();
    let approval = AutoApprove;
    let config = EngineConfig::default();

    process_thread(&stream_name, &store, &llm, &tools, &approval, &config).await.unwrap();
    terminate_session(&stream_name, "user_request", &store).await.unwrap();

    let (outcome, state) =
        process_thread(&stream_name, &store, &llm, &tools, &approval, &config).await.unwrap();

    assert_eq!(outcome, EngineOutcome::Completed);
    assert_eq!(state.status, SessionStatus::Terminated);

    let events = store.read_stream(&stream_name, 0, 100).await.unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.event_type, "SessionCompleted");
    assert_eq!(last.data["completion_reason"], "user_request");
}
