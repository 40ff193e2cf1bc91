//! Agent turns that call the memory tools through the session runner.

use async_trait::async_trait;
use memory_agent::agent::{chat_loop, Agent, InMemorySessionService, LineReader, Runner};
use memory_agent::config::{AgentConfig, WriteMode};
use memory_agent::memory::{DocumentMemory, Memory};
use memory_agent::observability::NoopObserver;
use memory_agent::providers::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall};
use memory_agent::store::InMemoryStore;
use memory_agent::tools;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

/// Plays back a fixed list of model replies and keeps every tool payload it
/// was handed.
struct ScriptedModel {
    replies: Mutex<VecDeque<ChatResponse>>,
    tool_payloads: Arc<Mutex<Vec<Value>>>,
}

#[async_trait]
impl Provider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        if let Some(ChatMessage::ToolResults(outputs)) = request.messages.last() {
            self.tool_payloads
                .lock()
                .extend(outputs.iter().map(|o| o.payload.clone()));
        }
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
}

fn calls(name: &str, arguments: Value) -> ChatResponse {
    ChatResponse {
        text: None,
        tool_calls: vec![ToolCall {
            name: name.into(),
            arguments,
            signature: Some("sig".into()),
        }],
        tokens_used: None,
    }
}

fn says(text: &str) -> ChatResponse {
    ChatResponse {
        text: Some(text.into()),
        ..ChatResponse::default()
    }
}

struct Harness {
    runner: Runner,
    memory: Arc<dyn Memory>,
    tool_payloads: Arc<Mutex<Vec<Value>>>,
}

fn harness(script: Vec<ChatResponse>) -> Harness {
    let config = AgentConfig::default();
    let memory: Arc<dyn Memory> = Arc::new(DocumentMemory::new(
        Arc::new(InMemoryStore::new()),
        WriteMode::ReadModifyWrite,
    ));
    let tool_payloads = Arc::new(Mutex::new(Vec::new()));
    let model = ScriptedModel {
        replies: Mutex::new(script.into()),
        tool_payloads: tool_payloads.clone(),
    };
    let agent = Agent::new(
        &config,
        Box::new(model),
        tools::all_tools(memory.clone(), &config),
        Arc::new(NoopObserver),
    );
    let sessions = Arc::new(InMemorySessionService::new());
    sessions
        .create_session(&config.app_name, &config.user_id, &config.session_id)
        .unwrap();
    Harness {
        runner: Runner::new(&config.app_name, agent, sessions),
        memory,
        tool_payloads,
    }
}

#[tokio::test]
async fn save_then_retrieve_across_turns() {
    let h = harness(vec![
        calls(
            "save_memory",
            json!({ "category": "prefs", "data": "dark mode" }),
        ),
        says("Noted, you like dark mode."),
        calls("retrieve_memory", json!({ "category": "prefs" })),
        says("You like dark mode."),
    ]);

    let first = h
        .runner
        .run("user_001", "session_001", "I prefer dark mode")
        .await
        .unwrap();
    assert_eq!(first, "Noted, you like dark mode.");

    let second = h
        .runner
        .run("user_001", "session_001", "What do I prefer?")
        .await
        .unwrap();
    assert_eq!(second, "You like dark mode.");

    let payloads = h.tool_payloads.lock().clone();
    assert_eq!(payloads[0]["status"], "success");
    assert_eq!(payloads[0]["saved_data"], "dark mode");
    assert_eq!(
        payloads[1],
        json!({ "status": "success", "data": ["dark mode"], "category": "prefs", "count": 1 })
    );

    let stored = h.memory.retrieve("user_001", "prefs").await.unwrap();
    assert_eq!(stored.entries, ["dark mode"]);
}

#[tokio::test]
async fn retrieve_of_empty_category_reaches_model_as_not_found() {
    let h = harness(vec![
        calls("retrieve_memory", json!({ "category": "facts" })),
        says("I don't know any facts about you yet."),
    ]);

    h.runner
        .run("user_001", "session_001", "What facts do you know?")
        .await
        .unwrap();

    let payloads = h.tool_payloads.lock().clone();
    assert_eq!(payloads[0]["status"], "not_found");
    assert_eq!(payloads[0]["data"], json!([]));
}

#[tokio::test]
async fn invalid_save_is_reported_to_model() {
    let h = harness(vec![
        calls("save_memory", json!({ "category": "   ", "data": "x" })),
        says("I couldn't save that."),
    ]);

    let reply = h
        .runner
        .run("user_001", "session_001", "remember x")
        .await
        .unwrap();
    assert_eq!(reply, "I couldn't save that.");

    let payloads = h.tool_payloads.lock().clone();
    assert_eq!(payloads[0]["status"], "error");
}

struct Lines(VecDeque<&'static str>);

impl LineReader for Lines {
    fn read_line(&mut self, _prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(self.0.pop_front().map(ToString::to_string))
    }
}

#[tokio::test]
async fn interactive_session_until_quit() {
    let h = harness(vec![
        calls(
            "save_memory",
            json!({ "category": "prefs", "data": "daily summaries" }),
        ),
        says("Saved."),
    ]);
    let mut reader = Lines(VecDeque::from(["I want daily summaries", "quit"]));
    let mut out = Vec::new();

    chat_loop(&h.runner, "user_001", "session_001", &mut reader, &mut out)
        .await
        .unwrap();

    let transcript = String::from_utf8(out).unwrap();
    assert!(transcript.contains("<<< Assistant: Saved."));
    assert!(transcript.contains("Goodbye!"));
    let stored = h.memory.retrieve("user_001", "prefs").await.unwrap();
    assert_eq!(stored.entries, ["daily summaries"]);
}
