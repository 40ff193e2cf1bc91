use crate::config::AgentConfig;
use crate::observability::{Observer, ObserverEvent, ObserverMetric};
use crate::providers::{ChatMessage, ChatRequest, Provider, ToolCall, ToolOutput};
use crate::tools::{Tool, ToolResult, ToolSpec};
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Reply used when the model answers with neither text nor tool calls.
pub const NO_RESPONSE: &str = "No response received.";

/// Built-in system instruction, used when `agent.instruction` is unset.
pub const DEFAULT_INSTRUCTION: &str = "\
You are a friendly assistant that remembers things about the user across conversations.

Memory tools:
- save_memory(category, data): call this whenever the user shares a preference, a fact \
about themselves, or asks you to remember something. Pick a short category such as \
'preferences', 'facts' or 'notes'.
- retrieve_memory(category): call this before answering anything that may depend on \
what the user told you earlier. Check the most likely category first.

Tell the user briefly when you saved something. If a category has nothing stored, say so \
instead of guessing. Use example_tool only for generic queries that need processing.";

/// The agent: one instruction, one model, a fixed tool set.
///
/// A turn is a bounded loop. The model sees the history and the tool
/// declarations. Requested calls run in order and their payloads are appended
/// before the model is asked again. The first reply without calls ends the turn.
pub struct Agent {
    name: String,
    description: String,
    instruction: String,
    model: String,
    temperature: f64,
    max_tool_iterations: usize,
    provider: Box<dyn Provider>,
    tools: Vec<Box<dyn Tool>>,
    tool_specs: Vec<ToolSpec>,
    observer: Arc<dyn Observer>,
    tokens_used: AtomicU64,
}

impl Agent {
    pub fn new(
        config: &AgentConfig,
        provider: Box<dyn Provider>,
        tools: Vec<Box<dyn Tool>>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let tool_specs = tools.iter().map(|tool| tool.spec()).collect();
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            instruction: config
                .instruction
                .clone()
                .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tool_iterations: config.max_tool_iterations.max(1),
            provider,
            tools,
            tool_specs,
            observer,
            tokens_used: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Tokens reported by the provider since the agent was built.
    pub fn tokens_used(&self) -> u64 {
        self.tokens_used.load(Ordering::Relaxed)
    }

    pub fn observer(&self) -> &dyn Observer {
        self.observer.as_ref()
    }

    /// Run one user turn against `history`, appending every message exchanged.
    ///
    /// On error `history` may hold a partial turn; callers that keep history
    /// should work on a copy.
    pub async fn respond(&self, history: &mut Vec<ChatMessage>, message: &str) -> Result<String> {
        history.push(ChatMessage::user(message));

        for _ in 0..self.max_tool_iterations {
            self.observer.record_event(&ObserverEvent::LlmRequest {
                provider: self.provider.name().to_string(),
                model: self.model.clone(),
                history_len: history.len(),
            });

            let started = Instant::now();
            let result = self
                .provider
                .chat(ChatRequest {
                    system_prompt: Some(&self.instruction),
                    messages: history.as_slice(),
                    tools: &self.tool_specs,
                    model: &self.model,
                    temperature: self.temperature,
                })
                .await;
            let duration = started.elapsed();

            self.observer.record_event(&ObserverEvent::LlmResponse {
                provider: self.provider.name().to_string(),
                model: self.model.clone(),
                duration,
                success: result.is_ok(),
                error: result.as_ref().err().map(ToString::to_string),
            });
            self.observer
                .record_metric(&ObserverMetric::RequestLatency(duration));

            let response = result?;
            if let Some(tokens) = response.tokens_used {
                self.tokens_used.fetch_add(tokens, Ordering::Relaxed);
                self.observer
                    .record_metric(&ObserverMetric::TokensUsed(tokens));
            }

            if !response.has_tool_calls() {
                let text = response.text.unwrap_or_else(|| NO_RESPONSE.to_string());
                history.push(ChatMessage::assistant(text.clone()));
                return Ok(text);
            }

            let mut outputs = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                outputs.push(ToolOutput {
                    name: call.name.clone(),
                    payload: self.execute_tool(call).await,
                });
            }
            history.push(ChatMessage::Assistant {
                text: response.text,
                tool_calls: response.tool_calls,
            });
            history.push(ChatMessage::ToolResults(outputs));
        }

        anyhow::bail!(
            "Agent stopped after {} tool iterations without a final answer",
            self.max_tool_iterations
        )
    }

    /// Run one tool call and return the payload for the model. Never fails.
    pub async fn execute_tool(&self, call: &ToolCall) -> Value {
        let Some(tool) = self.tools.iter().find(|tool| tool.name() == call.name) else {
            tracing::warn!(tool = %call.name, "Model called an unknown tool");
            self.observer.record_event(&ObserverEvent::Error {
                component: "agent".into(),
                message: format!("unknown tool {}", call.name),
            });
            return json!({
                "status": "error",
                "error": format!("Unknown tool: {}", call.name),
            });
        };

        self.observer.record_event(&ObserverEvent::ToolStart {
            tool: call.name.clone(),
        });
        let started = Instant::now();
        let result = match tool.execute(call.arguments.clone()).await {
            Ok(result) => result,
            Err(e) => ToolResult::failure(e.to_string()),
        };
        self.observer.record_event(&ObserverEvent::ToolEnd {
            tool: call.name.clone(),
            duration: started.elapsed(),
            success: result.success,
        });

        result.payload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::NoopObserver;
    use crate::providers::ChatResponse;
    use crate::tools::ExampleTool;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Provider that replays canned responses and records what it was sent.
    struct Scripted {
        replies: Mutex<VecDeque<anyhow::Result<ChatResponse>>>,
        seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl Scripted {
        fn new(
            replies: Vec<anyhow::Result<ChatResponse>>,
        ) -> (Self, Arc<Mutex<Vec<Vec<ChatMessage>>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    replies: Mutex::new(replies.into()),
                    seen: seen.clone(),
                },
                seen,
            )
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
            self.seen.lock().push(request.messages.to_vec());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(ChatResponse::default()))
        }
    }

    fn text(reply: &str) -> anyhow::Result<ChatResponse> {
        Ok(ChatResponse {
            text: Some(reply.into()),
            tool_calls: Vec::new(),
            tokens_used: Some(10),
        })
    }

    fn call(name: &str, arguments: Value) -> anyhow::Result<ChatResponse> {
        Ok(ChatResponse {
            text: None,
            tool_calls: vec![ToolCall {
                name: name.into(),
                arguments,
                signature: None,
            }],
            tokens_used: Some(5),
        })
    }

    fn agent(provider: Scripted, config: &AgentConfig) -> Agent {
        Agent::new(
            config,
            Box::new(provider),
            vec![Box::new(ExampleTool)],
            Arc::new(NoopObserver),
        )
    }

    #[test]
    fn default_instruction_is_used_when_unset() {
        let (provider, _) = Scripted::new(vec![]);
        let agent = agent(provider, &AgentConfig::default());
        assert_eq!(agent.instruction(), DEFAULT_INSTRUCTION);
        assert_eq!(agent.name(), "memory_agent_starter");
        assert_eq!(agent.tool_names(), ["example_tool"]);
    }

    #[test]
    fn configured_instruction_wins() {
        let (provider, _) = Scripted::new(vec![]);
        let config = AgentConfig {
            instruction: Some("Only speak French.".into()),
            description: "Remembers travel plans.".into(),
            ..AgentConfig::default()
        };
        let agent = agent(provider, &config);
        assert_eq!(agent.instruction(), "Only speak French.");
        assert_eq!(agent.description(), "Remembers travel plans.");
    }

    #[tokio::test]
    async fn plain_reply_ends_turn() {
        let (provider, _) = Scripted::new(vec![text("Hello!")]);
        let agent = agent(provider, &AgentConfig::default());
        let mut history = Vec::new();

        let reply = agent.respond(&mut history, "hi").await.unwrap();

        assert_eq!(reply, "Hello!");
        assert_eq!(
            history,
            vec![ChatMessage::user("hi"), ChatMessage::assistant("Hello!")]
        );
        assert_eq!(agent.tokens_used(), 10);
    }

    #[tokio::test]
    async fn tool_call_result_is_fed_back() {
        let (provider, seen) = Scripted::new(vec![
            call("example_tool", json!({ "query": "ping" })),
            text("Done."),
        ]);
        let agent = agent(provider, &AgentConfig::default());
        let mut history = Vec::new();

        let reply = agent.respond(&mut history, "run it").await.unwrap();
        assert_eq!(reply, "Done.");
        assert_eq!(agent.tokens_used(), 15);

        let seen = seen.lock();
        let second_request = &seen[1];
        let Some(ChatMessage::ToolResults(outputs)) = second_request.last() else {
            panic!("expected tool results, got {second_request:?}");
        };
        assert_eq!(outputs[0].name, "example_tool");
        assert_eq!(outputs[0].payload["message"], "Processed query: ping");
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_payload() {
        let (provider, seen) =
            Scripted::new(vec![call("launch_rocket", json!({})), text("Sorry.")]);
        let agent = agent(provider, &AgentConfig::default());

        let reply = agent.respond(&mut Vec::new(), "go").await.unwrap();
        assert_eq!(reply, "Sorry.");

        let Some(ChatMessage::ToolResults(outputs)) = seen.lock()[1].last().cloned() else {
            panic!("expected tool results");
        };
        assert_eq!(outputs[0].payload["status"], "error");
        assert!(outputs[0].payload["error"]
            .as_str()
            .unwrap()
            .contains("launch_rocket"));
    }

    #[tokio::test]
    async fn missing_argument_becomes_error_payload() {
        let (provider, _) = Scripted::new(vec![]);
        let agent = agent(provider, &AgentConfig::default());
        let payload = agent
            .execute_tool(&ToolCall {
                name: "example_tool".into(),
                arguments: json!({}),
                signature: None,
            })
            .await;
        assert_eq!(payload["status"], "error");
        assert!(payload["error"].as_str().unwrap().contains("'query'"));
    }

    #[tokio::test]
    async fn empty_reply_gets_placeholder() {
        let (provider, _) = Scripted::new(vec![Ok(ChatResponse::default())]);
        let agent = agent(provider, &AgentConfig::default());
        let reply = agent.respond(&mut Vec::new(), "hello?").await.unwrap();
        assert_eq!(reply, NO_RESPONSE);
    }

    #[tokio::test]
    async fn stops_after_max_iterations() {
        let replies = (0..5)
            .map(|_| call("example_tool", json!({ "query": "again" })))
            .collect();
        let (provider, seen) = Scripted::new(replies);
        let config = AgentConfig {
            max_tool_iterations: 3,
            ..AgentConfig::default()
        };
        let agent = agent(provider, &config);

        let err = agent.respond(&mut Vec::new(), "loop").await.unwrap_err();
        assert!(err.to_string().contains("3 tool iterations"));
        assert_eq!(seen.lock().len(), 3);
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let failure = anyhow::anyhow!("Gemini API error (400): bad");
        let (provider, _) = Scripted::new(vec![Err(failure)]);
        let agent = agent(provider, &AgentConfig::default());
        let err = agent.respond(&mut Vec::new(), "hi").await.unwrap_err();
        assert!(err.to_string().contains("(400)"));
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<ObserverEvent>>);

    impl Observer for Recording {
        fn record_event(&self, event: &ObserverEvent) {
            self.0.lock().push(event.clone());
        }

        fn record_metric(&self, _metric: &ObserverMetric) {}

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn records_llm_and_tool_events() {
        let (provider, _) = Scripted::new(vec![
            call("example_tool", json!({ "query": "ping" })),
            text("Done."),
        ]);
        let observer = Arc::new(Recording::default());
        let agent = Agent::new(
            &AgentConfig::default(),
            Box::new(provider),
            vec![Box::new(ExampleTool)],
            observer.clone(),
        );

        agent.respond(&mut Vec::new(), "run it").await.unwrap();

        let events = observer.0.lock();
        let requests = events
            .iter()
            .filter(|e| matches!(e, ObserverEvent::LlmRequest { .. }))
            .count();
        assert_eq!(requests, 2);
        assert!(events.contains(&ObserverEvent::ToolStart {
            tool: "example_tool".into()
        }));
        assert!(events.iter().any(|e| matches!(
            e,
            ObserverEvent::ToolEnd { tool, success: true, .. } if tool == "example_tool"
        )));
    }
}
