use super::agent::Agent;
use super::repl::{chat_loop, TerminalReader};
use super::session::{InMemorySessionService, Runner};
use crate::config::Config;
use crate::memory;
use crate::observability::{self, Observer, ObserverEvent};
use crate::providers::{self, Provider};
use crate::store;
use crate::tools;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;

/// Wire everything from `config` into a [`Runner`] with its session created.
pub async fn build_runner(config: &Config, observer: Arc<dyn Observer>) -> Result<Runner> {
    // ── Storage ─────────────────────────────────────────────────
    let backend = &config.database.backend;
    let store = store::connect(&config.database)
        .await
        .with_context(|| format!("Failed to open the {backend} memory store"))?;
    tracing::info!(backend = store.name(), "Memory store ready");

    let memory = memory::create_memory(store, &config.database);
    if !memory.health_check().await {
        anyhow::bail!("The {backend} memory store failed its health check");
    }
    let tools = tools::all_tools(memory, &config.agent);

    // ── Provider ────────────────────────────────────────────────
    let provider: Box<dyn Provider> = providers::create_resilient_provider(
        &config.agent.provider,
        config.google_api_key.as_deref(),
        config.agent.api_base_url.as_deref(),
        &config.reliability,
    )?;

    observer.record_event(&ObserverEvent::AgentStart {
        provider: provider.name().to_string(),
        model: config.agent.model.clone(),
    });

    let agent = Agent::new(&config.agent, provider, tools, observer.clone());
    tracing::info!(
        agent = agent.name(),
        description = agent.description(),
        model = agent.model(),
        tools = ?agent.tool_names(),
        "Agent ready"
    );

    // ── Session ─────────────────────────────────────────────────
    let sessions = Arc::new(InMemorySessionService::new());
    sessions.create_session(
        &config.agent.app_name,
        &config.agent.user_id,
        &config.agent.session_id,
    )?;
    observer.record_event(&ObserverEvent::SessionStart {
        app: config.agent.app_name.clone(),
        user: config.agent.user_id.clone(),
        session: config.agent.session_id.clone(),
    });

    Ok(Runner::new(&config.agent.app_name, agent, sessions))
}

/// Run a single message, or the interactive loop when `message` is `None`.
pub async fn run(config: Config, message: Option<String>) -> Result<()> {
    let observer = observability::create_observer(&config.observability);
    let runner = build_runner(&config, observer.clone()).await?;

    let user_id = &config.agent.user_id;
    let session_id = &config.agent.session_id;
    let start = Instant::now();

    if let Some(msg) = message {
        let reply = runner.run(user_id, session_id, &msg).await?;
        println!("{reply}");
    } else {
        let mut reader = TerminalReader::new()?;
        let mut out = std::io::stdout();
        chat_loop(&runner, user_id, session_id, &mut reader, &mut out).await?;
    }

    observer.record_event(&ObserverEvent::AgentEnd {
        duration: start.elapsed(),
        tokens_used: Some(runner.agent().tokens_used()),
    });
    observer.flush();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseBackend;
    use crate::observability::NoopObserver;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn memory_config(base_url: Option<String>) -> Config {
        let mut config = Config::default();
        config.database.backend = DatabaseBackend::Memory;
        config.google_api_key = Some("test-key".into());
        config.agent.api_base_url = base_url;
        config
    }

    #[tokio::test]
    async fn builds_runner_with_memory_backend() {
        let runner = build_runner(&memory_config(None), Arc::new(NoopObserver))
            .await
            .unwrap();
        assert_eq!(
            runner.agent().tool_names(),
            ["save_memory", "retrieve_memory", "example_tool"]
        );
        assert_eq!(runner.agent().provider_name(), "gemini");
        assert_eq!(runner.sessions().len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_couchbase_fails_startup() {
        let mut config = memory_config(None);
        config.database.backend = DatabaseBackend::Couchbase;
        let err = build_runner(&config, Arc::new(NoopObserver)).await.err().unwrap();
        assert!(format!("{err:#}").contains("couchbase"));
    }

    #[tokio::test]
    async fn unhealthy_store_fails_startup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("system:keyspaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "results": [1]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("SELECT RAW 1"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = memory_config(None);
        config.database.backend = DatabaseBackend::Couchbase;
        config.database.conn_str = Some("couchbases://cb.example.com".into());
        config.database.username = Some("agent".into());
        config.database.password = Some("secret".into());
        config.database.bucket = Some("travel".into());
        config.database.query_url = Some(format!("{}/query/service", server.uri()));

        let err = build_runner(&config, Arc::new(NoopObserver)).await.err().unwrap();
        assert!(err.to_string().contains("health check"), "got {err:#}");
    }

    #[tokio::test]
    async fn unknown_provider_fails_startup() {
        let mut config = memory_config(None);
        config.agent.provider = "nope".into();
        assert!(build_runner(&config, Arc::new(NoopObserver)).await.is_err());
    }

    #[tokio::test]
    async fn single_message_mode_runs_one_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Hello from the model"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        run(memory_config(Some(server.uri())), Some("hi".into()))
            .await
            .unwrap();
    }
}
