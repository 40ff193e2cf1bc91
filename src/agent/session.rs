use super::agent::Agent;
use crate::observability::{ObserverEvent, ObserverMetric};
use crate::providers::ChatMessage;
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

/// Conversation history kept in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: Mutex<HashMap<SessionKey, Vec<ChatMessage>>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty session. Fails if the session already exists.
    pub fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionKey> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&key) {
            anyhow::bail!("Session {session_id} already exists for user {user_id}");
        }
        sessions.insert(key.clone(), Vec::new());
        Ok(key)
    }

    /// Snapshot of a session's history, or `None` if it was never created.
    pub fn history(&self, key: &SessionKey) -> Option<Vec<ChatMessage>> {
        self.sessions.lock().get(key).cloned()
    }

    /// Replace a session's history after a completed turn.
    pub fn replace(&self, key: &SessionKey, history: Vec<ChatMessage>) -> Result<()> {
        match self.sessions.lock().get_mut(key) {
            Some(slot) => {
                *slot = history;
                Ok(())
            }
            None => anyhow::bail!("Session {} not found", key.session_id),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// Binds the agent to the session store and runs user turns.
pub struct Runner {
    app_name: String,
    agent: Agent,
    sessions: Arc<InMemorySessionService>,
}

impl Runner {
    pub fn new(app_name: &str, agent: Agent, sessions: Arc<InMemorySessionService>) -> Self {
        Self {
            app_name: app_name.to_string(),
            agent,
            sessions,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn sessions(&self) -> &InMemorySessionService {
        &self.sessions
    }

    /// Run one user message through the agent in an existing session.
    ///
    /// History is stored only when the turn succeeds, so a failed turn leaves
    /// the session as it was.
    pub async fn run(&self, user_id: &str, session_id: &str, message: &str) -> Result<String> {
        let key = SessionKey::new(&self.app_name, user_id, session_id);
        let mut history = self.sessions.history(&key).ok_or_else(|| {
            anyhow::anyhow!("Session {session_id} not found for user {user_id}")
        })?;

        let reply = self.agent.respond(&mut history, message).await?;
        self.sessions.replace(&key, history)?;

        let observer = self.agent.observer();
        observer.record_event(&ObserverEvent::TurnComplete {
            session: session_id.to_string(),
        });
        observer.record_metric(&ObserverMetric::ActiveSessions(
            self.sessions.len() as u64,
        ));
        Ok(reply)
    }
}
