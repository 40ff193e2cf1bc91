use std::time::Duration;

/// What happened, as seen by the agent runtime. Events carry names and
/// counts only, never prompt text or stored memory.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    AgentStart {
        provider: String,
        model: String,
    },
    /// A conversation was opened for a user.
    SessionStart {
        app: String,
        user: String,
        session: String,
    },
    /// About to call the model with `history_len` messages.
    LlmRequest {
        provider: String,
        model: String,
        history_len: usize,
    },
    LlmResponse {
        provider: String,
        model: String,
        duration: Duration,
        success: bool,
        error: Option<String>,
    },
    ToolStart {
        tool: String,
    },
    ToolEnd {
        tool: String,
        duration: Duration,
        success: bool,
    },
    /// A user message got its final reply.
    TurnComplete {
        session: String,
    },
    AgentEnd {
        duration: Duration,
        tokens_used: Option<u64>,
    },
    Error {
        component: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObserverMetric {
    RequestLatency(Duration),
    TokensUsed(u64),
    ActiveSessions(u64),
}

/// Sink for runtime events. Implementations must be cheap to call.
pub trait Observer: Send + Sync + 'static {
    fn record_event(&self, event: &ObserverEvent);

    fn record_metric(&self, metric: &ObserverMetric);

    /// Push out anything buffered. Called once at shutdown.
    fn flush(&self) {}

    fn name(&self) -> &str;
}
