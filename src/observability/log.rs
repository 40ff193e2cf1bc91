use super::traits::{Observer, ObserverEvent, ObserverMetric};
use tracing::{debug, info, warn};

/// Observer that forwards events to `tracing`.
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::AgentStart { provider, model } => {
                info!(provider = %provider, model = %model, "agent.start");
            }
            ObserverEvent::SessionStart { app, user, session } => {
                info!(app = %app, user = %user, session = %session, "session.start");
            }
            ObserverEvent::LlmRequest {
                provider,
                model,
                history_len,
            } => {
                debug!(provider = %provider, model = %model, history_len, "llm.request");
            }
            ObserverEvent::LlmResponse {
                provider,
                model,
                duration,
                success,
                error,
            } => {
                let ms = millis(*duration);
                if *success {
                    debug!(provider = %provider, model = %model, duration_ms = ms, "llm.response");
                } else {
                    warn!(
                        provider = %provider,
                        model = %model,
                        duration_ms = ms,
                        error = error.as_deref().unwrap_or(""),
                        "llm.response failed"
                    );
                }
            }
            ObserverEvent::ToolStart { tool } => {
                debug!(tool = %tool, "tool.start");
            }
            ObserverEvent::ToolEnd {
                tool,
                duration,
                success,
            } => {
                info!(tool = %tool, duration_ms = millis(*duration), success, "tool.call");
            }
            ObserverEvent::TurnComplete { session } => {
                debug!(session = %session, "turn.complete");
            }
            ObserverEvent::AgentEnd {
                duration,
                tokens_used,
            } => {
                info!(duration_ms = millis(*duration), tokens = ?tokens_used, "agent.end");
            }
            ObserverEvent::Error { component, message } => {
                warn!(component = %component, error = %message, "error");
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::RequestLatency(d) => {
                debug!(latency_ms = millis(*d), "metric.request_latency");
            }
            ObserverMetric::TokensUsed(t) => {
                debug!(tokens = t, "metric.tokens_used");
            }
            ObserverMetric::ActiveSessions(s) => {
                debug!(sessions = s, "metric.active_sessions");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
