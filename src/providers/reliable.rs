use crate::providers::traits::{ChatRequest, ChatResponse, Provider};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Wraps a provider and retries transient failures with exponential backoff.
///
/// Only model calls go through here. Storage calls made by tools are never
/// retried.
pub struct ReliableProvider {
    inner: Box<dyn Provider>,
    max_retries: u32,
    base_backoff_ms: u64,
}

impl ReliableProvider {
    pub fn new(inner: Box<dyn Provider>, max_retries: u32, base_backoff_ms: u64) -> Self {
        Self {
            inner,
            max_retries,
            base_backoff_ms,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }
}

const TRANSIENT_MARKERS: &[&str] = &[
    "(429)",
    "(500)",
    "(502)",
    "(503)",
    "(504)",
    "rate limit",
    "timed out",
    "timeout",
];

/// Rate limits, server errors, timeouts and dropped connections are worth a retry.
fn is_transient(error: &anyhow::Error) -> bool {
    if let Some(http) = error.downcast_ref::<reqwest::Error>() {
        if http.is_timeout() || http.is_connect() {
            return true;
        }
    }
    let message = error.to_string().to_lowercase();
    TRANSIENT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

#[async_trait]
impl Provider for ReliableProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let mut attempt = 0;
        loop {
            match self.inner.chat(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    warn!(
                        provider = self.inner.name(),
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Retrying provider call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
