pub mod gemini;
pub mod reliable;
pub mod traits;

pub use gemini::GeminiProvider;
pub use reliable::ReliableProvider;
pub use traits::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall, ToolOutput};

use crate::config::ReliabilityConfig;

const ERROR_EXCERPT_CHARS: usize = 200;

/// First `max_chars` characters of `text`, with `...` when cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Turn a non-success HTTP reply into an error that names the status.
pub(crate) async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    anyhow::anyhow!(
        "{provider} API error ({status}): {}",
        excerpt(body.trim(), ERROR_EXCERPT_CHARS)
    )
}

/// Factory: create the right provider from config.
pub fn create_provider(
    name: &str,
    api_key: Option<&str>,
    base_url: Option<&str>,
) -> anyhow::Result<Box<dyn Provider>> {
    match name {
        "gemini" | "google" => Ok(Box::new(match base_url {
            Some(url) => GeminiProvider::with_base_url(api_key, url),
            None => GeminiProvider::new(api_key),
        })),
        _ => anyhow::bail!("Unknown provider: {name}. Supported: gemini"),
    }
}

/// Create a provider wrapped in [`ReliableProvider`].
pub fn create_resilient_provider(
    name: &str,
    api_key: Option<&str>,
    base_url: Option<&str>,
    reliability: &ReliabilityConfig,
) -> anyhow::Result<Box<dyn Provider>> {
    let inner = create_provider(name, api_key, base_url)?;
    Ok(Box::new(ReliableProvider::new(
        inner,
        reliability.provider_retries,
        reliability.provider_backoff_ms,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_gemini() {
        assert!(create_provider("gemini", Some("k"), None).is_ok());
        let proxied = create_provider("google", Some("k"), Some("http://localhost:1"));
        assert!(proxied.is_ok());
    }

    #[test]
    fn factory_unknown() {
        let err = create_provider("nope", None, None).err().unwrap();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn resilient_keeps_inner_name() {
        let provider =
            create_resilient_provider("gemini", Some("k"), None, &ReliabilityConfig::default())
                .unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn excerpt_is_char_safe() {
        assert_eq!(excerpt("hello", 10), "hello");
        assert_eq!(excerpt("hello world", 5), "hello...");
        let text = "\u{4F60}\u{597D}\u{4E16}";
        assert_eq!(excerpt(text, 2), "\u{4F60}\u{597D}...");
    }
}
