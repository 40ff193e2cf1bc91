//! Provider trait: implement for any LLM backend.
//!
//! This module defines the core abstraction for AI model providers. A provider
//! takes the conversation so far, the system instruction and the tool
//! declarations, and returns either text, function calls, or both.

use crate::tools::ToolSpec;
use async_trait::async_trait;
use serde_json::Value;

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Name of the tool to invoke
    pub name: String,
    /// JSON object with the call arguments
    pub arguments: Value,
    /// Opaque signature some models attach to a call; echoed back verbatim
    pub signature: Option<String>,
}

/// The result of one tool call, sent back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub name: String,
    pub payload: Value,
}

/// One entry of conversation history.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    /// Text typed by the user
    User(String),
    /// A model turn: optional text plus any function calls it made
    Assistant {
        text: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// Results for the function calls of the preceding assistant turn
    ToolResults(Vec<ToolOutput>),
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User(text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }
}

/// Everything a provider needs for one model call.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system_prompt: Option<&'a str>,
    pub messages: &'a [ChatMessage],
    pub tools: &'a [ToolSpec],
    pub model: &'a str,
    pub temperature: f64,
}

/// A model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    /// Concatenated text parts, if any
    pub text: Option<String>,
    /// Function calls, in the order the model emitted them
    pub tool_calls: Vec<ToolCall>,
    /// Total tokens billed for the call, when reported
    pub tokens_used: Option<u64>,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Core provider trait: implement for any LLM backend.
///
/// # Implementation Guide
///
/// 1. Implement `chat()` with your provider's API call, mapping
///    [`ChatMessage`] history and [`ToolSpec`] declarations to its wire format
/// 2. Register your provider in `src/providers/mod.rs`
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use memory_agent::providers::traits::{ChatRequest, ChatResponse, Provider};
///
/// pub struct MyProvider {
///     api_key: String,
///     client: reqwest::Client,
/// }
///
/// #[async_trait]
/// impl Provider for MyProvider {
///     fn name(&self) -> &str {
///         "mine"
///     }
///
///     async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
///         // Your API call here
///         Ok(ChatResponse::default())
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Send the conversation to the LLM.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails, authentication fails, or the
    /// response cannot be parsed. Error messages carry the HTTP status in
    /// parentheses, e.g. `Gemini API error (503): …`, so callers can classify
    /// transient failures.
    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_without_calls_is_final() {
        let response = ChatResponse {
            text: Some("done".into()),
            ..ChatResponse::default()
        };
        assert!(!response.has_tool_calls());
    }

    #[test]
    fn assistant_helper_has_no_calls() {
        let ChatMessage::Assistant { text, tool_calls } = ChatMessage::assistant("hi") else {
            panic!("expected assistant message");
        };
        assert_eq!(text.as_deref(), Some("hi"));
        assert!(tool_calls.is_empty());
    }
}
