use crate::providers::traits::{
    ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall, ToolOutput,
};
use crate::tools::ToolSpec;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini over the `generateContent` REST endpoint.
pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDeclarations>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: Option<u64>,
}

impl GeminiProvider {
    pub fn new(api_key: Option<&str>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the provider at another endpoint (proxies, tests).
    pub fn with_base_url(api_key: Option<&str>, base_url: &str) -> Self {
        Self {
            api_key: api_key.map(ToString::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn api_key(&self) -> anyhow::Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => anyhow::bail!("Gemini API key not configured. Set GOOGLE_API_KEY."),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }
}

fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_string()),
        ..Part::default()
    }
}

fn to_content(message: &ChatMessage) -> Content {
    match message {
        ChatMessage::User(text) => Content {
            role: Some("user".into()),
            parts: vec![text_part(text)],
        },
        ChatMessage::Assistant { text, tool_calls } => {
            let mut parts: Vec<Part> = text.as_deref().map(text_part).into_iter().collect();
            parts.extend(tool_calls.iter().map(|call| Part {
                function_call: Some(FunctionCall {
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                }),
                thought_signature: call.signature.clone(),
                ..Part::default()
            }));
            Content {
                role: Some("model".into()),
                parts,
            }
        }
        ChatMessage::ToolResults(outputs) => Content {
            role: Some("user".into()),
            parts: outputs.iter().map(function_response_part).collect(),
        },
    }
}

fn function_response_part(output: &ToolOutput) -> Part {
    Part {
        function_response: Some(FunctionResponse {
            name: output.name.clone(),
            response: output.payload.clone(),
        }),
        ..Part::default()
    }
}

fn to_declarations(tools: &[ToolSpec]) -> Vec<ToolDeclarations> {
    if tools.is_empty() {
        return Vec::new();
    }
    vec![ToolDeclarations {
        function_declarations: tools
            .iter()
            .map(|spec| FunctionDeclaration {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            })
            .collect(),
    }]
}

fn build_request(request: &ChatRequest<'_>) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: request.system_prompt.map(|prompt| Content {
            role: None,
            parts: vec![text_part(prompt)],
        }),
        contents: request.messages.iter().map(to_content).collect(),
        tools: to_declarations(request.tools),
        generation_config: GenerationConfig {
            temperature: request.temperature,
        },
    }
}

fn parse_response(response: GenerateContentResponse) -> ChatResponse {
    let tokens_used = response
        .usage_metadata
        .and_then(|usage| usage.total_token_count);

    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for part in parts {
        if let Some(call) = part.function_call {
            // Calls without parameters may arrive with no `args` at all
            let arguments = match call.args {
                Value::Null => Value::Object(Map::new()),
                args => args,
            };
            tool_calls.push(ToolCall {
                name: call.name,
                arguments,
                signature: part.thought_signature,
            });
        } else if let Some(chunk) = part.text {
            // Thought summaries are not part of the answer
            if part.thought != Some(true) {
                text.push_str(&chunk);
            }
        }
    }

    ChatResponse {
        text: (!text.trim().is_empty()).then_some(text),
        tool_calls,
        tokens_used,
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let api_key = self.api_key()?;
        let body = build_request(&request);

        let response = self
            .client
            .post(self.endpoint(request.model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::api_error("Gemini", response).await);
        }

        let parsed: GenerateContentResponse = response.json().await?;
        Ok(parse_response(parsed))
    }
}
