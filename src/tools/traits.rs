//! Tool trait: implement for any capability the agent can call.
//!
//! A tool is what the model sees as a callable function: a name, a description
//! that tells the model when to use it, a JSON Schema for its arguments, and an
//! `execute` that returns a small structured result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool did what was asked
    pub success: bool,
    /// JSON payload relayed to the model
    pub output: String,
    /// Error message if the tool failed
    pub error: Option<String>,
}

impl ToolResult {
    /// Successful result carrying a JSON payload.
    pub fn success(payload: &Value) -> Self {
        Self {
            success: true,
            output: payload.to_string(),
            error: None,
        }
    }

    /// Failed result; the model receives `{"status":"error","error":…}`.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            output: json!({ "status": "error", "error": message }).to_string(),
            error: Some(message),
        }
    }

    /// The payload as JSON. Non-JSON output is wrapped as `{"output": …}`.
    pub fn payload(&self) -> Value {
        match serde_json::from_str::<Value>(&self.output) {
            Ok(value @ Value::Object(_)) => value,
            Ok(other) => json!({ "output": other }),
            Err(_) => json!({ "output": self.output }),
        }
    }
}

/// Description of a tool for the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    /// Tool name (used in function calling)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: Value,
}

/// Core tool trait.
///
/// Expected failures (bad input, storage down) should come back as
/// `Ok(ToolResult::failure(..))` so the model can react. Returning `Err` is for
/// calls that could not be made at all, such as a missing argument; the agent
/// loop turns those into an error payload as well.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in LLM function calling (`snake_case`).
    fn name(&self) -> &str;

    /// Tells the model what the tool does and when to use it.
    fn description(&self) -> &str;

    /// JSON Schema with `type`, `properties` and `required`.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the model-supplied arguments.
    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult>;

    /// Full spec for LLM registration.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, name: &str) -> anyhow::Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("Missing '{name}' parameter"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_payload_has_error_status() {
        let result = ToolResult::failure("boom");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        let expected = json!({ "status": "error", "error": "boom" });
        assert_eq!(result.payload(), expected);
    }

    #[test]
    fn plain_text_output_is_wrapped() {
        let result = ToolResult {
            success: true,
            output: "done".into(),
            error: None,
        };
        assert_eq!(result.payload(), json!({ "output": "done" }));
    }

    #[test]
    fn non_object_json_is_wrapped() {
        let result = ToolResult::success(&json!([1, 2]));
        assert_eq!(result.payload(), json!({ "output": [1, 2] }));
    }

    #[test]
    fn required_str_reports_missing_name() {
        let args = json!({ "category": "prefs", "count": 3 });
        assert_eq!(required_str(&args, "category").unwrap(), "prefs");
        let err = required_str(&args, "data").unwrap_err();
        assert!(err.to_string().contains("'data'"));
        assert!(required_str(&args, "count").is_err());
    }
}
