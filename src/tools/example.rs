use super::traits::{required_str, Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;

/// Placeholder business-logic tool. Replace the body of `execute` with a real
/// integration (API call, calculation, lookup) when adapting the template.
pub struct ExampleTool;

#[async_trait]
impl Tool for ExampleTool {
    fn name(&self) -> &str {
        "example_tool"
    }

    fn description(&self) -> &str {
        "Example tool that processes a free-text query. Stand-in for your own business logic."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "User query or input to process"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let query = required_str(&args, "query")?;
        Ok(ToolResult::success(&json!({
            "status": "success",
            "message": format!("Processed query: {query}"),
            "example_data": "Example output; replace with your own logic",
        })))
    }
}
