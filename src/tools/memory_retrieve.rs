use super::traits::{required_str, Tool, ToolResult};
use crate::memory::{Memory, MemoryError};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Let the agent read back everything stored in one memory category.
pub struct RetrieveMemoryTool {
    memory: Arc<dyn Memory>,
    user_id: String,
}

impl RetrieveMemoryTool {
    pub fn new(memory: Arc<dyn Memory>, user_id: &str) -> Self {
        Self {
            memory,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl Tool for RetrieveMemoryTool {
    fn name(&self) -> &str {
        "retrieve_memory"
    }

    fn description(&self) -> &str {
        "Retrieve everything saved in one category of the user's persistent memory. \
         Use before answering questions that depend on preferences, facts or notes from \
         earlier conversations."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Category to read, e.g. 'preferences', 'facts', 'notes'"
                }
            },
            "required": ["category"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let category = required_str(&args, "category")?;

        match self.memory.retrieve(&self.user_id, category).await {
            Ok(recall) => Ok(ToolResult::success(&json!({
                "status": recall.status.as_str(),
                "data": recall.entries,
                "category": recall.category,
                "count": recall.entries.len(),
            }))),
            Err(MemoryError::InvalidInput(reason)) => Ok(ToolResult::failure(reason)),
            Err(e) => {
                tracing::warn!(
                    user = %self.user_id,
                    category,
                    error = %e,
                    "retrieve_memory failed"
                );
                let message = format!("Failed to retrieve memory: {e}");
                Ok(ToolResult::failure(message))
            }
        }
    }
}
