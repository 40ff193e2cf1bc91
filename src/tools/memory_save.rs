use super::traits::{required_str, Tool, ToolResult};
use crate::memory::{Memory, MemoryError};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Let the agent append a piece of text to one of the user's memory categories.
pub struct SaveMemoryTool {
    memory: Arc<dyn Memory>,
    user_id: String,
}

impl SaveMemoryTool {
    pub fn new(memory: Arc<dyn Memory>, user_id: &str) -> Self {
        Self {
            memory,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl Tool for SaveMemoryTool {
    fn name(&self) -> &str {
        "save_memory"
    }

    fn description(&self) -> &str {
        "Save a piece of information to the user's persistent memory under a category \
         (for example 'preferences', 'facts' or 'notes'). Use when the user shares something \
         worth remembering across conversations."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Category to save under, e.g. 'preferences', 'facts', 'notes'"
                },
                "data": {
                    "type": "string",
                    "description": "The information to remember"
                }
            },
            "required": ["category", "data"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let category = required_str(&args, "category")?;
        let data = required_str(&args, "data")?;

        match self.memory.save(&self.user_id, category, data).await {
            Ok(receipt) => {
                let message = format!(
                    "Data saved in category '{}': {}",
                    receipt.category, receipt.saved
                );
                Ok(ToolResult::success(&json!({
                    "status": "success",
                    "saved_data": receipt.saved,
                    "category": receipt.category,
                    "message": message,
                })))
            }
            Err(MemoryError::InvalidInput(reason)) => Ok(ToolResult::failure(reason)),
            Err(e) => {
                tracing::warn!(
                    user = %self.user_id,
                    category,
                    error = %e,
                    "save_memory failed"
                );
                Ok(ToolResult::failure(format!("Failed to save memory: {e}")))
            }
        }
    }
}
