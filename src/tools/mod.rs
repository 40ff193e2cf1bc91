pub mod example;
pub mod memory_retrieve;
pub mod memory_save;
pub mod traits;

pub use example::ExampleTool;
pub use memory_retrieve::RetrieveMemoryTool;
pub use memory_save::SaveMemoryTool;
pub use traits::{Tool, ToolResult, ToolSpec};

use crate::config::AgentConfig;
use crate::memory::Memory;
use std::sync::Arc;

/// The two memory tools, bound to `user_id`.
pub fn memory_tools(memory: Arc<dyn Memory>, user_id: &str) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(SaveMemoryTool::new(memory.clone(), user_id)),
        Box::new(RetrieveMemoryTool::new(memory, user_id)),
    ]
}

/// Every tool the agent is configured with.
pub fn all_tools(memory: Arc<dyn Memory>, config: &AgentConfig) -> Vec<Box<dyn Tool>> {
    let mut tools = memory_tools(memory, &config.user_id);
    if config.example_tool {
        tools.push(Box::new(ExampleTool));
    }
    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteMode;
    use crate::memory::DocumentMemory;
    use crate::store::InMemoryStore;

    fn memory() -> Arc<dyn Memory> {
        Arc::new(DocumentMemory::new(
            Arc::new(InMemoryStore::new()),
            WriteMode::ReadModifyWrite,
        ))
    }

    #[test]
    fn all_tools_includes_example_by_default() {
        let tools = all_tools(memory(), &AgentConfig::default());
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["save_memory", "retrieve_memory", "example_tool"]);
    }

    #[test]
    fn example_tool_can_be_disabled() {
        let config = AgentConfig {
            example_tool: false,
            ..AgentConfig::default()
        };
        assert_eq!(all_tools(memory(), &config).len(), 2);
    }
}
