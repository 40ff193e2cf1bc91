pub mod adapter;
pub mod document;
pub mod traits;

pub use adapter::DocumentMemory;
pub use document::{document_key, UserMemoryDocument};
pub use traits::{Memory, MemoryError, Recall, RecallStatus, SaveReceipt};

use crate::config::DatabaseConfig;
use crate::store::DocumentStore;
use std::sync::Arc;

/// Build the memory adapter for an opened store, honoring `database.write_mode`.
pub fn create_memory(store: Arc<dyn DocumentStore>, config: &DatabaseConfig) -> Arc<dyn Memory> {
    Arc::new(DocumentMemory::new(store, config.write_mode))
}
