use super::traits::{DocumentStore, StoreError};
use crate::memory::UserMemoryDocument;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Process-local store. Nothing survives a restart; used for tests and for
/// trying the agent without a database.
#[derive(Default)]
pub struct InMemoryStore {
    documents: Mutex<HashMap<String, UserMemoryDocument>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held.
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<UserMemoryDocument>, StoreError> {
        Ok(self.documents.lock().get(key).cloned())
    }

    async fn upsert(&self, key: &str, document: &UserMemoryDocument) -> Result<(), StoreError> {
        self.documents
            .lock()
            .insert(key.to_string(), document.clone());
        Ok(())
    }

    async fn append(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut documents = self.documents.lock();
        let document = documents.entry(key.to_string()).or_default();
        Ok(document.append(field, value).to_vec())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
