use super::document::document_key;
use super::traits::{Memory, MemoryError, Recall, SaveReceipt};
use crate::config::WriteMode;
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Memory kept as one document per user in a [`DocumentStore`].
///
/// In [`WriteMode::ReadModifyWrite`] a save reads the whole document, appends
/// locally and writes the whole document back. Two concurrent saves for the
/// same user can therefore lose one append (last writer wins).
/// [`WriteMode::Atomic`] hands the append to the store instead.
pub struct DocumentMemory {
    store: Arc<dyn DocumentStore>,
    write_mode: WriteMode,
}

impl DocumentMemory {
    pub fn new(store: Arc<dyn DocumentStore>, write_mode: WriteMode) -> Self {
        Self { store, write_mode }
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }
}

fn validate_category(category: &str) -> Result<&str, MemoryError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(MemoryError::InvalidInput(
            "category must not be empty".into(),
        ));
    }
    Ok(category)
}

fn validate_text(text: &str) -> Result<(), MemoryError> {
    if text.trim().is_empty() {
        return Err(MemoryError::InvalidInput("text must not be empty".into()));
    }
    Ok(())
}

#[async_trait]
impl Memory for DocumentMemory {
    fn name(&self) -> &str {
        self.store.name()
    }

    async fn save(
        &self,
        user_id: &str,
        category: &str,
        text: &str,
    ) -> Result<SaveReceipt, MemoryError> {
        let category = validate_category(category)?;
        validate_text(text)?;
        let key = document_key(user_id);

        let entries = match self.write_mode {
            WriteMode::ReadModifyWrite => {
                let mut document = self.store.get(&key).await?.unwrap_or_default();
                let entries = document.append(category, text).to_vec();
                self.store.upsert(&key, &document).await?;
                entries
            }
            WriteMode::Atomic => self.store.append(&key, category, text).await?,
        };

        info!(
            user = user_id,
            category,
            items = entries.len(),
            "Saved memory entry"
        );
        Ok(SaveReceipt {
            category: category.to_string(),
            saved: text.to_string(),
            entries,
        })
    }

    async fn retrieve(&self, user_id: &str, category: &str) -> Result<Recall, MemoryError> {
        let category = validate_category(category)?;
        let document = self.store.get(&document_key(user_id)).await?;

        let recall = match document.as_ref().and_then(|doc| doc.entries(category)) {
            Some(entries) => Recall::found(category, entries.to_vec()),
            None => Recall::not_found(category),
        };
        info!(
            user = user_id,
            category,
            items = recall.entries.len(),
            "Retrieved memory entries"
        );
        Ok(recall)
    }

    async fn health_check(&self) -> bool {
        self.store.health_check().await
    }
}
