//! Memory trait: the agent-facing contract for persistent per-user memory.
//!
//! This module defines what the tools see: save a piece of text under a
//! category for a user, and read a category back. Where and how the text is
//! stored is up to the implementation.

use crate::store::StoreError;
use async_trait::async_trait;
use serde::Serialize;

/// Errors returned by memory operations.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The category or text was rejected before touching storage.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The underlying store failed. Never retried.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Category the text was saved under (trimmed)
    pub category: String,
    /// The text exactly as saved
    pub saved: String,
    /// The category's entries after the save, in append order
    pub entries: Vec<String>,
}

/// Whether a retrieved category existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallStatus {
    Found,
    NotFound,
}

impl RecallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "success",
            Self::NotFound => "not_found",
        }
    }
}

/// Result of reading one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recall {
    pub category: String,
    pub status: RecallStatus,
    pub entries: Vec<String>,
}

impl Recall {
    pub fn found(category: &str, entries: Vec<String>) -> Self {
        Self {
            category: category.to_string(),
            status: RecallStatus::Found,
            entries,
        }
    }

    /// Empty result for a missing document or category.
    pub fn not_found(category: &str) -> Self {
        Self {
            category: category.to_string(),
            status: RecallStatus::NotFound,
            entries: Vec::new(),
        }
    }
}

/// Core memory trait: implement for any persistence strategy.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Backend name, used for logging.
    fn name(&self) -> &str;

    /// Append `text` to `category` in the memory of `user_id`.
    ///
    /// Saving the same text twice stores it twice.
    async fn save(
        &self,
        user_id: &str,
        category: &str,
        text: &str,
    ) -> Result<SaveReceipt, MemoryError>;

    /// Read every entry stored under `category` for `user_id`.
    ///
    /// A missing document or category is a `NotFound` recall, not an error.
    async fn retrieve(&self, user_id: &str, category: &str) -> Result<Recall, MemoryError>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> bool;
}
