use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DOCUMENT_KEY_PREFIX: &str = "user::";

/// Storage key of the document holding every category for `user_id`.
pub fn document_key(user_id: &str) -> String {
    format!("{DOCUMENT_KEY_PREFIX}{user_id}")
}

/// All memories of one user: category name → entries in append order.
///
/// Serializes as a plain JSON object, e.g.
/// `{"preferences": ["dark mode"], "facts": ["lives in Oslo"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserMemoryDocument(BTreeMap<String, Vec<String>>);

impl UserMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries stored under `category`, or `None` if the category was never written.
    pub fn entries(&self, category: &str) -> Option<&[String]> {
        self.0.get(category).map(Vec::as_slice)
    }

    /// Append `text` to `category`, creating the category if needed.
    /// Duplicates are kept.
    pub fn append(&mut self, category: &str, text: &str) -> &[String] {
        let entries = self.0.entry(category.to_string()).or_default();
        entries.push(text.to_string());
        entries
    }
}
