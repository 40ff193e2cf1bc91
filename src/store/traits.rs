//! Document store trait: implement for any backend that can hold one JSON
//! document per key.
//!
//! The memory adapter only needs three primitives: read a whole document,
//! replace a whole document, and append a value to an array field in one
//! server-side step. Backends map these onto whatever their database offers.

use crate::memory::UserMemoryDocument;
use async_trait::async_trait;

/// Failures surfaced by a document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database could not be reached or the connection settings are unusable.
    #[error("cannot reach the database: {0}")]
    Connection(String),

    /// The database rejected the configured credentials.
    #[error("the database rejected the credentials (HTTP {status})")]
    Auth { status: u16 },

    /// The configured bucket/scope/collection does not exist.
    #[error("keyspace {keyspace} does not exist")]
    KeyspaceNotFound { keyspace: String },

    /// The database answered with an error for a statement.
    #[error("query failed [{code}]: {message}")]
    Query { code: i64, message: String },

    /// An atomic append kept colliding with concurrent writers.
    #[error("gave up appending to document '{0}' after repeated write conflicts")]
    Conflict(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document does not have the category → list-of-strings shape.
    #[error("malformed document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Core document store trait.
///
/// Implementations must be safe to share across tasks; the agent holds a single
/// store behind an `Arc` for the lifetime of the process.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name (e.g., "couchbase", "sqlite", "memory").
    fn name(&self) -> &str;

    /// Fetch the document stored under `key`.
    ///
    /// Returns `Ok(None)` when no document exists; that is not an error.
    async fn get(&self, key: &str) -> Result<Option<UserMemoryDocument>, StoreError>;

    /// Insert or fully replace the document stored under `key`.
    async fn upsert(&self, key: &str, document: &UserMemoryDocument) -> Result<(), StoreError>;

    /// Append `value` to the array at `field`, creating the document and the
    /// field as needed, as a single atomic step on the backend.
    ///
    /// Returns the field's entries after the append.
    async fn append(&self, key: &str, field: &str, value: &str)
        -> Result<Vec<String>, StoreError>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> bool;
}
