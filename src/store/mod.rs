pub mod couchbase;
pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use couchbase::{CouchbaseStore, Keyspace};
pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{DocumentStore, StoreError};

use crate::config::{DatabaseBackend, DatabaseConfig};
use std::sync::Arc;

/// Open the document store selected by `database.backend`.
///
/// For Couchbase this performs the full connection check; any error is meant
/// to abort startup.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        DatabaseBackend::Couchbase => Ok(Arc::new(CouchbaseStore::connect(config).await?)),
        DatabaseBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.sqlite_path())?)),
        DatabaseBackend::Memory => {
            tracing::warn!("Using the in-process memory backend; nothing will persist");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
