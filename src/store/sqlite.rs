use super::traits::{DocumentStore, StoreError};
use crate::memory::UserMemoryDocument;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Local SQLite backend. Each document is one row holding its JSON body,
/// so the stored shape matches what the Couchbase backend writes.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn, Some(path))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<&Path>) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                id         TEXT PRIMARY KEY,
                body       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        tracing::debug!(path = ?path, "SQLite document store ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn read_document(
    conn: &Connection,
    key: &str,
) -> Result<Option<UserMemoryDocument>, StoreError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE id = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|body| serde_json::from_str(&body).map_err(StoreError::from))
        .transpose()
}

fn write_document(
    conn: &Connection,
    key: &str,
    document: &UserMemoryDocument,
) -> Result<(), StoreError> {
    let body = serde_json::to_string(document)?;
    conn.execute(
        "INSERT INTO documents (id, body, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        params![key, body],
    )?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<UserMemoryDocument>, StoreError> {
        read_document(&self.conn.lock(), key)
    }

    async fn upsert(&self, key: &str, document: &UserMemoryDocument) -> Result<(), StoreError> {
        write_document(&self.conn.lock(), key, document)
    }

    async fn append(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut document = read_document(&tx, key)?.unwrap_or_default();
        let entries = document.append(field, value).to_vec();
        write_document(&tx, key, &document)?;
        tx.commit()?;
        Ok(entries)
    }

    async fn health_check(&self) -> bool {
        self.conn
            .lock()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn documents_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("memory.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.append("user::a", "prefs", "dark mode").await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let document = store.get("user::a").await.unwrap().unwrap();
        assert_eq!(document.entries("prefs").unwrap(), ["dark mode"]);
        assert!(path.exists());
    }

    fn write_raw(conn: &Connection, key: &str, body: &str) {
        conn.execute(
            "INSERT INTO documents (id, body, updated_at) VALUES (?1, ?2, '')",
            params![key, body],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn stored_body_is_plain_json_object() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.append("user::a", "facts", "likes tea").await.unwrap();

        let body: String = store
            .conn
            .lock()
            .query_row("SELECT body FROM documents WHERE id = 'user::a'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(body, r#"{"facts":["likes tea"]}"#);
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        write_raw(&store.conn.lock(), "user::a", r#"{"prefs": 3}"#);

        let err = store.get("user::a").await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn health_check_passes() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.health_check().await);
    }
}
