//! Couchbase backend over the cluster's Query service.
//!
//! Every statement is a SQL++ statement sent to `/query/service` with named
//! parameters and HTTP basic auth. Key lookups use `USE KEYS`, which reads
//! straight from the data service and needs no secondary index.

use super::traits::{DocumentStore, StoreError};
use crate::config::DatabaseConfig;
use crate::memory::UserMemoryDocument;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

const QUERY_PATH: &str = "/query/service";
const TLS_QUERY_PORT: u16 = 18093;
const PLAIN_QUERY_PORT: u16 = 8093;
/// SQL++ "DML Error, possibly due to CAS mismatch or duplicate key".
const DUPLICATE_KEY_CODE: i64 = 12009;
const MAX_APPEND_ATTEMPTS: usize = 3;
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Fully qualified `bucket`.`scope`.`collection` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    pub bucket: String,
    pub scope: String,
    pub collection: String,
}

impl Keyspace {
    pub fn new(bucket: &str, scope: &str, collection: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            scope: scope.to_string(),
            collection: collection.to_string(),
        }
    }

    /// Escaped form usable directly in a statement.
    pub fn path(&self) -> String {
        format!(
            "{}.{}.{}",
            escape_identifier(&self.bucket),
            escape_identifier(&self.scope),
            escape_identifier(&self.collection)
        )
    }
}

impl fmt::Display for Keyspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.bucket, self.scope, self.collection)
    }
}

fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Derive the Query service endpoint from a Couchbase connection string.
///
/// `couchbases://` selects TLS on 18093, `couchbase://` plain HTTP on 8093.
/// Only the first host of a multi-host string is used and any explicit port
/// (which would be a data-service port) is dropped. An `http(s)://` string is
/// taken as the Query service base URL itself.
pub fn query_endpoint(conn_str: &str) -> Result<String, StoreError> {
    let conn_str = conn_str.trim();
    let (scheme, rest) = conn_str.split_once("://").ok_or_else(|| {
        StoreError::Connection(format!(
            "connection string '{conn_str}' has no scheme (expected couchbase:// or couchbases://)"
        ))
    })?;

    let (http_scheme, port) = match scheme {
        "couchbases" => ("https", TLS_QUERY_PORT),
        "couchbase" => ("http", PLAIN_QUERY_PORT),
        "http" | "https" => {
            return Ok(format!("{}{QUERY_PATH}", conn_str.trim_end_matches('/')));
        }
        other => {
            return Err(StoreError::Connection(format!(
                "unsupported connection string scheme '{other}'"
            )))
        }
    };

    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let first = authority.split(',').next().unwrap_or_default().trim();
    let host = if first.starts_with('[') {
        // IPv6 literal: keep the brackets, drop a trailing port.
        first.find(']').map_or(first, |end| &first[..=end])
    } else {
        first.split(':').next().unwrap_or_default()
    };

    if host.is_empty() {
        return Err(StoreError::Connection(format!(
            "connection string '{conn_str}' names no host"
        )));
    }

    Ok(format!("{http_scheme}://{host}:{port}{QUERY_PATH}"))
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    errors: Vec<QueryErrorBody>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct QueryErrorBody {
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Handle on one collection of a Couchbase cluster.
pub struct CouchbaseStore {
    client: Client,
    query_url: String,
    username: String,
    password: String,
    keyspace: Keyspace,
}

impl std::fmt::Debug for CouchbaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouchbaseStore")
            .field("query_url", &self.query_url)
            .field("username", &self.username)
            .field("keyspace", &self.keyspace)
            .finish_non_exhaustive()
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, StoreError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StoreError::Connection(format!("{name} is not set")))
}

impl CouchbaseStore {
    /// Connect to the cluster and verify that the configured keyspace exists.
    ///
    /// There is no retry: a failure here is meant to abort startup.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let conn_str = required(config.conn_str.as_deref(), "COUCHBASE_CONN_STR")?;
        let username = required(config.username.as_deref(), "COUCHBASE_USERNAME")?;
        let password = required(config.password.as_deref(), "COUCHBASE_PASSWORD")?;
        let bucket = required(config.bucket.as_deref(), "COUCHBASE_BUCKET")?;

        let query_url = match config.query_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => query_endpoint(conn_str)?,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let store = Self {
            client,
            query_url,
            username: username.to_string(),
            password: password.to_string(),
            keyspace: Keyspace::new(bucket, &config.scope, &config.collection),
        };

        store.verify_keyspace().await?;
        info!(
            bucket = %store.keyspace.bucket,
            scope = %store.keyspace.scope,
            collection = %store.keyspace.collection,
            endpoint = %store.query_url,
            "Connected to Couchbase"
        );
        Ok(store)
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }

    async fn verify_keyspace(&self) -> Result<(), StoreError> {
        let response = self
            .query(
                "SELECT RAW COUNT(*) FROM system:keyspaces \
                 WHERE `bucket` = $bucket AND `scope` = $scope AND name = $collection",
                params([
                    ("bucket", json!(self.keyspace.bucket)),
                    ("scope", json!(self.keyspace.scope)),
                    ("collection", json!(self.keyspace.collection)),
                ]),
            )
            .await?;

        let count = response
            .results
            .first()
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if count == 0 {
            return Err(StoreError::KeyspaceNotFound {
                keyspace: self.keyspace.to_string(),
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        statement: &str,
        mut body: Map<String, Value>,
    ) -> Result<QueryResponse, StoreError> {
        body.insert("statement".into(), Value::String(statement.to_string()));

        let response = self
            .client
            .post(&self.query_url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    StoreError::Connection(e.to_string())
                } else {
                    StoreError::Http(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Auth {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let parsed: QueryResponse =
            serde_json::from_str(&text).map_err(|_| StoreError::Query {
                code: i64::from(status.as_u16()),
                message: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            })?;

        if let Some(error) = parsed.errors.first() {
            return Err(StoreError::Query {
                code: error.code,
                message: error.msg.clone(),
            });
        }
        if !status.is_success() {
            return Err(StoreError::Query {
                code: i64::from(status.as_u16()),
                message: format!("query service returned status '{}'", parsed.status),
            });
        }

        debug!(statement, results = parsed.results.len(), "Query completed");
        Ok(parsed)
    }
}

/// Build a named-parameter map; the Query service expects `$`-prefixed keys.
fn params<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(name, value)| (format!("${name}"), value))
        .collect()
}

#[async_trait]
impl DocumentStore for CouchbaseStore {
    fn name(&self) -> &str {
        "couchbase"
    }

    async fn get(&self, key: &str) -> Result<Option<UserMemoryDocument>, StoreError> {
        let statement = format!(
            "SELECT RAW d FROM {} AS d USE KEYS $key",
            self.keyspace.path()
        );
        let response = self.query(&statement, params([("key", json!(key))])).await?;

        let Some(value) = response.results.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn upsert(&self, key: &str, document: &UserMemoryDocument) -> Result<(), StoreError> {
        let statement = format!(
            "UPSERT INTO {} (KEY, VALUE) VALUES ($key, $doc)",
            self.keyspace.path()
        );
        let doc = serde_json::to_value(document)?;
        self.query(&statement, params([("key", json!(key)), ("doc", doc)]))
            .await?;
        Ok(())
    }

    async fn append(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<String>, StoreError> {
        let keyspace = self.keyspace.path();
        let field_path = format!("d.{}", escape_identifier(field));
        let update = format!(
            "UPDATE {keyspace} AS d USE KEYS $key \
             SET {field_path} = ARRAY_APPEND(IFMISSINGORNULL({field_path}, []), $value) \
             RETURNING RAW {field_path}"
        );
        let insert = format!("INSERT INTO {keyspace} (KEY, VALUE) VALUES ($key, $doc)");

        for attempt in 1..=MAX_APPEND_ATTEMPTS {
            let response = self
                .query(
                    &update,
                    params([("key", json!(key)), ("value", json!(value))]),
                )
                .await?;
            if let Some(entries) = response.results.into_iter().next() {
                return Ok(serde_json::from_value(entries)?);
            }

            // No document yet: create it holding just this entry.
            let mut document = UserMemoryDocument::new();
            let entries = document.append(field, value).to_vec();
            let doc = serde_json::to_value(&document)?;
            match self
                .query(&insert, params([("key", json!(key)), ("doc", doc)]))
                .await
            {
                Ok(_) => return Ok(entries),
                Err(StoreError::Query { code, .. }) if code == DUPLICATE_KEY_CODE => {
                    debug!(key, attempt, "Document created concurrently, retrying append");
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::Conflict(key.to_string()))
    }

    async fn health_check(&self) -> bool {
        self.query("SELECT RAW 1", Map::new()).await.is_ok()
    }
}
