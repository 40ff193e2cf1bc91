use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_COUCHBASE_CONN_STR: &str = "COUCHBASE_CONN_STR";
pub const ENV_COUCHBASE_USERNAME: &str = "COUCHBASE_USERNAME";
pub const ENV_COUCHBASE_PASSWORD: &str = "COUCHBASE_PASSWORD";
pub const ENV_COUCHBASE_BUCKET: &str = "COUCHBASE_BUCKET";
/// Optional: overrides `database.backend`.
pub const ENV_BACKEND: &str = "MEMORY_AGENT_BACKEND";

/// Value shipped in `.env` templates; treated as unset.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_GOOGLE_API_KEY_HERE";

/// Errors raised while loading or validating configuration. All are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown database backend '{0}' (expected couchbase, sqlite or memory)")]
    UnknownBackend(String),
}

/// Top-level configuration.
///
/// Loaded from an optional TOML file, then overlaid with environment
/// variables. Secrets are normally supplied through the environment only.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// File the configuration was read from, if any
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Gemini API key (`GOOGLE_API_KEY`)
    #[serde(skip)]
    pub google_api_key: Option<String>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let api_key = self.google_api_key.as_ref().map(|_| "***");
        f.debug_struct("Config")
            .field("config_path", &self.config_path)
            .field("google_api_key", &api_key)
            .field("agent", &self.agent)
            .field("database", &self.database)
            .field("reliability", &self.reliability)
            .field("observability", &self.observability)
            .finish()
    }
}

// ── Agent ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Application name used to scope sessions
    pub app_name: String,
    /// Agent name, shown to the model and in logs
    pub name: String,
    pub description: String,
    /// System instruction; the built-in memory instruction is used when unset
    pub instruction: Option<String>,
    /// LLM provider ("gemini")
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    /// Maximum model round-trips per user message
    pub max_tool_iterations: usize,
    /// User whose memory the tools read and write
    pub user_id: String,
    pub session_id: String,
    /// Register the example business-logic tool
    pub example_tool: bool,
    /// Override for the provider's API base URL
    pub api_base_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app_name: "memory_agent_starter".into(),
            name: "memory_agent_starter".into(),
            description: "A helpful AI assistant with persistent memory capabilities.".into(),
            instruction: None,
            provider: "gemini".into(),
            model: "gemini-2.5-flash".into(),
            temperature: 0.7,
            max_tool_iterations: 8,
            user_id: "user_001".into(),
            session_id: "session_001".into(),
            example_tool: true,
            api_base_url: None,
        }
    }
}

// ── Database ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    #[default]
    Couchbase,
    Sqlite,
    Memory,
}

impl std::str::FromStr for DatabaseBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "couchbase" => Ok(Self::Couchbase),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Couchbase => write!(f, "couchbase"),
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// How a save reaches the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Read the document, append locally, write it back. Last writer wins.
    #[default]
    ReadModifyWrite,
    /// Server-side append; concurrent saves are never lost.
    Atomic,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    /// `COUCHBASE_CONN_STR`, e.g. `couchbases://cb.xxxx.cloud.couchbase.com`
    pub conn_str: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub bucket: Option<String>,
    pub scope: String,
    pub collection: String,
    /// Explicit Query service URL; derived from `conn_str` when unset
    pub query_url: Option<String>,
    pub timeout_secs: u64,
    /// SQLite file for the `sqlite` backend
    pub sqlite_path: Option<PathBuf>,
    pub write_mode: WriteMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Couchbase,
            conn_str: None,
            username: None,
            password: None,
            bucket: None,
            scope: "agent".into(),
            collection: "memory".into(),
            query_url: None,
            timeout_secs: 30,
            sqlite_path: None,
            write_mode: WriteMode::ReadModifyWrite,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("conn_str", &self.conn_str)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("bucket", &self.bucket)
            .field("scope", &self.scope)
            .field("collection", &self.collection)
            .field("query_url", &self.query_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("sqlite_path", &self.sqlite_path)
            .field("write_mode", &self.write_mode)
            .finish()
    }
}

impl DatabaseConfig {
    /// SQLite file to open, defaulting to `~/.memory-agent/memory.db`.
    pub fn sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| state_dir().join("memory.db"))
    }
}

// ── Reliability / observability ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    /// Extra attempts for transient LLM provider failures
    pub provider_retries: u32,
    /// Backoff before the first retry; doubles each attempt
    pub provider_backoff_ms: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            provider_retries: 2,
            provider_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// "log" or "none"
    pub backend: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: "log".into(),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────

/// `~/.memory-agent`, or `.memory-agent` when no home directory is known.
pub fn state_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".memory-agent"),
        |dirs| dirs.home_dir().join(".memory-agent"),
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn default_path() -> PathBuf {
        state_dir().join("config.toml")
    }

    /// Load configuration from `path` (or the default location) and the process
    /// environment. A missing default file is fine; a missing explicit file is not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        let mut config = if explicit || path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let mut config = Self::from_toml(&raw)?;
            config.config_path = Some(path);
            config
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` in
    /// production and a map in tests. Blank values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| non_blank(lookup(name));

        if let Some(key) = get(ENV_GOOGLE_API_KEY) {
            self.google_api_key = Some(key);
        }
        if let Some(backend) = get(ENV_BACKEND) {
            self.database.backend = backend.parse()?;
        }

        let db = &mut self.database;
        for (name, slot) in [
            (ENV_COUCHBASE_CONN_STR, &mut db.conn_str),
            (ENV_COUCHBASE_USERNAME, &mut db.username),
            (ENV_COUCHBASE_PASSWORD, &mut db.password),
            (ENV_COUCHBASE_BUCKET, &mut db.bucket),
        ] {
            if let Some(value) = get(name) {
                *slot = Some(value);
            }
        }
        Ok(())
    }

    /// Check that every required value is present, reporting all missing ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();

        let api_key_ok = self
            .google_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty() && key != PLACEHOLDER_API_KEY);
        if !api_key_ok {
            missing.push(ENV_GOOGLE_API_KEY);
        }

        if self.database.backend == DatabaseBackend::Couchbase {
            let db = &self.database;
            for (name, value) in [
                (ENV_COUCHBASE_CONN_STR, &db.conn_str),
                (ENV_COUCHBASE_USERNAME, &db.username),
                (ENV_COUCHBASE_PASSWORD, &db.password),
                (ENV_COUCHBASE_BUCKET, &db.bucket),
            ] {
                if non_blank(value.clone()).is_none() {
                    missing.push(name);
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}
