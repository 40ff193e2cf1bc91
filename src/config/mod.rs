pub mod schema;

pub use schema::{
    state_dir, AgentConfig, Config, ConfigError, DatabaseBackend, DatabaseConfig,
    ObservabilityConfig, ReliabilityConfig, WriteMode,
};
