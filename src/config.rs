use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Connection settings for the graph database driver.
///
/// The physical handle is opened lazily on first use unless `eager` is set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Driver endpoint, e.g. `bolt://localhost:7687`
    pub uri: String,

    pub username: String,

    pub password: String,

    /// Target database name (empty string selects the driver default)
    pub database: String,

    /// Open the physical connection at construction time instead of on
    /// first statement
    pub eager: bool,

    /// Maximum retained entries in the per-connection query log
    pub query_log_limit: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: String::new(),
            database: String::new(),
            eager: false,
            query_log_limit: 100,
        }
    }
}

impl ConnectionConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            uri: env::var("CYPHERQUILL_URI")
                .unwrap_or_else(|_| "bolt://localhost:7687".to_string()),
            username: env::var("CYPHERQUILL_USER").unwrap_or_else(|_| "neo4j".to_string()),
            password: env::var("CYPHERQUILL_PASSWORD").unwrap_or_default(),
            database: env::var("CYPHERQUILL_DATABASE").unwrap_or_default(),
            eager: parse_env_var("CYPHERQUILL_EAGER", "false")?,
            query_log_limit: parse_env_var("CYPHERQUILL_QUERY_LOG_LIMIT", "100")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.is_empty() {
            return Err(ConfigError::Invalid {
                field: "uri".to_string(),
                reason: "connection URI cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Compiler settings, threaded explicitly through every compile entry point.
///
/// Naming-convention and batching decisions live here instead of in ambient
/// process-wide state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Row threshold above which multi-row CREATE statements are chunked
    /// into multiple UNWIND batches
    pub batch_size: usize,

    /// Emit DETACH DELETE (remove relationships along with the node) for
    /// delete statements
    pub detach_delete: bool,

    /// Relationships whose descriptor carries an edge type traverse a typed
    /// graph edge instead of matching the pivot node
    pub prefer_native_edges: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            detach_delete: true,
            prefer_native_edges: true,
        }
    }
}

impl CompilerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            batch_size: parse_env_var("CYPHERQUILL_BATCH_SIZE", "500")?,
            detach_delete: parse_env_var("CYPHERQUILL_DETACH_DELETE", "true")?,
            prefer_native_edges: parse_env_var("CYPHERQUILL_NATIVE_EDGES", "true")?,
        })
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
