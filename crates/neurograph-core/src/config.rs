//! NeuroGraph configuration management
//!
//! Handles configuration from TOML files and environment variables with
//! sensible defaults for development. Environment variables take precedence
//! over file values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Active pipeline and storage configuration
///
/// Passed through the pipeline inside the document context rather than held
/// globally.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Which persistence backend to use
    pub storage_mode: StorageMode,

    /// Local file backend settings
    pub local: LocalFileConfig,

    /// Graph database backend settings
    pub database: DatabaseConfig,

    /// Triples below this confidence are dropped before persistence
    pub min_confidence_threshold: f32,

    /// Merge successive documents into one graph instead of resetting
    pub cumulative: bool,

    /// Let entities classified UNKNOWN participate in relation extraction
    pub include_unknown_entities: bool,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(mode) = std::env::var("NEUROGRAPH_STORAGE") {
            config.storage_mode = mode.parse()?;
        }
        if let Ok(dir) = std::env::var("NEUROGRAPH_OUTPUT_DIR") {
            config.local.output_dir = PathBuf::from(dir);
        }
        if let Ok(format) = std::env::var("NEUROGRAPH_FORMAT") {
            config.local.format = format.parse()?;
        }
        if let Ok(threshold) = std::env::var("NEUROGRAPH_MIN_CONFIDENCE") {
            config.min_confidence_threshold =
                threshold.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "NEUROGRAPH_MIN_CONFIDENCE".to_string(),
                    value: threshold,
                })?;
        }
        if let Ok(cumulative) = std::env::var("NEUROGRAPH_CUMULATIVE") {
            config.cumulative = cumulative == "1" || cumulative.eq_ignore_ascii_case("true");
        }

        if let Ok(url) = std::env::var("SURREALDB_URL") {
            config.database.url = url;
        }
        if let Ok(user) = std::env::var("SURREALDB_USER") {
            config.database.user = user;
        }
        if let Ok(pass) = std::env::var("SURREALDB_PASS") {
            config.database.pass = pass;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "min_confidence_threshold".to_string(),
                value: self.min_confidence_threshold.to_string(),
            });
        }
        Ok(())
    }
}

/// Persistence backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    #[default]
    LocalFile,
    GraphDatabase,
}

impl std::str::FromStr for StorageMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local_file" | "local" | "file" => Ok(Self::LocalFile),
            "graph_database" | "database" | "db" => Ok(Self::GraphDatabase),
            _ => Err(ConfigError::InvalidValue {
                key: "storage_mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Output serialization format for the local file backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(ConfigError::InvalidValue {
                key: "output_format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Local file backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFileConfig {
    /// Directory where graph files are written
    pub output_dir: PathBuf,

    /// Serialization format
    pub format: OutputFormat,
}

impl Default for LocalFileConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            format: OutputFormat::Json,
        }
    }
}

/// Graph database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SurrealDB WebSocket URL
    pub url: String,

    /// Username
    pub user: String,

    /// Password
    pub pass: String,

    /// Namespace
    pub namespace: String,

    /// Database name
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000".to_string(),
            user: "root".to_string(),
            pass: "root".to_string(),
            namespace: "neurograph".to_string(),
            database: "knowledge".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
