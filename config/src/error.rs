//! Error types for loading dispatcher configuration.

use command_signature_core::RegistryError;
use thiserror::Error;

/// Errors that can occur while loading a configuration or building a
/// dispatcher from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A custom type's pattern is not a valid regular expression.
    #[error("invalid pattern for type '{symbol}': {source}")]
    InvalidPattern {
        symbol: String,
        #[source]
        source: regex::Error,
    },

    /// Registering a type or command failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
