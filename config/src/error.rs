//! Error types for settings loading and validation.

use thiserror::Error;

/// Errors that can occur while reading or checking a settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The settings parsed but describe an unusable configuration.
    #[error("invalid settings: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// A referenced environment variable is unset or empty.
    #[error("environment variable {0} is not set")]
    MissingEnv(String),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
