//! Error types for configuration management

use foldvault_types::Error as VaultError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read or written
    #[error("I/O error on config file '{path}': {source}")]
    Io {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A section or key holds an out-of-range value
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue {
        /// Section or dotted key
        key: String,
        /// Error message
        message: String,
    },

    /// Configuration could not be rendered to a file format
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Layer merging or deserialization failed
    #[error("Configuration error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl From<config::ConfigError> for ConfigError {
    fn from(error: config::ConfigError) -> Self {
        Self::other(error.to_string())
    }
}

impl From<ConfigError> for VaultError {
    fn from(error: ConfigError) -> Self {
        VaultError::config(error.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create a new invalid value error
    pub fn invalid_value<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_into_engine_error() {
        let err: VaultError = ConfigError::invalid_value("selector.max_trials", "must be > 0").into();
        assert!(matches!(err, VaultError::Config { .. }));
        assert!(err.to_string().contains("selector.max_trials"));
    }

    #[test]
    fn test_merge_failure_is_other() {
        let err = ConfigError::from(config::ConfigError::Message("bad layer".to_string()));
        assert!(matches!(err, ConfigError::Other { .. }));
        assert_eq!(err.to_string(), "Configuration error: bad layer");
    }
}
