//! Error types and handling for FoldVault
//!
//! This module provides the error taxonomy shared by every FoldVault crate.
//! Per-strategy failures are recovered inside the selector and never reach a
//! caller; storage, version, strategy-registry and integrity failures propagate.

// Serde is imported conditionally through cfg_attr

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - operation can continue
    Low,
    /// Medium severity - operation should be retried
    Medium,
    /// High severity - operation should be aborted
    High,
    /// Critical severity - stored data is suspect and must be quarantined
    Critical,
}

/// Main error type for FoldVault operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// Malformed call arguments
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the rejected argument
        message: String,
    },

    /// A codec failed its round-trip self-check
    #[error("Strategy '{strategy_id}' failed: {message}")]
    StrategyFailure {
        /// Tag of the failing strategy
        strategy_id: String,
        /// What went wrong
        message: String,
    },

    /// Reconstructed content does not match the stored integrity hash
    #[error("Integrity check failed for record {record_id}: {message}")]
    Integrity {
        /// Record whose payload is corrupt
        record_id: String,
        /// Details of the mismatch
        message: String,
    },

    /// Record does not exist
    #[error("Record not found: {record_id}")]
    NotFound {
        /// Identifier that was looked up
        record_id: String,
    },

    /// Persisted record carries a format version this build cannot read
    #[error("Unsupported record format version {version}")]
    UnsupportedVersion {
        /// Version found in the record header
        version: u16,
    },

    /// Pipeline trace references a strategy missing from the registry
    #[error("Unsupported strategy '{strategy_id}' in pipeline trace")]
    UnsupportedStrategy {
        /// Strategy tag found in the trace
        strategy_id: String,
    },

    /// Authorization collaborator refused access
    #[error("Permission denied for '{principal}' on record {record_id}")]
    PermissionDenied {
        /// Requesting principal
        principal: String,
        /// Record the principal asked for
        record_id: String,
    },

    /// Durable storage collaborator failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message from the backend
        message: String,
    },

    /// Record or snapshot (de)serialization failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message from the codec
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Argument validation
    Validation,
    /// Codec self-check failure
    Strategy,
    /// Hash mismatch on read
    Integrity,
    /// Missing record
    NotFound,
    /// Unknown record or strategy format
    Unsupported,
    /// Authorization refusal
    Permission,
    /// Storage backend errors
    Storage,
    /// Encoding of records and snapshots
    Serialization,
    /// Configuration errors
    Config,
    /// I/O related errors
    Io,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::StrategyFailure { .. } => ErrorKind::Strategy,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UnsupportedVersion { .. } | Self::UnsupportedStrategy { .. } => {
                ErrorKind::Unsupported
            }
            Self::PermissionDenied { .. } => ErrorKind::Permission,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io { .. } => ErrorKind::Io,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation { .. } => ErrorSeverity::Low,
            Self::StrategyFailure { .. } => ErrorSeverity::Low,
            Self::Integrity { .. } => ErrorSeverity::Critical,
            Self::NotFound { .. } => ErrorSeverity::Medium,
            Self::UnsupportedVersion { .. } | Self::UnsupportedStrategy { .. } => {
                ErrorSeverity::High
            }
            Self::PermissionDenied { .. } => ErrorSeverity::High,
            Self::Storage { .. } => ErrorSeverity::Medium,
            Self::Serialization { .. } => ErrorSeverity::High,
            Self::Config { .. } => ErrorSeverity::High,
            Self::Io { .. } => ErrorSeverity::Medium,
            Self::Other { .. } => ErrorSeverity::Medium,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io { message } | Self::Storage { message } => {
                message.contains("Interrupted")
                    || message.contains("WouldBlock")
                    || message.contains("TimedOut")
                    || message.contains("timed out")
            }
            Self::StrategyFailure { .. } => true,
            Self::Validation { .. }
            | Self::Integrity { .. }
            | Self::NotFound { .. }
            | Self::UnsupportedVersion { .. }
            | Self::UnsupportedStrategy { .. }
            | Self::PermissionDenied { .. }
            | Self::Serialization { .. }
            | Self::Config { .. } => false,
            Self::Other { .. } => true,
        }
    }

    /// Check if this error should trigger a retry
    pub fn should_retry(&self) -> bool {
        self.is_recoverable() && self.severity() <= ErrorSeverity::Medium
    }

    /// Check if the record behind this error should be quarantined
    pub fn requires_quarantine(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new strategy failure
    pub fn strategy_failure<S: Into<String>, M: Into<String>>(strategy_id: S, message: M) -> Self {
        Self::StrategyFailure {
            strategy_id: strategy_id.into(),
            message: message.into(),
        }
    }

    /// Create a new integrity error
    pub fn integrity<S: Into<String>, M: Into<String>>(record_id: S, message: M) -> Self {
        Self::Integrity {
            record_id: record_id.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(record_id: S) -> Self {
        Self::NotFound {
            record_id: record_id.into(),
        }
    }

    /// Create a new unsupported strategy error
    pub fn unsupported_strategy<S: Into<String>>(strategy_id: S) -> Self {
        Self::UnsupportedStrategy {
            strategy_id: strategy_id.into(),
        }
    }

    /// Create a new permission error
    pub fn permission_denied<S: Into<String>, R: Into<String>>(principal: S, record_id: R) -> Self {
        Self::PermissionDenied {
            principal: principal.into(),
            record_id: record_id.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_error_severity_consistency(message in ".*") {
            let errors = vec![
                Error::Validation { message: message.clone() },
                Error::Storage { message: message.clone() },
                Error::Serialization { message: message.clone() },
                Error::Config { message: message.clone() },
                Error::Io { message: message.clone() },
                Error::Other { message: message.clone() },
            ];

            for error in errors {
                let kind = error.kind();
                match error {
                    Error::Validation { .. } => prop_assert_eq!(kind, ErrorKind::Validation),
                    Error::Storage { .. } => prop_assert_eq!(kind, ErrorKind::Storage),
                    Error::Serialization { .. } => prop_assert_eq!(kind, ErrorKind::Serialization),
                    Error::Config { .. } => prop_assert_eq!(kind, ErrorKind::Config),
                    Error::Io { .. } => prop_assert_eq!(kind, ErrorKind::Io),
                    Error::Other { .. } => prop_assert_eq!(kind, ErrorKind::Other),
                    _ => {}
                }
            }
        }

        #[test]
        fn test_retry_implies_recoverable(message in ".*") {
            let error = Error::Storage { message };
            if error.should_retry() {
                prop_assert!(error.is_recoverable());
                prop_assert!(error.severity() <= ErrorSeverity::Medium);
            }
        }
    }

    #[test]
    fn test_integrity_error_is_fatal() {
        let error = Error::integrity("rec-1", "hash mismatch");

        assert_eq!(error.kind(), ErrorKind::Integrity);
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert!(!error.is_recoverable());
        assert!(!error.should_retry());
        assert!(error.requires_quarantine());
        assert!(error.to_string().contains("rec-1"));
    }

    #[test]
    fn test_unsupported_errors_fail_closed() {
        let version = Error::UnsupportedVersion { version: 9 };
        let strategy = Error::unsupported_strategy("fractal");

        assert_eq!(version.kind(), ErrorKind::Unsupported);
        assert_eq!(strategy.kind(), ErrorKind::Unsupported);
        assert!(!version.is_recoverable());
        assert!(!strategy.is_recoverable());
        assert!(strategy.to_string().contains("fractal"));
    }

    #[test]
    fn test_strategy_failure_is_recoverable() {
        let error = Error::strategy_failure("rle", "round trip mismatch");

        assert_eq!(error.kind(), ErrorKind::Strategy);
        assert!(error.is_recoverable());
        assert!(error.should_retry());
        assert!(!error.requires_quarantine());
    }

    #[test]
    fn test_storage_error_recoverability() {
        assert!(Error::storage("Operation timed out").should_retry());
        assert!(!Error::storage("disk full").is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "vault file");
        let error = Error::from(io_error);

        assert_eq!(error.kind(), ErrorKind::Io);
        assert_eq!(error.severity(), ErrorSeverity::Medium);
        assert!(error.to_string().contains("vault file"));
    }

    #[test]
    fn test_io_constructor() {
        let error = Error::io("Failed to read 'patterns.bin'");

        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(!error.requires_quarantine());
        assert_eq!(error.to_string(), "I/O error: Failed to read 'patterns.bin'");
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Low < ErrorSeverity::Medium);
        assert!(ErrorSeverity::Medium < ErrorSeverity::High);
        assert!(ErrorSeverity::High < ErrorSeverity::Critical);
    }
}
