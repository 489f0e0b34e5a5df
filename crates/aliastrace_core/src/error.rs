//! Core error types for ALIASTRACE.
//!
//! Every variant is fatal: a replay that hits one of these must discard
//! whatever it had built so far.

use std::path::PathBuf;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Log file does not exist or cannot be opened
    #[error("Missing log file {}: {reason}", path.display())]
    MissingLogFile {
        /// Path that was requested
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// Unknown tag, truncated record or size mismatch
    #[error("Corrupt log at byte {offset}: {reason}")]
    CorruptLog {
        /// Byte offset of the offending record
        offset: u64,
        /// What was wrong with it
        reason: String,
    },

    /// Address-space or pointer-state bookkeeping contradiction
    #[error("Invariant violation: {reason}")]
    InvariantViolation {
        /// Description of the broken invariant
        reason: String,
    },

    /// The global version counter ran into the reserved unknown version
    #[error("Version counter overflow")]
    VersionCounterOverflow,

    /// Program metadata could not be parsed or is inconsistent
    #[error("Invalid program metadata: {reason}")]
    InvalidMetadata {
        /// Parse or consistency failure
        reason: String,
    },
}

impl CoreError {
    /// Shorthand for a corrupt-log error
    pub fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Self::CorruptLog {
            offset,
            reason: reason.into(),
        }
    }

    /// Shorthand for an invariant violation
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMetadata {
            reason: err.to_string(),
        }
    }
}
