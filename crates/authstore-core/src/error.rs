//! Store error types.
//!
//! Absence is never an error: every lookup returns `Ok(None)` when nothing
//! matches. The variants below cover the failures a caller has to tell apart.

use std::fmt;

use crate::codec::CodecError;

/// Errors that can occur during authorization-state store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A save would duplicate a unique value (client identifier, token value,
    /// consent key). The offending value is never included.
    #[error("Uniqueness violation: {entity}.{field} already in use")]
    UniquenessViolation {
        /// Entity the write targeted.
        entity: String,
        /// Unique field that collided.
        field: String,
    },

    /// Encoding or decoding of structured attribute data failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Transient backend failure; the caller decides whether to retry.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The record is malformed (empty id, empty principal name, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Non-transient backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Create a `UniquenessViolation` error.
    #[must_use]
    pub fn uniqueness(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UniquenessViolation {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create a `StorageUnavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable(message.into())
    }

    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a uniqueness violation.
    #[must_use]
    pub fn is_uniqueness_violation(&self) -> bool {
        matches!(self, Self::UniquenessViolation { .. })
    }

    /// Returns `true` if this is a codec error.
    #[must_use]
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Self::Codec(_))
    }

    /// Returns `true` if this is an invalid input error.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Returns `true` if the failure is transient and the operation may be
    /// retried by the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UniquenessViolation { .. } => ErrorCategory::Conflict,
            Self::Codec(_) => ErrorCategory::Codec,
            Self::StorageUnavailable(_) => ErrorCategory::Infrastructure,
            Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::Backend(_) => ErrorCategory::Internal,
        }
    }
}

/// Categories of store errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unique value already taken.
    Conflict,
    /// Corrupt or unsupported attribute data.
    Codec,
    /// Rejected input.
    Validation,
    /// Connection or pool failure.
    Infrastructure,
    /// Anything else coming from the backend.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Codec => write!(f, "codec"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniqueness_display_hides_value() {
        let err = StoreError::uniqueness("authorization", "access_token");
        assert_eq!(
            err.to_string(),
            "Uniqueness violation: authorization.access_token already in use"
        );
        assert!(err.is_uniqueness_violation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unavailable_is_retryable() {
        let err = StoreError::unavailable("pool timed out");
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Infrastructure);
    }

    #[test]
    fn test_codec_error_conversion() {
        let err = StoreError::from(CodecError::Unsupported("null".into()));
        assert!(err.is_codec_error());
        assert_eq!(err.category(), ErrorCategory::Codec);
        assert_eq!(err.category().to_string(), "codec");
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StoreError::invalid_input("empty id").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            StoreError::backend("syntax error").category(),
            ErrorCategory::Internal
        );
    }
}
