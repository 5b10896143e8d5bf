//! Shared error type across meterly crates.

use thiserror::Error;

/// Stable error codes (used in logs and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed metric or label name, empty help, bad descriptor.
    InvalidDescriptor,
    /// Bucket layout is not finite and strictly increasing.
    InvalidBuckets,
    /// Wrong number of label values, or unknown label name.
    InconsistentLabels,
    /// A family with this name is already registered.
    AlreadyRegistered,
    /// Counter increment that would decrease the value.
    InvalidIncrement,
    /// Sample source could not produce a value.
    Sampling,
    /// Invalid configuration.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error (encoding, io).
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidDescriptor => "INVALID_DESCRIPTOR",
            ErrorCode::InvalidBuckets => "INVALID_BUCKETS",
            ErrorCode::InconsistentLabels => "INCONSISTENT_LABELS",
            ErrorCode::AlreadyRegistered => "ALREADY_REGISTERED",
            ErrorCode::InvalidIncrement => "INVALID_INCREMENT",
            ErrorCode::Sampling => "SAMPLING",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MeterlyError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum MeterlyError {
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("invalid buckets: {0}")]
    InvalidBuckets(String),
    #[error("inconsistent labels: {0}")]
    InconsistentLabels(String),
    #[error("duplicate metric family: {0}")]
    AlreadyRegistered(String),
    #[error("counter increment must be finite and non-negative, got {0}")]
    InvalidIncrement(f64),
    #[error("sampling failed: {0}")]
    Sampling(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl MeterlyError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeterlyError::InvalidDescriptor(_) => ErrorCode::InvalidDescriptor,
            MeterlyError::InvalidBuckets(_) => ErrorCode::InvalidBuckets,
            MeterlyError::InconsistentLabels(_) => ErrorCode::InconsistentLabels,
            MeterlyError::AlreadyRegistered(_) => ErrorCode::AlreadyRegistered,
            MeterlyError::InvalidIncrement(_) => ErrorCode::InvalidIncrement,
            MeterlyError::Sampling(_) => ErrorCode::Sampling,
            MeterlyError::BadConfig(_) => ErrorCode::BadConfig,
            MeterlyError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            MeterlyError::Internal(_) => ErrorCode::Internal,
        }
    }
}
