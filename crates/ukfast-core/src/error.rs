//! Error types for UKFast API operations.
//!
//! Every failure surfaced by the clients falls into one of the kinds in
//! [`ErrorKind`]: local validation, transport, decoding, or a non-success
//! HTTP status. Nothing is retried or swallowed by this crate.

use thiserror::Error;

/// Main error type for UKFast API operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required input was empty or failed a local format check.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The transport could not complete the call.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport gave up waiting for a response.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A response body could not be parsed as the expected envelope.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The API answered with a non-success status.
    #[error("API returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected locally before any network call.
    Validation,
    /// Network failure, timeout, or malformed endpoint.
    Transport,
    /// Response body was not the expected structure.
    Decode,
    /// Response carried a non-success status.
    Status,
    /// Client misconfiguration.
    Config,
}

/// Specialized result type for UKFast API operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport(_) | Self::Timeout(_) | Self::InvalidEndpoint(_) => {
                ErrorKind::Transport
            }
            Self::Decode(_) => ErrorKind::Decode,
            Self::Status { .. } => ErrorKind::Status,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Status { .. } => "STATUS_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
        }
    }

    /// HTTP status carried by a [`Error::Status`], if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Shorthand for building a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Config(err.to_string())
    }
}
