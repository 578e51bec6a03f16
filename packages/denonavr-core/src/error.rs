//! Centralized error types for the receiver client.
//!
//! Every fallible operation returns an [`AvrResult`]. Apart from
//! [`AvrError::Configuration`], all errors are recoverable: the client keeps
//! its last-known-good state and the next poll may succeed.

use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and events.
    fn code(&self) -> &'static str;
}

/// Errors produced while talking to a receiver.
#[derive(Debug, Error)]
pub enum AvrError {
    /// The request could not be sent or the response could not be read
    /// (connection refused, DNS failure, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The status poll returned a non-200 status.
    #[error("status poll returned HTTP {0}")]
    HttpStatus(u16),

    /// The status document did not have the expected shape.
    #[error("failed to parse status response: {0}")]
    Parse(String),

    /// A command GET returned a non-200 status.
    #[error("command rejected with HTTP {0}")]
    CommandRejected(u16),

    /// A command addressed a zone the client has never observed.
    #[error("unknown zone {0}")]
    UnknownZone(u32),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenient Result alias for receiver operations.
pub type AvrResult<T> = Result<T, AvrError>;

impl AvrError {
    /// Returns true if the client stays usable after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }

    /// Returns true for request timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

impl ErrorCode for AvrError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(e) if e.is_timeout() => "http_timeout",
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_) => "http_error_status",
            Self::Parse(_) => "status_parse_error",
            Self::CommandRejected(_) => "command_rejected",
            Self::UnknownZone(_) => "unknown_zone",
            Self::Configuration(_) => "configuration_error",
        }
    }
}
