//! Error types for pikpak-relay
//!
//! This module provides error handling for the relay, including:
//! - Domain-specific error types (authentication, folder resolution, submission)
//! - HTTP status code mapping for the Slack events endpoint
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pikpak-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pikpak-relay
///
/// Per-link errors (`Resolution`, `Submission`) are caught by the relay and turned
/// into a failed report line for that link; only `Auth` at startup is fatal.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "PIKPAK_USERNAME")
        key: Option<String>,
    },

    /// Authentication with the remote drive failed
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Destination folder could not be resolved
    #[error("folder resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Offline download could not be submitted
    #[error("submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// The remote drive answered with a non-success status
    #[error("remote service returned HTTP {status}: {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Error text reported by the service (or the raw body)
        message: String,
    },

    /// Chat platform rejected a request
    #[error("chat error: {0}")]
    Chat(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Authentication errors against the drive's user endpoints
#[derive(Debug, Error)]
pub enum AuthError {
    /// The service rejected the identity or refresh token
    #[error("credentials rejected (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status returned by the auth endpoint
        status: u16,
        /// Error text reported by the service
        message: String,
    },

    /// The auth endpoint could not be reached or returned garbage
    #[error("auth request failed: {0}")]
    Network(String),

    /// A request was attempted before `login()` succeeded
    #[error("not logged in")]
    NotLoggedIn,

    /// The request was still unauthorized after a credential refresh
    #[error("request unauthorized after credential refresh")]
    Unauthorized,
}

/// Failure while walking or creating the destination folder path
#[derive(Debug, Error)]
#[error("cannot resolve folder segment '{segment}': {cause}")]
pub struct ResolutionError {
    /// The path segment being resolved when the failure happened
    pub segment: String,
    /// Underlying failure
    pub cause: Box<Error>,
}

/// Failure submitting a link as an offline download
#[derive(Debug, Error)]
#[error("cannot submit {link}: {cause}")]
pub struct SubmissionError {
    /// The link that was being submitted
    pub link: String,
    /// Underlying failure
    pub cause: Box<Error>,
}

/// Standardized API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_signature",
///     "message": "Slack signature mismatch"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_signature", "bad_request")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "bad request" error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::Serialization(_) => 400,

            Error::Auth(_) => 502,
            Error::Resolution(_) => 502,
            Error::Submission(_) => 502,
            Error::Remote { .. } => 502,
            Error::Chat(_) => 502,
            Error::Network(_) => 502,

            Error::Io(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Auth(e) => match e {
                AuthError::Rejected { .. } => "auth_rejected",
                AuthError::Network(_) => "auth_network_error",
                AuthError::NotLoggedIn => "not_logged_in",
                AuthError::Unauthorized => "unauthorized",
            },
            Error::Resolution(_) => "resolution_error",
            Error::Submission(_) => "submission_error",
            Error::Remote { .. } => "remote_error",
            Error::Chat(_) => "chat_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Remote { status, .. } => Some(serde_json::json!({ "status": status })),
            Error::Submission(SubmissionError { link, .. }) => {
                Some(serde_json::json!({ "link": link }))
            }
            Error::Resolution(ResolutionError { segment, .. }) => {
                Some(serde_json::json!({ "segment": segment }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
