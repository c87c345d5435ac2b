//! Error types and handlers for registry pull operations

pub mod handlers;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PullerError>;

#[derive(Debug, Error)]
pub enum PullerError {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),
    /// Invalid command-line input
    #[error("Validation error: {0}")]
    Validation(String),
    /// File IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Input line that is not `repository:tag`
    #[error("Invalid argument. Expected image:tag. Got: {0:?}")]
    InvalidReference(String),
    /// Connection, DNS or TLS failures
    #[error("Network error: {0}")]
    Network(String),
    /// Request exceeded its per-attempt deadline
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Registry answered with a non-200 status
    #[error("Registry error ({status}): {message}")]
    Registry { status: StatusCode, message: String },
    /// Token issuer refused or returned an unusable answer
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Unexpected response body
    #[error("Parse error: {0}")]
    Parse(String),
}

impl PullerError {
    /// Setup errors terminate the process; everything else is scoped to one image.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PullerError::Config(_)
                | PullerError::Validation(_)
                | PullerError::Io(_)
                | PullerError::InvalidReference(_)
        )
    }

    /// HTTP status carried by the error, if the registry produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PullerError::Registry { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PullerError {
    fn from(err: serde_json::Error) -> Self {
        PullerError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for PullerError {
    fn from(err: reqwest::Error) -> Self {
        handlers::NetworkErrorHandler::handle_network_error(&err, "request")
    }
}

impl From<url::ParseError> for PullerError {
    fn from(err: url::ParseError) -> Self {
        PullerError::Config(format!("invalid URL: {}", err))
    }
}
