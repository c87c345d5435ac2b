//! Standardized mapping of reqwest failures and HTTP statuses to `PullerError`

use crate::error::PullerError;
use reqwest::StatusCode;

/// Maximum number of response-body bytes quoted in an error message
const MAX_ERROR_BODY: usize = 256;

/// Standard error handler for HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Handle registry-related HTTP errors (manifests, blobs)
    pub fn handle_registry_error(
        status: StatusCode,
        error_text: &str,
        operation: &str,
    ) -> PullerError {
        let error_text = truncate(error_text);
        let message = match status.as_u16() {
            401 => format!("Unauthorized to perform {}: {}", operation, error_text),
            403 => format!(
                "Forbidden: insufficient permissions for {}: {}",
                operation, error_text
            ),
            404 => format!("Resource not found for {}: {}", operation, error_text),
            429 => format!("Rate limited during {}: {}", operation, error_text),
            500 => format!("Registry server error during {}: {}", operation, error_text),
            502..=504 => format!("Registry unavailable for {}: {}", operation, error_text),
            _ => format!("{} failed (status {}): {}", operation, status, error_text),
        };

        PullerError::Registry { status, message }
    }

    /// Handle token-issuer HTTP errors
    pub fn handle_auth_error(status: StatusCode, error_text: &str) -> PullerError {
        let message = match status.as_u16() {
            400 => "Invalid token request parameters".to_string(),
            401 => "Token issuer rejected anonymous access".to_string(),
            403 => "Access denied - insufficient permissions".to_string(),
            404 => "Authentication endpoint not found".to_string(),
            _ => format!(
                "Token request failed (status {}): {}",
                status,
                truncate(error_text)
            ),
        };

        PullerError::Auth(message)
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> PullerError {
        if error.is_timeout() {
            PullerError::Timeout(format!("{} timed out: {}", context, error))
        } else if error.is_connect() {
            PullerError::Network(format!("Connection error during {}: {}", context, error))
        } else if error.is_decode() {
            PullerError::Parse(format!("Failed to decode {} response: {}", context, error))
        } else if error.is_builder() {
            PullerError::Config(format!("Invalid {} request: {}", context, error))
        } else {
            PullerError::Network(format!("{} network error: {}", context, error))
        }
    }
}

fn truncate(text: &str) -> &str {
    let text = text.trim();
    if text.len() <= MAX_ERROR_BODY {
        return text;
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
