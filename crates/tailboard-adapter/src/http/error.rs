/*
[INPUT]:  Error sources (HTTP, API status, serialization, URL)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the tailboard adapter
#[derive(Error, Debug)]
pub enum TailboardError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TailboardError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            TailboardError::Http(_)
            | TailboardError::Serialization(_)
            | TailboardError::InvalidResponse(_) => true,
            TailboardError::Api { code, .. } => *code == 429 || *code >= 500,
            TailboardError::UrlParse(_) | TailboardError::Config(_) => false,
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        TailboardError::Api {
            code: status.as_u16() as i32,
            message: message.into(),
        }
    }
}

/// Result type alias for tailboard operations
pub type Result<T> = std::result::Result<T, TailboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let server_err = TailboardError::api_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(server_err.is_retryable());

        let not_found = TailboardError::api_error(StatusCode::NOT_FOUND, "no topic");
        assert!(!not_found.is_retryable());

        let config_err = TailboardError::Config("missing base url".to_string());
        assert!(!config_err.is_retryable());
    }

    #[test]
    fn test_api_error_creation() {
        let err = TailboardError::api_error(StatusCode::BAD_REQUEST, "Invalid topic");
        match err {
            TailboardError::Api { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message, "Invalid topic");
            }
            _ => panic!("Expected Api error variant"),
        }
    }
}
