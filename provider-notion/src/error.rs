//! Error types for the Notion provider

use bridge_traits::error::BridgeError;
use bridge_traits::http::HttpResponse;
use thiserror::Error;

use crate::types::NotionErrorBody;

/// Notion provider errors
#[derive(Error, Debug)]
pub enum NotionError {
    /// Token rejected by the API
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error object
    #[error("Notion API error (status {status_code}, {code}): {message}")]
    ApiError {
        status_code: u16,
        code: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Notion operations
pub type Result<T> = std::result::Result<T, NotionError>;

impl NotionError {
    /// Classify a non-2xx response
    pub fn from_response(response: &HttpResponse) -> Self {
        let body: NotionErrorBody = response.json().unwrap_or_default();
        let message = if body.message.is_empty() {
            response
                .text()
                .unwrap_or_else(|_| "<binary body>".to_string())
        } else {
            body.message
        };

        match response.status {
            401 => NotionError::AuthenticationFailed(message),
            429 => NotionError::RateLimitExceeded {
                retry_after_seconds: response
                    .headers
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
                    .and_then(|(_, value)| value.trim().parse().ok())
                    .unwrap_or(1),
            },
            status => NotionError::ApiError {
                status_code: status,
                code: if body.code.is_empty() {
                    "unknown".to_string()
                } else {
                    body.code
                },
                message,
            },
        }
    }
}

impl From<NotionError> for BridgeError {
    fn from(error: NotionError) -> Self {
        match error {
            NotionError::AuthenticationFailed(msg) => {
                BridgeError::OperationFailed(format!("Authentication failed: {}", msg))
            }
            NotionError::ApiError {
                status_code,
                code,
                message,
            } => BridgeError::OperationFailed(format!(
                "API error (status {}, {}): {}",
                status_code, code, message
            )),
            NotionError::RateLimitExceeded {
                retry_after_seconds,
            } => BridgeError::OperationFailed(format!(
                "Rate limit exceeded, retry after {} seconds",
                retry_after_seconds
            )),
            NotionError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            NotionError::NetworkError(msg) => {
                BridgeError::OperationFailed(format!("Network error: {}", msg))
            }
            NotionError::BridgeError(e) => e,
        }
    }
}
