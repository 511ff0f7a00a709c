//! Error types for the Logsift client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to an upstream log API
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
            || matches!(self, Self::RequestFailed(e) if e.status() == Some(reqwest::StatusCode::NOT_FOUND))
    }

    /// Check if this error is an authorization failure (401/403)
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::ApiError { status: 401 | 403, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }

    /// Check if this error is a request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestFailed(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = ClientError::api_error(404, "no such job");
        assert!(err.is_not_found());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_auth_classification() {
        assert!(ClientError::api_error(401, "token expired").is_auth_error());
        assert!(ClientError::api_error(403, "forbidden").is_auth_error());
        assert!(!ClientError::api_error(404, "gone").is_auth_error());
    }

    #[test]
    fn test_server_error_classification() {
        let err = ClientError::api_error(503, "maintenance");
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_parse_error_is_neither() {
        let err = ClientError::ParseError("bad json".to_string());
        assert!(!err.is_client_error());
        assert!(!err.is_server_error());
        assert!(!err.is_timeout());
    }
}
