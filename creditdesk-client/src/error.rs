//! Error types for the CreditDesk clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the external agent
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection refused, timeout, TLS, ...)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error body returned by the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The response was well-formed but not something the protocol allows
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The token exchange was refused
    #[error("Authentication with agent failed: {0}")]
    Unauthorized(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }

    /// Transport-level failures are the ones worth retrying
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::RequestFailed(_)) || self.is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let not_found = ClientError::api_error(404, "no such run");
        assert!(not_found.is_client_error());
        assert!(!not_found.is_transport());

        let unavailable = ClientError::api_error(503, "try later");
        assert!(unavailable.is_server_error());
        assert!(unavailable.is_transport());

        assert!(!ClientError::Protocol("bad status".to_string()).is_transport());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::api_error(429, "quota exceeded");
        assert_eq!(err.to_string(), "API error (status 429): quota exceeded");
    }
}
