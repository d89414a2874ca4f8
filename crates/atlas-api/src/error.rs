//! Error taxonomy for the atlas data-access layer.

use std::fmt;

/// Terminal failure of a credential refresh.
///
/// Internal to the session coordinator; callers of the client only see it
/// as the cause wrapped inside [`ApiError::AuthExpired`]. `Clone` because
/// every waiter on the shared in-flight refresh receives the same outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshError {
    /// One-line summary suitable for display.
    pub message: String,
}

impl RefreshError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RefreshError {}

/// Structured error from the API client.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Transport failure; no response was received.
    Network(String),
    /// Non-2xx response outside the refresh-triggering 401 case.
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body, possibly empty.
        body: String,
    },
    /// The session could not be renewed: either the replay budget is
    /// exhausted or the refresh itself failed. Terminal for the session.
    AuthExpired {
        /// Present when a failed refresh ended the session.
        cause: Option<RefreshError>,
    },
    /// A 2xx response body that was not the expected JSON shape.
    Decode(String),
}

impl ApiError {
    /// Returns true if this error ends the session and callers should
    /// drop to an unauthenticated state.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired { .. })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(message) => write!(f, "network error: {message}"),
            ApiError::HttpStatus { status, .. } => write!(f, "HTTP {status}"),
            ApiError::AuthExpired { cause: Some(cause) } => {
                write!(f, "session expired: {cause}")
            }
            ApiError::AuthExpired { cause: None } => write!(f, "session expired"),
            ApiError::Decode(message) => write!(f, "invalid response body: {message}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::AuthExpired { cause: Some(cause) } => Some(cause),
            _ => None,
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_expired_display_includes_cause() {
        let err = ApiError::AuthExpired {
            cause: Some(RefreshError::new("refresh rejected (HTTP 403)")),
        };
        assert_eq!(err.to_string(), "session expired: refresh rejected (HTTP 403)");
        assert!(err.is_auth_expired());
    }

    #[test]
    fn test_http_status_display_omits_body() {
        let err = ApiError::HttpStatus {
            status: 503,
            body: "upstream down".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503");
    }
}
