//! Error types for the vendor API

use std::fmt;

use thiserror::Error;

/// Result type for vendor API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Details attached to an API failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub message: String,
    pub status_code: Option<u16>,
    pub status_text: Option<String>,
}

impl ErrorContext {
    /// Context without an HTTP status (request never got a response)
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            status_text: None,
        }
    }

    /// Context for a non-success HTTP response
    pub fn with_status(
        message: impl Into<String>,
        status_code: u16,
        status_text: Option<impl Into<String>>,
    ) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
            status_text: status_text.map(Into::into),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status_code, &self.status_text) {
            (Some(code), Some(text)) => write!(f, "{} ({} {})", self.message, code, text),
            (Some(code), None) => write!(f, "{} ({})", self.message, code),
            _ => f.write_str(&self.message),
        }
    }
}

/// Errors returned by the session client
///
/// Cloneable so the same failure can be returned to the caller and
/// delivered to the error subscriber.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Login rejected: bad credentials or backend outage
    #[error("authentication failed: {0}")]
    Auth(ErrorContext),

    /// An authenticated call returned a non-success status or was rejected
    #[error("transport failure: {0}")]
    Transport(ErrorContext),

    /// The backend answered with an unexpected shape
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl ApiError {
    /// HTTP status attached to the failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Auth(ctx) | ApiError::Transport(ctx) => ctx.status_code,
            ApiError::Protocol(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let ctx = ErrorContext::with_status("Login failed", 401, Some("Unauthorized"));
        assert_eq!(ctx.to_string(), "Login failed (401 Unauthorized)");

        let ctx = ErrorContext::with_status("Failed to list gates", 502, None::<String>);
        assert_eq!(ctx.to_string(), "Failed to list gates (502)");

        assert_eq!(ErrorContext::new("boom").to_string(), "boom");
    }

    #[test]
    fn test_status_code() {
        let err = ApiError::Transport(ErrorContext::with_status("x", 500, None::<String>));
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(ApiError::Protocol("y".into()).status_code(), None);
    }
}
