// Error handling module
// Defines the failure taxonomy surfaced to request callers

use thiserror::Error;

/// Errors surfaced by the request pipeline.
///
/// Ordinary 4xx responses are not errors: they pass through to the caller
/// as plain responses. Only the statuses the pipeline routes on (401 after
/// a failed refresh, maintenance 503, 5xx) and transport failures land here.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Credential rejected and the refresh exchange was denied too.
    /// Terminal: the session has been cleared and the sign-out hook fired.
    #[error("Session expired, please sign in again")]
    AuthExpired,

    /// Backend is intentionally unavailable
    #[error("Backend under maintenance: {message}")]
    Maintenance { message: String },

    /// Unexpected 5xx from the backend
    #[error("Server error: {status} - {message}")]
    ServerError {
        url: String,
        status: u16,
        message: String,
    },

    /// Transport-level failure (connect, timeout, decode)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Refresh exchange denied: the durable credential is invalid, expired or
/// revoked, or the exchange timed out. Internal to the refresh coordinator;
/// always converted to [`ApiError::AuthExpired`] before reaching callers.
///
/// Clone because one denial fans out to every queued waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Refresh denied: {reason}")]
pub struct RefreshDenied {
    pub reason: String,
}

impl RefreshDenied {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::AuthExpired;
        assert_eq!(err.to_string(), "Session expired, please sign in again");

        let err = ApiError::Maintenance {
            message: "back at noon".to_string(),
        };
        assert_eq!(err.to_string(), "Backend under maintenance: back at noon");

        let err = ApiError::ServerError {
            url: "https://portal.example/api/rooms".to_string(),
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Server error: 500 - boom");
    }

    #[test]
    fn test_refresh_denied_message() {
        let err = RefreshDenied::new("refresh cookie rejected");
        assert_eq!(err.to_string(), "Refresh denied: refresh cookie rejected");
    }

    #[test]
    fn test_internal_error_message() {
        let err = ApiError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }
}
