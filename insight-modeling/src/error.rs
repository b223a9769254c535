//! Error types for insight-modeling
//!
//! Only transport-level failures are errors. An analytical failure (the
//! backend ran but the fit could not be produced) is a normal
//! [`RunOutcome`](crate::runner::RunOutcome) and never reaches this type.

use thiserror::Error;

/// Remote modeling service errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection refused, DNS failure, timeout, ...
    #[error("Network error: {0}")]
    Network(String),

    /// Session token missing, expired or rejected (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Non-success HTTP status, with the backend's `message` if it sent one
    #[error("API error {status}: {}", message.as_deref().unwrap_or("no message"))]
    Api { status: u16, message: Option<String> },

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Message supplied by the backend, if any
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            BackendError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text to show the user: the backend message when present, `fallback` otherwise
    pub fn user_message(&self, fallback: &str) -> String {
        self.backend_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = BackendError::Api {
            status: 400,
            message: Some("Dataset does not belong to project".to_string()),
        };
        assert_eq!(
            err.user_message("Model run failed"),
            "Dataset does not belong to project"
        );
    }

    #[test]
    fn test_user_message_falls_back() {
        assert_eq!(
            BackendError::Network("timeout".into()).user_message("Model run failed"),
            "Model run failed"
        );
        let blank = BackendError::Api {
            status: 500,
            message: Some("  ".into()),
        };
        assert_eq!(blank.user_message("Export failed"), "Export failed");
    }
}
