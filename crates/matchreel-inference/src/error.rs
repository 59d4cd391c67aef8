//! Inference error types.

use thiserror::Error;

pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Empty response from model {0}")]
    EmptyResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InferenceError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Auth { status, message },
            429 => Self::RateLimited(message),
            _ => Self::Api { status, message },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::RateLimited(_)
            | InferenceError::Timeout(_)
            | InferenceError::Network(_) => true,
            InferenceError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(InferenceError::from_status(401, "bad key"), InferenceError::Auth { .. }));
        assert!(matches!(InferenceError::from_status(403, "denied"), InferenceError::Auth { .. }));
        assert!(matches!(InferenceError::from_status(429, "quota"), InferenceError::RateLimited(_)));
        assert!(matches!(
            InferenceError::from_status(404, "no model"),
            InferenceError::Api { status: 404, .. }
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(InferenceError::from_status(429, "").is_retryable());
        assert!(InferenceError::from_status(503, "").is_retryable());
        assert!(InferenceError::Timeout(30).is_retryable());
        assert!(!InferenceError::from_status(400, "").is_retryable());
        assert!(!InferenceError::from_status(401, "").is_retryable());
        assert!(!InferenceError::EmptyResponse("m".into()).is_retryable());
    }
}
