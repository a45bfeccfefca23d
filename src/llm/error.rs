//! LLM error types

use thiserror::Error;

/// LLM error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// Upstream HTTP status, when the provider answered at all
    pub status: Option<u16>,
}

impl LlmError {
    #[must_use]
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Classify a non-success HTTP answer from the provider
    #[must_use]
    pub fn from_status(status: u16, message: &str) -> Self {
        let (kind, label) = match status {
            401 | 403 => (LlmErrorKind::Auth, "Authentication failed"),
            429 => (LlmErrorKind::RateLimit, "Rate limit exceeded"),
            400 | 404 | 422 => (LlmErrorKind::InvalidRequest, "Invalid request"),
            500..=599 => (LlmErrorKind::ServerError, "Server error"),
            _ => (LlmErrorKind::Unknown, "Unexpected response"),
        };
        Self {
            kind,
            message: format!("{label} (HTTP {status}): {message}"),
            status: Some(status),
        }
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }
}

/// Error classification, used for logging and status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Connection failures and timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Provider-side failure (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Request rejected as malformed (400 and friends)
    InvalidRequest,
    Unknown,
}

impl LlmErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::Auth => "auth",
            Self::InvalidRequest => "invalid_request",
            Self::Unknown => "unknown",
        }
    }
}
