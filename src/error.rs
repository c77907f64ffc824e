//! Error taxonomy shared by the directory components.
//!
//! Drivers never decide whether an error is logged or surfaced; they return
//! one of these and let the calling layer pick.

use thiserror::Error;

pub type Result<T, E = DirectoryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Token resolution failed, no HTTP call was attempted.
    #[error("authentication failed: {reason}")]
    Auth { reason: String },

    /// DNS, connect, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response after all applicable retries.
    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// Retry budget spent while the provider still answered 503.
    #[error("rate limit still in effect after {attempts} retries: {body}")]
    RateLimitExhausted { attempts: u32, body: String },

    #[error("retry budget must be within 1..=5, got {0}")]
    InvalidRetryBudget(u32),

    #[error("pagination stopped after {pages} pages")]
    PageLimitExceeded { pages: u32 },

    #[error("operation cancelled")]
    Cancelled,

    /// A 2xx body that is not JSON.
    #[error("invalid response body: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DirectoryError {
    pub fn auth(reason: impl Into<String>) -> Self {
        DirectoryError::Auth { reason: reason.into() }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DirectoryError::RequestFailed { status, .. } => Some(*status),
            DirectoryError::RateLimitExhausted { .. } => Some(503),
            DirectoryError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
