//! Upstream error classification

use shared::ReportError;
use thiserror::Error;

/// Longest upstream body excerpt kept in an error
const MAX_BODY_EXCERPT: usize = 500;

/// Upstream failure, classified so callers can pick a policy
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Bad or expired credential (401), fatal for this tenant
    #[error("Authentication failed: invalid or expired API token")]
    AuthFailure,

    /// Malformed filter or parameters (400), a programming error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Timeout or connection failure
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Any other non-2xx status, treated as transient
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    /// 2xx with a body that does not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP client could not be built
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl UpstreamError {
    /// Whether the caller may retry or degrade to "no data"
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UpstreamError::Transient(_) | UpstreamError::Server { .. } | UpstreamError::InvalidResponse(_)
        )
    }

    /// Classify a non-success status with its body
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = excerpt(body);
        match status {
            reqwest::StatusCode::UNAUTHORIZED => UpstreamError::AuthFailure,
            reqwest::StatusCode::BAD_REQUEST => UpstreamError::BadRequest(body),
            _ => UpstreamError::Server {
                status: status.as_u16(),
                body,
            },
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Transient(format!("request timed out: {}", e))
        } else if e.is_connect() {
            UpstreamError::Transient(format!("connection failed: {}", e))
        } else if e.is_decode() {
            UpstreamError::InvalidResponse(e.to_string())
        } else if e.is_builder() {
            UpstreamError::Config(e.to_string())
        } else if let Some(status) = e.status() {
            UpstreamError::from_status(status, "")
        } else {
            UpstreamError::Transient(e.to_string())
        }
    }
}

impl From<UpstreamError> for ReportError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::AuthFailure => ReportError::AuthFailure,
            UpstreamError::BadRequest(msg) | UpstreamError::Config(msg) => {
                ReportError::BadRequest(msg)
            }
            other => ReportError::Transient(other.to_string()),
        }
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(MAX_BODY_EXCERPT).collect()
}

/// Result type for upstream operations
pub type UpstreamResult<T> = Result<T, UpstreamError>;
