//! Unified error taxonomy for report computation and delivery
//!
//! Every layer maps its own failures into [`ReportError`] so callers can
//! decide policy (retry, degrade to an empty report, skip a tenant) from a
//! single enum:
//!
//! - `AuthFailure` / `BadRequest`: fatal for the tenant, never retried
//! - `Transient`: timeouts, connection failures and upstream 5xx
//! - `PartialData`: a sibling branch of a fan-out failed
//! - `DecryptionFailure`: the stored credential could not be opened
//! - `Delivery` / `Registry`: dispatcher collaborators failed
//!
//! # Example
//!
//! ```
//! use shared::error::ReportError;
//!
//! let err = ReportError::Transient("timed out".into());
//! assert!(err.is_retryable());
//! assert!(!ReportError::AuthFailure.is_retryable());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Report pipeline error
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ReportError {
    /// Credential rejected by the upstream (HTTP 401)
    #[error("Upstream rejected the credential")]
    AuthFailure,

    /// Malformed filter or query (HTTP 400)
    #[error("Malformed upstream request: {0}")]
    BadRequest(String),

    /// Timeout, connection failure or upstream server error
    #[error("Upstream unavailable: {0}")]
    Transient(String),

    /// Some branches of a fan-out failed, siblings succeeded
    #[error("Partial data: {failed} of {total} fetches failed")]
    PartialData { failed: usize, total: usize },

    /// Stored credential could not be decrypted
    #[error("Credential decryption failed: {0}")]
    DecryptionFailure(String),

    /// Outbound delivery failed
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Subscriber registry lookup failed
    #[error("Subscriber registry error: {0}")]
    Registry(String),
}

impl ReportError {
    /// Whether a later attempt may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReportError::Transient(_) | ReportError::PartialData { .. } | ReportError::Delivery(_)
        )
    }

    /// Stable machine-readable code for logs and audit records
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::AuthFailure => "auth_failure",
            ReportError::BadRequest(_) => "bad_request",
            ReportError::Transient(_) => "transient",
            ReportError::PartialData { .. } => "partial_data",
            ReportError::DecryptionFailure(_) => "decryption_failure",
            ReportError::Delivery(_) => "delivery",
            ReportError::Registry(_) => "registry",
        }
    }

    /// End-user facing explanation.
    ///
    /// Transient failures read the same as an empty period: absence of data
    /// and absence of connectivity are presented identically.
    pub fn user_message(&self) -> &'static str {
        match self {
            ReportError::AuthFailure | ReportError::BadRequest(_) => {
                "Cannot fetch data: check your API token and settings."
            }
            ReportError::Transient(_) => "No data could be retrieved for this period.",
            ReportError::PartialData { .. } => "Some periods could not be retrieved.",
            ReportError::DecryptionFailure(_) => {
                "Stored API token could not be read. Please update it."
            }
            ReportError::Delivery(_) | ReportError::Registry(_) => {
                "Report could not be delivered."
            }
        }
    }
}

/// Result alias for report operations
pub type ReportResult<T> = Result<T, ReportError>;
