//! Shared types for the sales reporting workspace
//!
//! The reporting data model handed between the upstream client, the
//! aggregation engine, the dispatcher and the formatting layer, plus the
//! error taxonomy every layer maps into.

pub mod error;
pub mod models;

// Re-exports
pub use error::{ReportError, ReportResult};
pub use models::*;
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};
