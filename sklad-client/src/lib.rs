//! Sklad Client - per-tenant HTTP client for the commerce back-end
//!
//! Issues paginated, date-filtered reads against the upstream REST API and
//! classifies every failure into [`UpstreamError`]. The client performs no
//! retries and no caching; callers apply channel-appropriate policy.
//!
//! One [`UpstreamClient`] is built per tenant credential and never shared
//! across tenants.

pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use config::{ClientConfig, Expand};
pub use error::{UpstreamError, UpstreamResult};
pub use http::UpstreamClient;
pub use types::{Meta, NamedRef, Page, Positions, RawDocument, RawPosition};
