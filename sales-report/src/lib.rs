//! Sales aggregation and scheduled reporting
//!
//! - [`normalizer`]: upstream documents → canonical [`shared::SalesRecord`]s
//! - [`metrics`]: reduction, retail netting, comparison, combination
//! - [`ranking`]: cross-channel top products with per-run name cache
//! - [`service`]: per-tenant report building with bounded fan-out
//! - [`dispatcher`]: cron-driven, fault-isolated delivery to subscribers
//! - [`format`]: Markdown rendering of finished reports

pub mod common;
pub mod core;
pub mod dispatcher;
pub mod format;
pub mod metrics;
pub mod normalizer;
pub mod period;
pub mod ranking;
pub mod service;
pub mod source;

pub use dispatcher::{BatchDispatcher, DispatchSummary, JobKind};
pub use period::PeriodKind;
pub use service::ReportService;
pub use source::{SalesSource, SourceFactory, UpstreamFactory};
