//! Scheduled batch dispatcher
//!
//! On each firing of a job the dispatcher resolves the job's period, loads
//! the subscribed tenants and, one tenant at a time:
//!
//! 1. opens the tenant's sealed credential,
//! 2. builds a dedicated upstream source for it,
//! 3. computes the combined report for the period,
//! 4. waits for a delivery slot and sends the rendered report (or a
//!    "no data" notice),
//! 5. records the request in the registry.
//!
//! Any failure or panic while handling one tenant is counted and logged;
//! the loop always moves on to the next tenant. Failed tenants are not
//! retried within the same firing.

pub mod collaborators;
pub mod delivery;
pub mod pacer;
pub mod registry;
pub mod scheduler;
pub mod vault;

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::FutureExt;
use shared::{Period, ReportError, ReportResult};

use crate::format::{MarkdownFormatter, ReportFormatter};
use crate::normalizer::QuantityMode;
use crate::period::PeriodKind;
use crate::service::{DEFAULT_CONCURRENCY, ReportService};
use crate::source::SourceFactory;

pub use collaborators::{
    CredentialVault, DeliveryChannel, Subscriber, SubscriberRegistry, TenantId, TenantProfile,
};
pub use delivery::TelegramDelivery;
pub use pacer::DeliveryPacer;
pub use registry::SqliteRegistry;
pub use scheduler::{JobSchedule, ReportScheduler};
pub use vault::MasterKey;

/// Scheduled report cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Daily,
    Weekly,
    Monthly,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::Daily, JobKind::Weekly, JobKind::Monthly];

    /// Stable job id
    pub fn id(&self) -> &'static str {
        match self {
            JobKind::Daily => "daily",
            JobKind::Weekly => "weekly",
            JobKind::Monthly => "monthly",
        }
    }

    /// The closed period each job reports on
    pub fn period_kind(&self) -> PeriodKind {
        match self {
            JobKind::Daily => PeriodKind::Yesterday,
            JobKind::Weekly => PeriodKind::LastWeek,
            JobKind::Monthly => PeriodKind::LastMonth,
        }
    }

    pub fn period(&self, today: NaiveDate) -> Period {
        self.period_kind().period(today)
    }

    /// Message heading
    pub fn title(&self, period: &Period) -> String {
        match self {
            JobKind::Daily => format!("Daily report for {}", period.label),
            JobKind::Weekly => format!("Weekly report for {}", period.label),
            JobKind::Monthly => {
                format!("Sales report for {}", period.window.date_from.format("%B %Y"))
            }
        }
    }

    /// Audit record type
    pub fn request_type(&self) -> String {
        format!("scheduled_{}", self.id())
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// How one tenant's delivery went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantOutcome {
    Delivered,
    /// Empty period (or unreachable upstream); the notice was delivered
    NoData,
}

/// Aggregate result of one firing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub successes: usize,
    pub failures: usize,
    /// Successes that carried a "no data" notice
    pub no_data: usize,
    pub failed_tenants: Vec<TenantId>,
}

impl DispatchSummary {
    pub fn attempted(&self) -> usize {
        self.successes + self.failures
    }
}

/// Sequential, fault-isolated report fan-out to all subscribers
pub struct BatchDispatcher {
    registry: Arc<dyn SubscriberRegistry>,
    vault: Arc<dyn CredentialVault>,
    sources: Arc<dyn SourceFactory>,
    delivery: Arc<dyn DeliveryChannel>,
    formatter: Arc<dyn ReportFormatter>,
    pacer: DeliveryPacer,
    concurrency: usize,
    mode: QuantityMode,
}

impl BatchDispatcher {
    pub fn new(
        registry: Arc<dyn SubscriberRegistry>,
        vault: Arc<dyn CredentialVault>,
        sources: Arc<dyn SourceFactory>,
        delivery: Arc<dyn DeliveryChannel>,
    ) -> Self {
        Self {
            registry,
            vault,
            sources,
            delivery,
            formatter: Arc::new(MarkdownFormatter),
            pacer: DeliveryPacer::unlimited(),
            concurrency: DEFAULT_CONCURRENCY,
            mode: QuantityMode::Eager,
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn ReportFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_pacer(mut self, pacer: DeliveryPacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_quantity_mode(mut self, mode: QuantityMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run one firing of `job` with periods resolved against `today`
    ///
    /// Only a failure to list subscribers is returned as an error; every
    /// per-tenant failure is folded into the summary.
    pub async fn run(&self, job: JobKind, today: NaiveDate) -> ReportResult<DispatchSummary> {
        let period = job.period(today);
        let title = job.title(&period);
        let subscribers = self.registry.subscribers().await?;

        let mut summary = DispatchSummary::default();
        if subscribers.is_empty() {
            tracing::info!(job = %job, "No subscribers with notifications enabled");
            return Ok(summary);
        }
        tracing::info!(job = %job, period = %period.label, tenants = subscribers.len(), "Dispatching scheduled reports");

        for subscriber in &subscribers {
            let tenant = subscriber.tenant_id;
            let result = AssertUnwindSafe(self.dispatch_tenant(subscriber, job, &period, &title))
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(outcome)) => {
                    summary.successes += 1;
                    if outcome == TenantOutcome::NoData {
                        summary.no_data += 1;
                    }
                    tracing::info!(tenant = %tenant, outcome = ?outcome, "Report delivered");
                }
                Ok(Err(e)) => {
                    summary.failures += 1;
                    summary.failed_tenants.push(tenant);
                    tracing::error!(tenant = %tenant, code = e.code(), error = %e, "Report dispatch failed");
                }
                Err(_) => {
                    summary.failures += 1;
                    summary.failed_tenants.push(tenant);
                    tracing::error!(tenant = %tenant, "Report dispatch panicked");
                }
            }
        }

        tracing::info!(
            job = %job,
            attempted = summary.attempted(),
            successes = summary.successes,
            failures = summary.failures,
            no_data = summary.no_data,
            "Dispatch finished"
        );
        Ok(summary)
    }

    async fn dispatch_tenant(
        &self,
        subscriber: &Subscriber,
        job: JobKind,
        period: &Period,
        title: &str,
    ) -> ReportResult<TenantOutcome> {
        let tenant = subscriber.tenant_id;
        let source = {
            let token = self.vault.decrypt(&subscriber.encrypted_credential)?;
            self.sources.connect(&token)?
        };
        let service = ReportService::with_concurrency(source, self.concurrency);

        let (text, outcome) = match service.combined_report(period, self.mode).await {
            Ok(report) if report.is_empty() => {
                tracing::warn!(tenant = %tenant, period = %period.label, "No data for period");
                (self.no_data_notice(title, period), TenantOutcome::NoData)
            }
            Ok(report) => (self.formatter.scheduled(title, &report), TenantOutcome::Delivered),
            Err(ReportError::Transient(reason)) => {
                tracing::warn!(tenant = %tenant, reason = %reason, "Upstream unavailable, sending no-data notice");
                (self.no_data_notice(title, period), TenantOutcome::NoData)
            }
            Err(e) => return Err(e),
        };

        self.pacer.acquire().await;
        self.delivery.deliver(tenant, &text).await?;

        if outcome == TenantOutcome::Delivered
            && let Err(e) = self
                .registry
                .log_request(tenant, &job.request_type(), &period.window.label())
                .await
        {
            tracing::warn!(tenant = %tenant, error = %e, "Failed to record scheduled request");
        }
        Ok(outcome)
    }

    fn no_data_notice(&self, title: &str, period: &Period) -> String {
        format!("{title}\n\n{}", self.formatter.no_data(period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_job_periods() {
        // Monday
        let today = date(2024, 3, 4);
        assert_eq!(JobKind::Daily.period(today).label, "2024-03-03");
        assert_eq!(JobKind::Weekly.period(today).label, "2024-02-26 - 2024-03-03");
        assert_eq!(JobKind::Monthly.period(today).label, "2024-02-01 - 2024-02-29");
    }

    #[test]
    fn test_job_titles_and_request_types() {
        let today = date(2024, 3, 1);
        let monthly = JobKind::Monthly.period(today);
        assert_eq!(JobKind::Monthly.title(&monthly), "Sales report for February 2024");
        assert_eq!(
            JobKind::Daily.title(&JobKind::Daily.period(today)),
            "Daily report for 2024-02-29"
        );
        assert_eq!(JobKind::Weekly.request_type(), "scheduled_weekly");
    }

    #[test]
    fn test_summary_attempted() {
        let summary = DispatchSummary {
            successes: 2,
            failures: 1,
            no_data: 1,
            failed_tenants: vec![7],
        };
        assert_eq!(summary.attempted(), 3);
    }
}
