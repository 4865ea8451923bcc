//! Report service
//!
//! Drives one tenant's source through the normalizer and calculators to
//! produce finished views. Every upstream fetch goes through a semaphore so
//! nested fan-outs (periods × channels) never exceed the configured
//! concurrency.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::StreamExt;
use shared::{
    Channel, CombinedReport, ComparisonResult, Period, ProductRankEntry, Report, ReportError,
    ReportResult, RetailReport, SalesRecord,
};
use tokio::sync::Semaphore;

use crate::metrics::{combine, compare, reduce, reduce_retail};
use crate::normalizer::{self, QuantityMode};
use crate::period::PeriodKind;
use crate::ranking::rank_products;
use crate::source::SalesSource;

/// Default bound on parallel upstream fetches per request
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default length of the top-product list
pub const DEFAULT_TOP_LIMIT: usize = 10;

/// Interactive period-over-period comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonPreset {
    TodayVsYesterday,
    WeekVsLastWeek,
    MonthVsLastMonth,
    TodayVsYearAgo,
}

impl ComparisonPreset {
    /// (current, previous)
    pub fn kinds(&self) -> (PeriodKind, PeriodKind) {
        match self {
            ComparisonPreset::TodayVsYesterday => (PeriodKind::Today, PeriodKind::Yesterday),
            ComparisonPreset::WeekVsLastWeek => (PeriodKind::Week, PeriodKind::LastWeek),
            ComparisonPreset::MonthVsLastMonth => (PeriodKind::Month, PeriodKind::LastMonth),
            ComparisonPreset::TodayVsYearAgo => (PeriodKind::Today, PeriodKind::YearAgo),
        }
    }
}

/// Today + week + month, best effort
#[derive(Debug, Clone)]
pub struct QuickReport {
    pub reports: Vec<(PeriodKind, CombinedReport)>,
    /// Periods whose fetch failed and were zeroed
    pub degraded: Vec<PeriodKind>,
}

impl QuickReport {
    pub const KINDS: [PeriodKind; 3] = [PeriodKind::Today, PeriodKind::Week, PeriodKind::Month];

    /// `PartialData` when any branch was degraded
    pub fn partial_error(&self) -> Option<ReportError> {
        (!self.degraded.is_empty()).then(|| ReportError::PartialData {
            failed: self.degraded.len(),
            total: self.reports.len(),
        })
    }
}

/// Report builder for one tenant
pub struct ReportService {
    source: Arc<dyn SalesSource>,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl ReportService {
    pub fn new(source: Arc<dyn SalesSource>) -> Self {
        Self::with_concurrency(source, DEFAULT_CONCURRENCY)
    }

    pub fn with_concurrency(source: Arc<dyn SalesSource>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            source,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    async fn fetch(
        &self,
        channel: Channel,
        period: &Period,
        mode: QuantityMode,
    ) -> ReportResult<Vec<SalesRecord>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ReportError::Transient(e.to_string()))?;
        normalizer::fetch_records(self.source.as_ref(), channel, period.window, mode)
            .await
            .map_err(Into::into)
    }

    /// Orders channel report
    pub async fn orders_report(&self, period: &Period, mode: QuantityMode) -> ReportResult<Report> {
        let records = self.fetch(Channel::Order, period, mode).await?;
        Ok(reduce(&records, period.clone()))
    }

    /// Retail sales and returns report
    pub async fn retail_report(
        &self,
        period: &Period,
        mode: QuantityMode,
    ) -> ReportResult<RetailReport> {
        let (mut sales, returns) = futures::try_join!(
            self.fetch(Channel::RetailSale, period, mode),
            self.fetch(Channel::RetailReturn, period, mode),
        )?;
        sales.extend(returns);
        Ok(reduce_retail(&sales, period.clone()))
    }

    /// Retail and orders for the same window
    pub async fn combined_report(
        &self,
        period: &Period,
        mode: QuantityMode,
    ) -> ReportResult<CombinedReport> {
        let (retail, orders) = futures::try_join!(
            self.retail_report(period, mode),
            self.orders_report(period, mode),
        )?;
        Ok(combine(retail, orders))
    }

    /// Compare two periods on the orders channel
    ///
    /// Both sides are fetched in parallel with inline line items, so the item
    /// count is tracked alongside the money metrics. If either fails the
    /// comparison is not computed and the error names the failed side.
    pub async fn compare_periods(
        &self,
        current: &Period,
        previous: &Period,
    ) -> ReportResult<ComparisonResult> {
        let (current_report, previous_report) = futures::join!(
            self.orders_report(current, QuantityMode::Eager),
            self.orders_report(previous, QuantityMode::Eager),
        );

        match (current_report, previous_report) {
            (Ok(c), Ok(p)) => Ok(compare(&c, &p)),
            (Err(e), Ok(_)) => Err(side_error("current", e)),
            (Ok(_), Err(e)) => Err(side_error("previous", e)),
            (Err(e), Err(_)) => Err(side_error("current and previous", e)),
        }
    }

    pub async fn compare_preset(
        &self,
        preset: ComparisonPreset,
        today: NaiveDate,
    ) -> ReportResult<ComparisonResult> {
        let (current, previous) = preset.kinds();
        self.compare_periods(&current.period(today), &previous.period(today))
            .await
    }

    /// Today, week and month combined reports
    ///
    /// A failed period is replaced by a zeroed report and listed in
    /// `degraded`; siblings are unaffected.
    pub async fn quick_report(&self, today: NaiveDate, mode: QuantityMode) -> QuickReport {
        let mut results: Vec<(usize, PeriodKind, ReportResult<CombinedReport>)> =
            futures::stream::iter(QuickReport::KINDS.into_iter().enumerate())
                .map(|(index, kind)| async move {
                    let period = kind.period(today);
                    (index, kind, self.combined_report(&period, mode).await)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        results.sort_by_key(|(index, _, _)| *index);

        let mut quick = QuickReport {
            reports: Vec::with_capacity(results.len()),
            degraded: Vec::new(),
        };
        for (_, kind, result) in results {
            let report = match result {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(period = %kind, error = %e, "Quick report branch failed");
                    quick.degraded.push(kind);
                    let period = kind.period(today);
                    combine(RetailReport::empty(period.clone()), Report::empty(period))
                }
            };
            quick.reports.push((kind, report));
        }

        if let Some(e) = quick.partial_error() {
            tracing::warn!(error = %e, "Quick report degraded");
        }
        quick
    }

    /// Top products across all channels
    pub async fn top_products(
        &self,
        period: &Period,
        limit: usize,
    ) -> ReportResult<Vec<ProductRankEntry>> {
        let (mut records, sales, returns) = futures::try_join!(
            self.fetch(Channel::Order, period, QuantityMode::Eager),
            self.fetch(Channel::RetailSale, period, QuantityMode::Eager),
            self.fetch(Channel::RetailReturn, period, QuantityMode::Eager),
        )?;
        records.extend(sales);
        records.extend(returns);
        Ok(rank_products(self.source.as_ref(), &records, limit).await)
    }
}

fn side_error(side: &str, e: ReportError) -> ReportError {
    match e {
        ReportError::Transient(msg) => ReportError::Transient(format!("{side} period: {msg}")),
        other => other,
    }
}
