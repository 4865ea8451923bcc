//! Aggregated report variants
//!
//! Base metrics live in [`Report`]. Channel-specific views wrap it
//! ([`RetailReport`]) or pair two of them ([`CombinedReport`]). Callers that
//! only need totals go through the [`SalesTotals`] capability instead of
//! matching on the concrete type.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::sales_record::Channel;
use super::window::Period;

/// Maximum number of sample records kept in `Report::details`
pub const DETAILS_LIMIT: usize = 10;

/// Display-only sample of an underlying record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDetail {
    pub id: String,
    pub channel: Channel,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub timestamp: Option<NaiveDateTime>,
    pub state: Option<String>,
}

/// Aggregate over one channel's records for one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub period: Period,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub total_count: u64,
    /// `total_amount / total_count`, zero for an empty report
    #[serde(with = "rust_decimal::serde::float")]
    pub average_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity_total: Decimal,
    /// Most-recent-first, at most [`DETAILS_LIMIT`] entries
    pub details: Vec<RecordDetail>,
}

impl Report {
    /// All-zero report for a window with no records
    pub fn empty(period: Period) -> Self {
        Self {
            period,
            total_amount: Decimal::ZERO,
            total_count: 0,
            average_amount: Decimal::ZERO,
            quantity_total: Decimal::ZERO,
            details: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

/// Net sales attributed to one point of sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreShare {
    pub name: String,
    /// Sales minus returns for this store
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Percentage of the report's net sales
    #[serde(with = "rust_decimal::serde::float")]
    pub share: Decimal,
}

/// Point-of-sale report: gross sales plus returns and store breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetailReport {
    /// Metrics over retail sales only (gross)
    #[serde(flatten)]
    pub base: Report,
    pub returns_count: u64,
    /// Non-negative magnitude of all returns
    #[serde(with = "rust_decimal::serde::float")]
    pub returns_amount: Decimal,
    /// Stores with positive net contribution, largest first
    pub stores: Vec<StoreShare>,
}

impl RetailReport {
    pub fn empty(period: Period) -> Self {
        Self {
            base: Report::empty(period),
            returns_count: 0,
            returns_amount: Decimal::ZERO,
            stores: Vec::new(),
        }
    }

    /// Gross sales minus returns
    pub fn net_amount(&self) -> Decimal {
        self.base.total_amount - self.returns_amount
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.returns_count == 0
    }
}

impl AsRef<Report> for RetailReport {
    fn as_ref(&self) -> &Report {
        &self.base
    }
}

/// Retail and orders views over the same window.
///
/// Both halves must cover the identical window; the composer trusts the
/// caller on this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedReport {
    pub period: Period,
    pub retail: RetailReport,
    pub orders: Report,
    #[serde(with = "rust_decimal::serde::float")]
    pub combined_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub retail_share: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub orders_share: Decimal,
}

impl CombinedReport {
    pub fn is_empty(&self) -> bool {
        self.retail.is_empty() && self.orders.is_empty()
    }
}

/// Totals shared by every report variant
pub trait SalesTotals {
    fn period(&self) -> &Period;
    fn total_amount(&self) -> Decimal;
    fn total_count(&self) -> u64;
    fn quantity_total(&self) -> Decimal;

    fn average_amount(&self) -> Decimal {
        let count = self.total_count();
        if count == 0 {
            Decimal::ZERO
        } else {
            self.total_amount() / Decimal::from(count)
        }
    }
}

impl SalesTotals for Report {
    fn period(&self) -> &Period {
        &self.period
    }

    fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    fn total_count(&self) -> u64 {
        self.total_count
    }

    fn quantity_total(&self) -> Decimal {
        self.quantity_total
    }

    fn average_amount(&self) -> Decimal {
        self.average_amount
    }
}

impl SalesTotals for RetailReport {
    fn period(&self) -> &Period {
        &self.base.period
    }

    fn total_amount(&self) -> Decimal {
        self.base.total_amount
    }

    fn total_count(&self) -> u64 {
        self.base.total_count
    }

    fn quantity_total(&self) -> Decimal {
        self.base.quantity_total
    }

    fn average_amount(&self) -> Decimal {
        self.base.average_amount
    }
}

impl SalesTotals for CombinedReport {
    fn period(&self) -> &Period {
        &self.period
    }

    fn total_amount(&self) -> Decimal {
        self.combined_total
    }

    fn total_count(&self) -> u64 {
        self.retail.base.total_count + self.orders.total_count
    }

    fn quantity_total(&self) -> Decimal {
        self.retail.base.quantity_total + self.orders.quantity_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::window::DateWindow;
    use chrono::NaiveDate;

    fn period() -> Period {
        Period::from_window(DateWindow::day(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
    }

    #[test]
    fn test_empty_report_is_all_zero() {
        let r = Report::empty(period());
        assert!(r.is_empty());
        assert_eq!(r.total_amount, Decimal::ZERO);
        assert_eq!(r.average_amount, Decimal::ZERO);
        assert_eq!(r.quantity_total, Decimal::ZERO);
    }

    #[test]
    fn test_retail_net_amount() {
        let mut r = RetailReport::empty(period());
        r.base.total_amount = Decimal::from(100);
        r.returns_amount = Decimal::from(40);
        assert_eq!(r.net_amount(), Decimal::from(60));
        assert_eq!(r.as_ref().total_amount, Decimal::from(100));
    }

    #[test]
    fn test_combined_totals_capability() {
        let mut retail = RetailReport::empty(period());
        retail.base.total_amount = Decimal::from(300);
        retail.base.total_count = 2;
        let mut orders = Report::empty(period());
        orders.total_amount = Decimal::from(100);
        orders.total_count = 2;

        let combined = CombinedReport {
            period: period(),
            retail,
            orders,
            combined_total: Decimal::from(400),
            retail_share: Decimal::from(75),
            orders_share: Decimal::from(25),
        };
        let totals: &dyn SalesTotals = &combined;
        assert_eq!(totals.total_count(), 4);
        assert_eq!(totals.average_amount(), Decimal::from(100));
    }
}
