//! Record reduction
//!
//! [`Metrics`] is a mergeable accumulator: reducing a whole record set and
//! merging the reductions of any partition of it give the same totals,
//! counts, quantities and detail sample. The average is always recomputed
//! from the merged totals.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use shared::{DETAILS_LIMIT, Period, RecordDetail, Report, RetailReport, SalesRecord, StoreShare};

use super::share;

/// Label for retail records without a point of sale
pub const UNASSIGNED_STORE: &str = "unassigned";

/// Running totals over a record set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub total_amount: Decimal,
    pub total_count: u64,
    pub quantity_total: Decimal,
    details: Vec<RecordDetail>,
}

/// Most recent first; undated last; then by id for a total order
fn detail_order(a: &RecordDetail, b: &RecordDetail) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.channel.cmp(&b.channel))
        .then_with(|| a.label.cmp(&b.label))
        .then_with(|| a.amount.cmp(&b.amount))
}

fn detail_of(record: &SalesRecord) -> RecordDetail {
    RecordDetail {
        id: record.id.clone(),
        channel: record.channel,
        label: record.label.clone(),
        amount: record.amount,
        timestamp: record.timestamp,
        state: record.state.clone(),
    }
}

impl Metrics {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a SalesRecord>) -> Self {
        let mut metrics = Self::default();
        for record in records {
            metrics.push(record);
        }
        metrics.trim_details();
        metrics
    }

    fn push(&mut self, record: &SalesRecord) {
        self.total_amount += record.amount;
        self.total_count += 1;
        self.quantity_total += record.quantity.unwrap_or_default();
        self.details.push(detail_of(record));
    }

    fn trim_details(&mut self) {
        self.details.sort_by(detail_order);
        self.details.truncate(DETAILS_LIMIT);
    }

    /// Combine two partial reductions
    pub fn merge(mut self, other: Metrics) -> Metrics {
        self.total_amount += other.total_amount;
        self.total_count += other.total_count;
        self.quantity_total += other.quantity_total;
        self.details.extend(other.details);
        self.trim_details();
        self
    }

    pub fn average_amount(&self) -> Decimal {
        if self.total_count == 0 {
            Decimal::ZERO
        } else {
            self.total_amount / Decimal::from(self.total_count)
        }
    }

    pub fn into_report(self, period: Period) -> Report {
        Report {
            period,
            average_amount: self.average_amount(),
            total_amount: self.total_amount,
            total_count: self.total_count,
            quantity_total: self.quantity_total,
            details: self.details,
        }
    }
}

/// Reduce a record set into a report
pub fn reduce(records: &[SalesRecord], period: Period) -> Report {
    Metrics::from_records(records).into_report(period)
}

/// Reduce retail sales and returns into a retail report
///
/// Base metrics cover sales only (gross). Returns are tallied by magnitude.
/// Store shares are computed against net sales, and stores whose net
/// contribution is not positive are left out.
pub fn reduce_retail(records: &[SalesRecord], period: Period) -> RetailReport {
    let (returns, sales): (Vec<&SalesRecord>, Vec<&SalesRecord>) =
        records.iter().partition(|r| r.channel.is_return());

    let base = Metrics::from_records(sales.iter().copied()).into_report(period);
    let returns_amount: Decimal = returns.iter().map(|r| r.magnitude()).sum();

    let mut per_store: BTreeMap<&str, Decimal> = BTreeMap::new();
    for record in records {
        let name = record.store.as_deref().unwrap_or(UNASSIGNED_STORE);
        // returns are already negative
        *per_store.entry(name).or_default() += record.amount;
    }

    let net_total = base.total_amount - returns_amount;
    let mut stores: Vec<StoreShare> = per_store
        .into_iter()
        .filter(|(_, amount)| *amount > Decimal::ZERO)
        .map(|(name, amount)| StoreShare {
            name: name.to_string(),
            amount,
            share: share(amount, net_total),
        })
        .collect();
    stores.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));

    RetailReport {
        base,
        returns_count: returns.len() as u64,
        returns_amount,
        stores,
    }
}
