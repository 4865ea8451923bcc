//! Channel normalizer
//!
//! Turns raw upstream documents of any channel into canonical
//! [`SalesRecord`]s:
//!
//! - monetary fields are converted from minor units exactly once ([`money`])
//! - returns always carry a negative amount, whatever sign the upstream sent
//! - orders and retail sales are re-checked against the window locally,
//!   since the upstream date filter is lenient; undated records are kept
//!
//! Quantities need line items. [`QuantityMode::Eager`] asks the listing to
//! inline them; [`QuantityMode::Lazy`] issues one follow-up per record.

pub mod money;

use chrono::NaiveDateTime;
use shared::{Channel, DateWindow, LineItem, ProductRef, SalesRecord};
use sklad_client::{Expand, RawDocument, RawPosition, UpstreamResult};

use crate::source::SalesSource;

/// How line-item quantities are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantityMode {
    /// Totals only, no line items
    #[default]
    Skip,
    /// Line items inlined in each listing page
    Eager,
    /// One positions request per record
    Lazy,
}

impl QuantityMode {
    fn expand(&self) -> Expand {
        match self {
            QuantityMode::Eager => Expand::Positions,
            QuantityMode::Skip | QuantityMode::Lazy => Expand::Refs,
        }
    }
}

/// Parse an upstream moment ("2024-01-15 10:30:00.000")
pub fn parse_moment(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Timestamp the channel is filtered on, falling back to the other field
fn document_timestamp(channel: Channel, doc: &RawDocument) -> Option<NaiveDateTime> {
    let (primary, fallback) = match channel {
        Channel::Order => (&doc.created, &doc.moment),
        Channel::RetailSale | Channel::RetailReturn => (&doc.moment, &doc.created),
    };
    primary
        .as_deref()
        .and_then(parse_moment)
        .or_else(|| fallback.as_deref().and_then(parse_moment))
}

fn document_label(doc: &RawDocument) -> String {
    match (&doc.name, &doc.id) {
        (Some(name), _) if !name.is_empty() => name.clone(),
        (_, Some(id)) => format!("#{}", id.chars().take(8).collect::<String>()),
        _ => "unnumbered".to_string(),
    }
}

/// Convert raw positions into line items
pub fn convert_positions(positions: &[RawPosition]) -> Vec<LineItem> {
    positions
        .iter()
        .map(|pos| {
            let quantity = money::to_decimal(pos.quantity);
            LineItem {
                product: ProductRef {
                    name: pos
                        .assortment
                        .as_ref()
                        .and_then(|a| a.name.clone())
                        .filter(|n| !n.is_empty()),
                    href: pos
                        .assortment
                        .as_ref()
                        .and_then(|a| a.href().map(str::to_string)),
                },
                quantity,
                amount: money::line_amount(quantity, pos.price, pos.discount),
            }
        })
        .collect()
}

/// Attach line items and derive the record quantity from them
fn with_lines(mut record: SalesRecord, lines: Vec<LineItem>) -> SalesRecord {
    record.quantity = Some(lines.iter().map(|l| l.quantity).sum());
    record.lines = lines;
    canonicalize(record)
}

/// Apply the sign convention; idempotent
///
/// Returns contribute negatively: amount, quantity and line items are all
/// forced to `-|x|`.
pub fn canonicalize(mut record: SalesRecord) -> SalesRecord {
    if record.channel.is_return() {
        record.amount = -record.amount.abs();
        record.quantity = record.quantity.map(|q| -q.abs());
        for line in &mut record.lines {
            line.quantity = -line.quantity.abs();
            line.amount = -line.amount.abs();
        }
    }
    record
}

/// Convert one raw document
pub fn normalize_document(channel: Channel, doc: &RawDocument) -> SalesRecord {
    let record = SalesRecord {
        id: doc.id.clone().unwrap_or_default(),
        channel,
        timestamp: document_timestamp(channel, doc),
        amount: money::from_minor(doc.sum),
        quantity: None,
        store: doc.retail_store.as_ref().and_then(|s| s.name.clone()),
        label: document_label(doc),
        state: doc.state.as_ref().and_then(|s| s.name.clone()),
        lines: Vec::new(),
    };

    match doc.expanded_positions() {
        Some(positions) => with_lines(record, convert_positions(positions)),
        None => canonicalize(record),
    }
}

/// Drop records whose own timestamp falls outside the window
///
/// Only applies to channels whose upstream filter is lenient. Records with
/// no timestamp are kept.
pub fn refilter(records: Vec<SalesRecord>, window: &DateWindow) -> Vec<SalesRecord> {
    records
        .into_iter()
        .filter(|r| {
            !r.channel.refilters_locally()
                || r.timestamp.is_none_or(|ts| window.contains(ts.date()))
        })
        .collect()
}

/// Normalize a whole listing: convert, then re-filter
pub fn normalize_all(channel: Channel, docs: &[RawDocument], window: &DateWindow) -> Vec<SalesRecord> {
    let records = docs.iter().map(|d| normalize_document(channel, d)).collect();
    refilter(records, window)
}

/// Fetch and normalize one channel for a window
///
/// An empty window is a valid outcome. In lazy mode a failed positions
/// request leaves that record's quantity unset rather than failing the
/// whole fetch.
pub async fn fetch_records(
    source: &dyn SalesSource,
    channel: Channel,
    window: DateWindow,
    mode: QuantityMode,
) -> UpstreamResult<Vec<SalesRecord>> {
    let docs = source.fetch_documents(channel, window, mode.expand()).await?;
    let mut records = normalize_all(channel, &docs, &window);

    tracing::info!(
        channel = %channel,
        window = %window.label(),
        fetched = docs.len(),
        kept = records.len(),
        "Normalized records"
    );

    if mode == QuantityMode::Lazy {
        let mut enriched = Vec::with_capacity(records.len());
        for record in records {
            if record.quantity.is_some() || record.id.is_empty() {
                enriched.push(record);
                continue;
            }
            match source.fetch_positions(channel, &record.id).await {
                Ok(positions) => enriched.push(with_lines(record, convert_positions(&positions))),
                Err(e) => {
                    tracing::warn!(channel = %channel, record = %record.id, error = %e, "Positions unavailable");
                    enriched.push(record);
                }
            }
        }
        records = enriched;
    }

    Ok(records)
}
