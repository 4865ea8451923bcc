//! Top-product ranker
//!
//! Line items from every channel are keyed by resolved product name and
//! their quantities and amounts summed (returns subtract). Names come from
//! the line item when the upstream inlined them, otherwise from one lookup
//! per distinct reference handle through a [`NameCache`] that lives for a
//! single ranking run.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::{ProductRankEntry, ProductRef, SalesRecord, UNNAMED_PRODUCT};

use crate::source::SalesSource;

/// Per-run handle → name cache
///
/// Not shared between concurrent rankings; each run owns its instance.
pub struct NameCache<'a> {
    source: &'a dyn SalesSource,
    names: HashMap<String, String>,
    lookups: usize,
}

impl<'a> NameCache<'a> {
    pub fn new(source: &'a dyn SalesSource) -> Self {
        Self {
            source,
            names: HashMap::new(),
            lookups: 0,
        }
    }

    /// Upstream lookups issued so far
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// Display name for a product reference
    ///
    /// An inline name wins and is remembered for its handle. A handle is
    /// fetched at most once; failures and missing handles resolve to
    /// [`UNNAMED_PRODUCT`].
    pub async fn resolve(&mut self, product: &ProductRef) -> String {
        if let Some(name) = &product.name {
            if let Some(href) = &product.href {
                self.names.entry(href.clone()).or_insert_with(|| name.clone());
            }
            return name.clone();
        }

        let Some(href) = &product.href else {
            return UNNAMED_PRODUCT.to_string();
        };
        if let Some(name) = self.names.get(href) {
            return name.clone();
        }

        self.lookups += 1;
        let name = match self.source.resolve_name(href).await {
            Ok(Some(name)) if !name.is_empty() => name,
            Ok(_) => UNNAMED_PRODUCT.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Product name lookup failed");
                UNNAMED_PRODUCT.to_string()
            }
        };
        self.names.insert(href.clone(), name.clone());
        name
    }
}

/// Running per-product totals
#[derive(Debug, Default)]
pub struct ProductTotals {
    totals: HashMap<String, (Decimal, Decimal)>,
}

impl ProductTotals {
    pub fn add(&mut self, name: String, quantity: Decimal, amount: Decimal) {
        let entry = self.totals.entry(name).or_default();
        entry.0 += quantity;
        entry.1 += amount;
    }

    /// Top `limit` entries by (amount, quantity) descending
    ///
    /// Entries whose quantity nets to zero or below are dropped first. Name
    /// breaks remaining ties so the order is total.
    pub fn top(self, limit: usize) -> Vec<ProductRankEntry> {
        let mut entries: Vec<ProductRankEntry> = self
            .totals
            .into_iter()
            .filter(|(_, (quantity, _))| *quantity > Decimal::ZERO)
            .map(|(name, (quantity, amount))| ProductRankEntry {
                name,
                quantity,
                amount,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| b.quantity.cmp(&a.quantity))
                .then_with(|| a.name.cmp(&b.name))
        });
        entries.truncate(limit);
        entries
    }
}

/// Rank products across the given records
pub async fn rank_products(
    source: &dyn SalesSource,
    records: &[SalesRecord],
    limit: usize,
) -> Vec<ProductRankEntry> {
    let mut cache = NameCache::new(source);
    let mut totals = ProductTotals::default();

    for line in records.iter().flat_map(|r| r.lines.iter()) {
        let name = cache.resolve(&line.product).await;
        totals.add(name, line.quantity, line.amount);
    }

    tracing::debug!(
        records = records.len(),
        lookups = cache.lookups(),
        "Ranked products"
    );
    totals.top(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_by_amount_then_quantity() {
        let mut totals = ProductTotals::default();
        totals.add("A".into(), Decimal::new(3, 0), Decimal::new(300, 0));
        totals.add("B".into(), Decimal::new(10, 0), Decimal::new(100, 0));
        totals.add("C".into(), Decimal::new(20, 0), Decimal::new(100, 0));

        let names: Vec<_> = totals.top(3).into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["A", "C", "B"]);
    }

    #[test]
    fn test_netted_out_products_are_dropped() {
        let mut totals = ProductTotals::default();
        totals.add("Kept".into(), Decimal::new(1, 0), Decimal::new(10, 0));
        totals.add("Returned".into(), Decimal::new(2, 0), Decimal::new(50, 0));
        totals.add("Returned".into(), Decimal::new(-2, 0), Decimal::new(-50, 0));

        let top = totals.top(10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Kept");
    }
}
