//! In-memory upstream fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use sales_report::SalesSource;
use shared::{Channel, DateWindow};
use sklad_client::{
    Expand, Meta, NamedRef, Positions, RawDocument, RawPosition, UpstreamError, UpstreamResult,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Document dated `moment` ("YYYY-MM-DD HH:MM:SS") worth `sum_minor`
pub fn doc(id: &str, moment: &str, sum_minor: f64) -> RawDocument {
    RawDocument {
        id: Some(id.to_string()),
        name: Some(id.to_string()),
        moment: Some(format!("{moment}.000")),
        created: Some(format!("{moment}.000")),
        sum: sum_minor,
        ..Default::default()
    }
}

pub fn at_store(mut doc: RawDocument, store: &str) -> RawDocument {
    doc.retail_store = Some(NamedRef {
        meta: Meta::default(),
        name: Some(store.to_string()),
    });
    doc
}

pub fn with_positions(mut doc: RawDocument, rows: Vec<RawPosition>) -> RawDocument {
    doc.positions = Some(Positions {
        meta: Meta::default(),
        rows: Some(rows),
    });
    doc
}

/// Line item with an inline product name
pub fn named_position(name: &str, quantity: f64, price_minor: f64) -> RawPosition {
    RawPosition {
        quantity,
        price: price_minor,
        assortment: Some(NamedRef {
            meta: Meta::default(),
            name: Some(name.to_string()),
        }),
        ..Default::default()
    }
}

/// Line item carrying only a reference handle
pub fn ref_position(href: &str, quantity: f64, price_minor: f64) -> RawPosition {
    RawPosition {
        quantity,
        price: price_minor,
        assortment: Some(NamedRef {
            meta: Meta {
                href: Some(href.to_string()),
                ..Default::default()
            },
            name: None,
        }),
        ..Default::default()
    }
}

/// Canned upstream for one tenant
#[derive(Default)]
pub struct FakeSource {
    docs: HashMap<Channel, Vec<RawDocument>>,
    failing_windows: Vec<DateWindow>,
    rejects_credential: bool,
    names: HashMap<String, String>,
    missing_positions: Vec<String>,
    document_fetches: AtomicUsize,
    position_fetches: AtomicUsize,
    name_lookups: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docs(mut self, channel: Channel, docs: Vec<RawDocument>) -> Self {
        self.docs.entry(channel).or_default().extend(docs);
        self
    }

    /// Every listing for `window` fails as unreachable
    pub fn failing_on(mut self, window: DateWindow) -> Self {
        self.failing_windows.push(window);
        self
    }

    pub fn rejecting_credential(mut self) -> Self {
        self.rejects_credential = true;
        self
    }

    pub fn with_name(mut self, href: &str, name: &str) -> Self {
        self.names.insert(href.to_string(), name.to_string());
        self
    }

    /// Positions follow-ups for `document_id` fail as unreachable
    pub fn without_positions_for(mut self, document_id: &str) -> Self {
        self.missing_positions.push(document_id.to_string());
        self
    }

    pub fn document_fetches(&self) -> usize {
        self.document_fetches.load(Ordering::SeqCst)
    }

    pub fn position_fetches(&self) -> usize {
        self.position_fetches.load(Ordering::SeqCst)
    }

    pub fn name_lookups(&self) -> usize {
        self.name_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SalesSource for FakeSource {
    async fn fetch_documents(
        &self,
        channel: Channel,
        window: DateWindow,
        expand: Expand,
    ) -> UpstreamResult<Vec<RawDocument>> {
        self.document_fetches.fetch_add(1, Ordering::SeqCst);
        if self.rejects_credential {
            return Err(UpstreamError::AuthFailure);
        }
        if self.failing_windows.contains(&window) {
            return Err(UpstreamError::Transient("connection reset".into()));
        }
        let mut docs = self.docs.get(&channel).cloned().unwrap_or_default();
        // line items are only inlined when the listing asks for them
        if expand != Expand::Positions {
            for doc in &mut docs {
                doc.positions = None;
            }
        }
        Ok(docs)
    }

    async fn fetch_positions(
        &self,
        channel: Channel,
        document_id: &str,
    ) -> UpstreamResult<Vec<RawPosition>> {
        self.position_fetches.fetch_add(1, Ordering::SeqCst);
        if self.missing_positions.iter().any(|id| id == document_id) {
            return Err(UpstreamError::Transient("positions timed out".into()));
        }
        Ok(self
            .docs
            .get(&channel)
            .and_then(|docs| docs.iter().find(|d| d.id.as_deref() == Some(document_id)))
            .and_then(|d| d.expanded_positions().map(<[RawPosition]>::to_vec))
            .unwrap_or_default())
    }

    async fn resolve_name(&self, href: &str) -> UpstreamResult<Option<String>> {
        self.name_lookups.fetch_add(1, Ordering::SeqCst);
        match self.names.get(href) {
            Some(name) => Ok(Some(name.clone())),
            None => Err(UpstreamError::Server {
                status: 404,
                body: "not found".into(),
            }),
        }
    }
}
