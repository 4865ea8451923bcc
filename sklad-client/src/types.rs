//! Raw upstream payload shapes
//!
//! Field names follow the upstream JSON (camelCase). Monetary fields are in
//! minor units (kopecks) exactly as received; conversion happens once, in
//! the normalizer.

use serde::Deserialize;

/// Listing / entity metadata
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub href: Option<String>,
    /// Total rows matching the filter
    pub size: Option<u64>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Present while more pages remain
    pub next_href: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub meta: Meta,
    /// Missing `rows` is a malformed response, not an empty page
    pub rows: Option<Vec<T>>,
}

impl<T> Page<T> {
    /// Whether a listing continues after this page
    pub fn has_more(&self, offset: u64, fetched: u64, limit: u32) -> bool {
        if fetched == 0 {
            return false;
        }
        match self.meta.size {
            Some(size) => offset + fetched < size,
            None => self.meta.next_href.is_some() || fetched >= u64::from(limit),
        }
    }
}

/// Reference to another entity, optionally expanded with its name
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub meta: Meta,
    pub name: Option<String>,
}

impl NamedRef {
    pub fn href(&self) -> Option<&str> {
        self.meta.href.as_deref()
    }
}

/// Positions collection: meta only, or expanded with rows
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Positions {
    #[serde(default)]
    pub meta: Meta,
    pub rows: Option<Vec<RawPosition>>,
}

/// One line item of a document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPosition {
    pub id: Option<String>,
    #[serde(default)]
    pub quantity: f64,
    /// Unit price in minor units
    #[serde(default)]
    pub price: f64,
    /// Discount percent
    #[serde(default)]
    pub discount: f64,
    pub assortment: Option<NamedRef>,
}

/// Order, retail demand or retail return document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Document moment, "YYYY-MM-DD HH:MM:SS.fff"
    pub moment: Option<String>,
    /// Creation time, same format
    pub created: Option<String>,
    /// Total in minor units
    #[serde(default)]
    pub sum: f64,
    pub state: Option<NamedRef>,
    pub retail_store: Option<NamedRef>,
    pub positions: Option<Positions>,
}

impl RawDocument {
    /// Inline positions, if the listing was expanded
    pub fn expanded_positions(&self) -> Option<&[RawPosition]> {
        self.positions
            .as_ref()
            .and_then(|p| p.rows.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_parses_expanded_listing() {
        let json = serde_json::json!({
            "meta": { "size": 1, "limit": 100, "offset": 0 },
            "rows": [{
                "id": "d1",
                "name": "00042",
                "moment": "2024-01-15 10:30:00.000",
                "sum": 150050.0,
                "state": { "meta": { "href": "https://x/state/1" }, "name": "Done" },
                "retailStore": { "meta": { "href": "https://x/store/1" }, "name": "Main" },
                "positions": {
                    "meta": { "href": "https://x/positions", "size": 1 },
                    "rows": [{
                        "quantity": 2.0,
                        "price": 75025.0,
                        "assortment": { "meta": { "href": "https://x/product/9" }, "name": "Tea" }
                    }]
                }
            }]
        });

        let page: Page<RawDocument> = serde_json::from_value(json).unwrap();
        let rows = page.rows.as_ref().unwrap();
        assert_eq!(rows.len(), 1);
        let doc = &rows[0];
        assert_eq!(doc.sum, 150050.0);
        assert_eq!(doc.retail_store.as_ref().unwrap().name.as_deref(), Some("Main"));
        let positions = doc.expanded_positions().unwrap();
        assert_eq!(positions[0].assortment.as_ref().unwrap().href(), Some("https://x/product/9"));
        assert!(!page.has_more(0, 1, 100));
    }

    #[test]
    fn test_unexpanded_positions_have_no_rows() {
        let doc: RawDocument = serde_json::from_value(serde_json::json!({
            "id": "d2",
            "positions": { "meta": { "href": "https://x/positions", "size": 3 } }
        }))
        .unwrap();
        assert!(doc.expanded_positions().is_none());
        assert_eq!(doc.sum, 0.0);
    }

    #[test]
    fn test_has_more_uses_size_then_next_href() {
        let sized: Page<RawDocument> = Page {
            meta: Meta { size: Some(5), ..Meta::default() },
            rows: Some(vec![]),
        };
        assert!(sized.has_more(0, 2, 2));
        assert!(!sized.has_more(4, 1, 2));

        let unsized_page: Page<RawDocument> = Page {
            meta: Meta { next_href: Some("next".into()), ..Meta::default() },
            rows: Some(vec![]),
        };
        assert!(unsized_page.has_more(0, 1, 100));
        assert!(!unsized_page.has_more(0, 0, 100));
    }
}
