//! Normalized transaction records

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Upstream transaction source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Customer purchase orders
    Order,
    /// Point-of-sale demands
    RetailSale,
    /// Point-of-sale returns
    RetailReturn,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Order, Channel::RetailSale, Channel::RetailReturn];

    /// Returns contribute negatively to running totals
    pub fn is_return(&self) -> bool {
        matches!(self, Channel::RetailReturn)
    }

    /// Whether upstream date filters for this channel need local re-checking
    pub fn refilters_locally(&self) -> bool {
        matches!(self, Channel::Order | Channel::RetailSale)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Order => write!(f, "order"),
            Channel::RetailSale => write!(f, "retail_sale"),
            Channel::RetailReturn => write!(f, "retail_return"),
        }
    }
}

/// How a line item identifies its product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    /// Inline display name (present when the upstream expanded it)
    pub name: Option<String>,
    /// Reference handle resolvable with one extra fetch
    pub href: Option<String>,
}

/// One position of a transaction, signed like its parent record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductRef,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// One normalized transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// Upstream identifier, unique within its channel
    pub id: String,
    pub channel: Channel,
    /// Transaction moment, upstream-local
    pub timestamp: Option<NaiveDateTime>,
    /// Major currency units; returns are negative
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Populated only when line-item detail was fetched
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub quantity: Option<Decimal>,
    /// Point of sale label
    pub store: Option<String>,
    /// Display name/number
    pub label: String,
    /// Upstream document state name
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LineItem>,
}

impl SalesRecord {
    /// Magnitude of the record regardless of sign
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }
}
