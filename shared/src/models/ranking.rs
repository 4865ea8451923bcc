//! Cross-channel product ranking

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Display name used when a product cannot be resolved
pub const UNNAMED_PRODUCT: &str = "unnamed";

/// Product aggregated across channels by resolved name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRankEntry {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}
