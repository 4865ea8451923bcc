//! Period-over-period comparison

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::window::Period;

/// Movement of a metric between two periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Same,
}

/// One tracked metric, current vs previous
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricChange {
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub previous: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub absolute_change: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub percent_change: Decimal,
    pub direction: Direction,
}

/// Current vs previous report over the four tracked metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub current_period: Period,
    pub previous_period: Period,
    pub total_amount: MetricChange,
    pub total_count: MetricChange,
    pub average_amount: MetricChange,
    pub quantity_total: MetricChange,
}
