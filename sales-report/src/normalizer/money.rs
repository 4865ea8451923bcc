//! Money conversion
//!
//! The upstream reports every monetary field in minor units (kopecks) as a
//! JSON float. [`from_minor`] is the only place that divides by 100.

use rust_decimal::prelude::*;

/// Minor units per major currency unit
pub const MINOR_PER_MAJOR: Decimal = Decimal::ONE_HUNDRED;

/// Convert an upstream float to `Decimal`
///
/// Non-finite input (never sent by a well-behaved upstream) becomes zero.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite upstream number, defaulting to zero");
        Decimal::ZERO
    })
}

/// Minor units (kopecks) to major units (roubles)
#[inline]
pub fn from_minor(value: f64) -> Decimal {
    to_decimal(value) / MINOR_PER_MAJOR
}

/// Line total in major units: `quantity * price * (1 - discount%)`
pub fn line_amount(quantity: Decimal, price_minor: f64, discount_percent: f64) -> Decimal {
    let discount = to_decimal(discount_percent).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let factor = (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED;
    quantity * from_minor(price_minor) * factor
}

/// Round for display (2 decimal places, half away from zero)
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
