//! Metric calculator, comparative analyzer and combined report composer
//!
//! All pure: no I/O, deterministic, independent of input ordering.

pub mod calculator;
pub mod combine;
pub mod compare;

use rust_decimal::Decimal;

pub use calculator::{Metrics, reduce, reduce_retail};
pub use combine::combine;
pub use compare::{compare, metric_change};

/// `part` as a percentage of `total`; zero when `total` is not positive
pub fn share(part: Decimal, total: Decimal) -> Decimal {
    if total <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        part / total * Decimal::ONE_HUNDRED
    }
}
