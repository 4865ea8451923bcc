//! Cross-channel composition

use rust_decimal::Decimal;
use shared::{CombinedReport, Report, RetailReport};

use super::share;

/// Pair a retail and an orders report for the same window
///
/// Precondition: both reports cover the identical window. This is not
/// checked here.
pub fn combine(retail: RetailReport, orders: Report) -> CombinedReport {
    let combined_total = retail.base.total_amount + orders.total_amount;
    let (retail_share, orders_share) = if combined_total.is_zero() {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        (
            share(retail.base.total_amount, combined_total),
            share(orders.total_amount, combined_total),
        )
    };

    CombinedReport {
        period: retail.base.period.clone(),
        retail,
        orders,
        combined_total,
        retail_share,
        orders_share,
    }
}
