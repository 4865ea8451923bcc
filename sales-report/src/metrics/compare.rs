//! Period-over-period comparison

use rust_decimal::Decimal;
use shared::{ComparisonResult, Direction, MetricChange, SalesTotals};

/// Change of one metric
///
/// A zero baseline is not an error: the change is reported as 100% when
/// the current value is positive and 0% otherwise. Results that overflow
/// the decimal range saturate at `Decimal::MAX` / `Decimal::MIN`.
pub fn metric_change(current: Decimal, previous: Decimal) -> MetricChange {
    let absolute_change = current
        .checked_sub(previous)
        .unwrap_or_else(|| saturate(current > previous));
    let percent_change = if previous.is_zero() {
        if current > Decimal::ZERO {
            Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    } else {
        absolute_change
            .checked_div(previous.abs())
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or_else(|| saturate(absolute_change > Decimal::ZERO))
    };

    let direction = match percent_change.cmp(&Decimal::ZERO) {
        std::cmp::Ordering::Greater => Direction::Up,
        std::cmp::Ordering::Less => Direction::Down,
        std::cmp::Ordering::Equal => Direction::Same,
    };

    MetricChange {
        current,
        previous,
        absolute_change,
        percent_change,
        direction,
    }
}

fn saturate(positive: bool) -> Decimal {
    if positive { Decimal::MAX } else { Decimal::MIN }
}

/// Compare any two reports over the four tracked metrics
pub fn compare<C, P>(current: &C, previous: &P) -> ComparisonResult
where
    C: SalesTotals + ?Sized,
    P: SalesTotals + ?Sized,
{
    ComparisonResult {
        current_period: current.period().clone(),
        previous_period: previous.period().clone(),
        total_amount: metric_change(current.total_amount(), previous.total_amount()),
        total_count: metric_change(
            Decimal::from(current.total_count()),
            Decimal::from(previous.total_count()),
        ),
        average_amount: metric_change(current.average_amount(), previous.average_amount()),
        quantity_total: metric_change(current.quantity_total(), previous.quantity_total()),
    }
}
