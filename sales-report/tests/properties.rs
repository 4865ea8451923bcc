//! Algebraic properties of the aggregation pipeline

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use sales_report::metrics::{Metrics, combine, reduce, reduce_retail};
use sales_report::normalizer::canonicalize;
use shared::{Channel, DateWindow, LineItem, Period, ProductRef, SalesRecord};

fn period() -> Period {
    Period::from_window(DateWindow::day(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
}

fn channel() -> impl Strategy<Value = Channel> {
    prop_oneof![
        Just(Channel::Order),
        Just(Channel::RetailSale),
        Just(Channel::RetailReturn),
    ]
}

prop_compose! {
    fn record()(
        id in "[a-z0-9]{1,8}",
        channel in channel(),
        cents in -1_000_000i64..1_000_000,
        quantity in proptest::option::of(-50i64..50),
        minute in proptest::option::of(0u32..1440),
        store in proptest::option::of(prop_oneof![Just("Main"), Just("Kiosk")]),
    ) -> SalesRecord {
        SalesRecord {
            id,
            channel,
            timestamp: minute.map(|m| {
                NaiveDate::from_ymd_opt(2024, 1, 15)
                    .unwrap()
                    .and_hms_opt(m / 60, m % 60, 0)
                    .unwrap()
            }),
            amount: Decimal::new(cents, 2),
            quantity: quantity.map(Decimal::from),
            store: store.map(str::to_string),
            label: "doc".into(),
            state: None,
            lines: quantity
                .map(|q| {
                    vec![LineItem {
                        product: ProductRef { name: Some("P".into()), href: None },
                        quantity: Decimal::from(q),
                        amount: Decimal::new(cents, 2),
                    }]
                })
                .unwrap_or_default(),
        }
    }
}

proptest! {
    #[test]
    fn reduction_is_associative(records in proptest::collection::vec(record(), 0..40), split in 0usize..40) {
        let split = split.min(records.len());
        let (left, right) = records.split_at(split);

        let whole = Metrics::from_records(&records);
        let merged = Metrics::from_records(left).merge(Metrics::from_records(right));

        prop_assert_eq!(whole.total_amount, merged.total_amount);
        prop_assert_eq!(whole.total_count, merged.total_count);
        prop_assert_eq!(whole.quantity_total, merged.quantity_total);
        prop_assert_eq!(whole.average_amount(), merged.average_amount());
    }

    #[test]
    fn reduction_ignores_order(records in proptest::collection::vec(record(), 0..40)) {
        let mut reversed = records.clone();
        reversed.reverse();
        prop_assert_eq!(reduce(&records, period()), reduce(&reversed, period()));
    }

    #[test]
    fn shares_sum_to_hundred(
        retail in proptest::collection::vec(record(), 0..20),
        orders in proptest::collection::vec(record(), 0..20),
    ) {
        let retail: Vec<_> = retail
            .into_iter()
            .filter(|r| r.channel != Channel::Order)
            .map(|r| canonicalize(SalesRecord { amount: r.amount.abs(), ..r }))
            .collect();
        let orders: Vec<_> = orders
            .into_iter()
            .map(|r| SalesRecord { channel: Channel::Order, amount: r.amount.abs(), ..r })
            .collect();

        let combined = combine(reduce_retail(&retail, period()), reduce(&orders, period()));
        if combined.combined_total > Decimal::ZERO {
            let sum = combined.retail_share + combined.orders_share;
            prop_assert!((sum - Decimal::ONE_HUNDRED).abs() < Decimal::new(1, 6), "sum = {}", sum);
        } else {
            prop_assert_eq!(combined.retail_share, Decimal::ZERO);
            prop_assert_eq!(combined.orders_share, Decimal::ZERO);
        }
    }

    #[test]
    fn canonicalize_is_idempotent(record in record()) {
        let once = canonicalize(record);
        let twice = canonicalize(once.clone());
        prop_assert_eq!(&once, &twice);
        if once.channel.is_return() {
            prop_assert!(once.amount <= Decimal::ZERO);
        }
    }
}
