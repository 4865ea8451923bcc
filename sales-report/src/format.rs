//! Report formatting
//!
//! The engine hands structured reports to a [`ReportFormatter`]; the
//! bundled [`MarkdownFormatter`] renders them for a chat channel that
//! understands basic Markdown (`*bold*`, `_italic_`).

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use shared::{
    Channel, CombinedReport, ComparisonResult, Direction, MetricChange, Period, ProductRankEntry,
    RecordDetail, Report, RetailReport,
};

use crate::normalizer::money::round_money;

/// Cells in the retail/orders share bar
pub const BAR_WIDTH: usize = 20;

/// Renders structured reports into message text
pub trait ReportFormatter: Send + Sync {
    fn report(&self, title: &str, report: &Report) -> String;
    fn retail(&self, report: &RetailReport) -> String;
    fn combined(&self, report: &CombinedReport) -> String;
    fn comparison(&self, result: &ComparisonResult) -> String;
    fn top_products(&self, period: &Period, entries: &[ProductRankEntry]) -> String;
    /// Layout used by scheduled deliveries
    fn scheduled(&self, title: &str, report: &CombinedReport) -> String;
    fn no_data(&self, period: &Period) -> String;
}

/// Amount with two decimals and space-grouped thousands: `1 234 567.80`
pub fn format_money(value: Decimal) -> String {
    let rounded = round_money(value);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Signed percentage with one decimal: `+12.5%`
pub fn format_percent(value: Decimal) -> String {
    let rounded = value.round_dp(1);
    if rounded > Decimal::ZERO {
        format!("+{:.1}%", rounded)
    } else {
        format!("{:.1}%", rounded)
    }
}

/// Quantities drop trailing zeros: `3`, `2.5`
pub fn format_quantity(value: Decimal) -> String {
    value.round_dp(3).normalize().to_string()
}

/// Text bar for a 0..=100 share
pub fn share_bar(share: Decimal) -> String {
    let cells = (share.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED) * Decimal::from(BAR_WIDTH)
        / Decimal::ONE_HUNDRED)
        .round();
    let filled = cells.to_usize().unwrap_or(0).min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Escape characters that would open Markdown entities
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "📈",
        Direction::Down => "📉",
        Direction::Same => "➖",
    }
}

fn channel_name(channel: Channel) -> &'static str {
    match channel {
        Channel::Order => "Order",
        Channel::RetailSale => "Sale",
        Channel::RetailReturn => "Return",
    }
}

/// Line-oriented message builder
#[derive(Debug, Default)]
struct MessageBuilder {
    buf: String,
}

impl MessageBuilder {
    fn line(&mut self, text: &str) {
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    fn finish(self) -> String {
        self.buf
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    fn write_totals(&self, b: &mut MessageBuilder, report: &Report) {
        b.line(&format!("💰 Total: *{}*", format_money(report.total_amount)));
        b.line(&format!("🧾 Count: *{}*", report.total_count));
        b.line(&format!("📊 Average: *{}*", format_money(report.average_amount)));
        if !report.quantity_total.is_zero() {
            b.line(&format!("📦 Items: *{}*", format_quantity(report.quantity_total)));
        }
    }

    fn write_details(&self, b: &mut MessageBuilder, details: &[RecordDetail]) {
        if details.is_empty() {
            return;
        }
        b.blank();
        b.line("_Latest:_");
        for d in details {
            let date = d
                .timestamp
                .map(|ts| ts.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".into());
            let mut line = format!(
                "• {} {} · {} · {}",
                channel_name(d.channel),
                escape(&d.label),
                date,
                format_money(d.amount)
            );
            if let Some(state) = &d.state {
                line.push_str(&format!(" · {}", escape(state)));
            }
            b.line(&line);
        }
    }

    fn write_retail_body(&self, b: &mut MessageBuilder, report: &RetailReport) {
        self.write_totals(b, &report.base);
        if report.returns_count > 0 {
            b.line(&format!(
                "↩️ Returns: *{}* ({})",
                format_money(report.returns_amount),
                report.returns_count
            ));
            b.line(&format!("🟰 Net: *{}*", format_money(report.net_amount())));
        }
        if !report.stores.is_empty() {
            b.blank();
            b.line("_By store:_");
            for store in &report.stores {
                b.line(&format!(
                    "• {}: {} ({:.1}%)",
                    escape(&store.name),
                    format_money(store.amount),
                    store.share.round_dp(1)
                ));
            }
        }
    }

    fn write_change(&self, b: &mut MessageBuilder, name: &str, change: &MetricChange, money: bool) {
        let render = |v: Decimal| {
            if money {
                format_money(v)
            } else {
                format_quantity(v)
            }
        };
        b.line(&format!(
            "{} {}: {} → {} ({}, {})",
            arrow(change.direction),
            name,
            render(change.previous),
            render(change.current),
            render(change.absolute_change),
            format_percent(change.percent_change)
        ));
    }

    fn write_combined_body(&self, b: &mut MessageBuilder, report: &CombinedReport) {
        b.line(&format!("💰 Combined: *{}*", format_money(report.combined_total)));
        b.blank();
        b.line(&format!(
            "🏪 Retail {:.1}%  {}",
            report.retail_share.round_dp(1),
            share_bar(report.retail_share)
        ));
        b.line(&format!(
            "📋 Orders {:.1}%  {}",
            report.orders_share.round_dp(1),
            share_bar(report.orders_share)
        ));
        b.blank();
        b.line("*Retail*");
        self.write_retail_body(b, &report.retail);
        b.blank();
        b.line("*Orders*");
        self.write_totals(b, &report.orders);
    }

    /// Heading line, period line, blank line
    fn header(&self, b: &mut MessageBuilder, heading: &str, period_label: &str) {
        b.line(heading);
        b.line(&format!("📅 {period_label}"));
        b.blank();
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn report(&self, title: &str, report: &Report) -> String {
        if report.is_empty() {
            return self.no_data(&report.period);
        }
        let mut b = MessageBuilder::default();
        self.header(&mut b, &format!("*{}*", escape(title)), &report.period.label);
        self.write_totals(&mut b, report);
        self.write_details(&mut b, &report.details);
        b.finish()
    }

    fn retail(&self, report: &RetailReport) -> String {
        if report.is_empty() {
            return self.no_data(&report.base.period);
        }
        let mut b = MessageBuilder::default();
        self.header(&mut b, "*Retail sales*", &report.base.period.label);
        self.write_retail_body(&mut b, report);
        self.write_details(&mut b, &report.base.details);
        b.finish()
    }

    fn combined(&self, report: &CombinedReport) -> String {
        if report.is_empty() {
            return self.no_data(&report.period);
        }
        let mut b = MessageBuilder::default();
        self.header(&mut b, "*Sales overview*", &report.period.label);
        self.write_combined_body(&mut b, report);
        b.finish()
    }

    fn comparison(&self, result: &ComparisonResult) -> String {
        let mut b = MessageBuilder::default();
        self.header(
            &mut b,
            "*Comparison*",
            &format!("{} vs {}", result.current_period.label, result.previous_period.label),
        );
        self.write_change(&mut b, "Total", &result.total_amount, true);
        self.write_change(&mut b, "Count", &result.total_count, false);
        self.write_change(&mut b, "Average", &result.average_amount, true);
        self.write_change(&mut b, "Items", &result.quantity_total, false);
        b.finish()
    }

    fn top_products(&self, period: &Period, entries: &[ProductRankEntry]) -> String {
        if entries.is_empty() {
            return self.no_data(period);
        }
        let mut b = MessageBuilder::default();
        self.header(&mut b, "*Top products*", &period.label);
        for (rank, entry) in entries.iter().enumerate() {
            b.line(&format!(
                "{}. {} · {} pcs · {}",
                rank + 1,
                escape(&entry.name),
                format_quantity(entry.quantity),
                format_money(entry.amount)
            ));
        }
        b.finish()
    }

    fn scheduled(&self, title: &str, report: &CombinedReport) -> String {
        if report.is_empty() {
            return self.no_data(&report.period);
        }
        let mut b = MessageBuilder::default();
        self.header(&mut b, &format!("🔔 *{}*", escape(title)), &report.period.label);
        self.write_combined_body(&mut b, report);
        b.finish()
    }

    fn no_data(&self, period: &Period) -> String {
        format!("📭 No data for this period ({}).", period.label)
    }
}
