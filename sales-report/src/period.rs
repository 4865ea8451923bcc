//! Period presets
//!
//! Windows are resolved against a caller-supplied `today` so the same
//! preset is reproducible in tests; production callers pass today's date
//! in the scheduler timezone ([`today_in`]).

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use shared::{DateWindow, Period, ReportResult};

/// Named reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Today,
    Yesterday,
    /// Current Monday to Sunday
    Week,
    /// First of the month to today
    Month,
    /// Previous Monday to Sunday
    LastWeek,
    /// Whole previous calendar month
    LastMonth,
    /// Same calendar day one year earlier
    YearAgo,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Today => "today",
            PeriodKind::Yesterday => "yesterday",
            PeriodKind::Week => "week",
            PeriodKind::Month => "month",
            PeriodKind::LastWeek => "last_week",
            PeriodKind::LastMonth => "last_month",
            PeriodKind::YearAgo => "year_ago",
        }
    }

    /// Resolve to a window relative to `today`
    pub fn window(&self, today: NaiveDate) -> DateWindow {
        match self {
            PeriodKind::Today => DateWindow::day(today),
            PeriodKind::Yesterday => DateWindow::day(today - Duration::days(1)),
            PeriodKind::Week => {
                let monday = week_start(today);
                span(monday, monday + Duration::days(6))
            }
            PeriodKind::Month => span(month_start(today), today),
            PeriodKind::LastWeek => {
                let monday = week_start(today) - Duration::days(7);
                span(monday, monday + Duration::days(6))
            }
            PeriodKind::LastMonth => {
                let last_day = month_start(today) - Duration::days(1);
                span(month_start(last_day), last_day)
            }
            PeriodKind::YearAgo => DateWindow::day(year_ago(today)),
        }
    }

    /// Window plus its display label
    pub fn period(&self, today: NaiveDate) -> Period {
        Period::from_window(self.window(today))
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated custom period
pub fn custom(date_from: NaiveDate, date_to: NaiveDate) -> ReportResult<Period> {
    Ok(Period::from_window(DateWindow::new(date_from, date_to)?))
}

/// Today's date in `tz`
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

fn span(from: NaiveDate, to: NaiveDate) -> DateWindow {
    DateWindow {
        date_from: from,
        date_to: to,
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// Same day last year; Feb 29 falls back to Feb 28
fn year_ago(date: NaiveDate) -> NaiveDate {
    date.with_year(date.year() - 1)
        .unwrap_or_else(|| date - Duration::days(366))
}
