//! Date windows and report periods

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};

/// Inclusive `[date_from, date_to]` calendar range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl DateWindow {
    /// Build a window, rejecting reversed ranges
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> ReportResult<Self> {
        if date_from > date_to {
            return Err(ReportError::BadRequest(format!(
                "window start {} is after end {}",
                date_from, date_to
            )));
        }
        Ok(Self { date_from, date_to })
    }

    /// Single-day window
    pub fn day(date: NaiveDate) -> Self {
        Self {
            date_from: date,
            date_to: date,
        }
    }

    /// Whether `date` falls inside the window (both ends inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.date_from <= date && date <= self.date_to
    }

    /// Number of calendar days covered
    pub fn days(&self) -> i64 {
        (self.date_to - self.date_from).num_days() + 1
    }

    /// "2024-01-15" for a single day, "2024-01-01 - 2024-01-31" otherwise
    pub fn label(&self) -> String {
        if self.date_from == self.date_to {
            self.date_from.format("%Y-%m-%d").to_string()
        } else {
            format!(
                "{} - {}",
                self.date_from.format("%Y-%m-%d"),
                self.date_to.format("%Y-%m-%d")
            )
        }
    }
}

/// Human-readable label plus the underlying window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    pub window: DateWindow,
}

impl Period {
    pub fn new(label: impl Into<String>, window: DateWindow) -> Self {
        Self {
            label: label.into(),
            window,
        }
    }

    /// Period labelled with its own date range
    pub fn from_window(window: DateWindow) -> Self {
        Self {
            label: window.label(),
            window,
        }
    }
}
