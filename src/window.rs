//! Report date windows derived from a publication date.
//!
//! All arithmetic is in calendar days on [`NaiveDate`], so the result does not
//! depend on the time zone the tool runs in. A window ending `d` days after
//! publication ends on exactly `publication_date + d`, for every offset.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::{AnalyticsError, Result};

/// Format used for dates on the wire and in CSV output.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An inclusive `[start, end]` range of calendar days. Always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Builds a window, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(AnalyticsError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to and including `today`.
    pub fn trailing(today: NaiveDate, days: u32) -> Result<Self> {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or_else(|| AnalyticsError::InvalidInput(format!("{days} days before {today} is out of range")))?;
        Self::new(start, today)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_str(), self.end_str())
    }
}

/// One window per offset, in the order the offsets were given.
///
/// Duplicates are kept so that per-offset output columns stay aligned with the
/// caller's list.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidRange`] for a zero offset or one that runs
/// past the last representable date.
pub fn windows_for(publication_date: NaiveDate, offsets: &[u32]) -> Result<Vec<DateWindow>> {
    offsets
        .iter()
        .map(|&days| window_after(publication_date, days))
        .collect()
}

/// The window `{publication_date, publication_date + days}`.
pub fn window_after(publication_date: NaiveDate, days: u32) -> Result<DateWindow> {
    if days == 0 {
        return Err(AnalyticsError::InvalidRange {
            start: publication_date,
            end: publication_date,
        });
    }
    let end = publication_date
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or(AnalyticsError::InvalidRange {
            start: publication_date,
            end: NaiveDate::MAX,
        })?;
    DateWindow::new(publication_date, end)
}

/// The window from publication up to a fixed end date shared by every URL.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidRange`] when the URL was published after
/// `end_date`.
pub fn window_to_fixed_end(publication_date: NaiveDate, end_date: NaiveDate) -> Result<DateWindow> {
    DateWindow::new(publication_date, end_date)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}
