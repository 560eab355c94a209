//! Error type shared by the window calculator, classifier, and batch drivers.

use chrono::NaiveDate;

/// Everything that can go wrong while turning an input row into a report row.
///
/// The first four variants are per-row failures: the batch drivers catch them,
/// log them with the offending URL, and write [`AnalyticsError::marker`] into the
/// row instead of aborting. The rest are configuration or I/O failures that end
/// the run.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Invalid date range: {start} to {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analytics API call failed: {0}")]
    UpstreamFailure(String),

    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Invalid ladder '{name}': {reason}")]
    InvalidLadder { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalyticsError {
    /// Short code written into a report cell when a row could not be counted.
    pub fn marker(&self) -> &'static str {
        match self {
            AnalyticsError::InvalidRange { .. } => "invalid_range",
            AnalyticsError::InvalidInput(_) => "invalid_input",
            AnalyticsError::UpstreamFailure(_) => "upstream_failure",
            AnalyticsError::MalformedRow { .. } => "malformed_row",
            AnalyticsError::InvalidLadder { .. } => "invalid_ladder",
            AnalyticsError::Config(_) => "config_error",
            AnalyticsError::Io(_) => "io_error",
            AnalyticsError::Csv(_) => "csv_error",
            AnalyticsError::Json(_) => "json_error",
        }
    }

    /// Returns `true` for failures scoped to a single row.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            AnalyticsError::InvalidRange { .. }
                | AnalyticsError::InvalidInput(_)
                | AnalyticsError::UpstreamFailure(_)
                | AnalyticsError::MalformedRow { .. }
        )
    }
}

/// A convenience type alias for `Result<T, AnalyticsError>`.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
