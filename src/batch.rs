//! Batch drivers: turn input rows into report rows, one API call at a time.
//!
//! Calls run strictly in input order through a [`Session`], which owns the
//! pacing state for a single run. A failure on one row (API error, bad date,
//! window before publication) is logged with its URL and written into that row
//! as the error's [`marker`](AnalyticsError::marker); the batch carries on.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::analytics::UserCountSource;
use crate::error::{AnalyticsError, Result};
use crate::input::InputTable;
use crate::milestone::{Category, DetailedCategory, MilestoneClassifier};
use crate::pacing::Pacer;
use crate::window::{DATE_FORMAT, DateWindow, window_after, window_to_fixed_end, windows_for};

/// One counted and classified window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub window: DateWindow,
    pub users: u64,
    pub category: Category,
    pub detailed: DetailedCategory,
}

impl Measurement {
    fn cells(&self) -> [String; 3] {
        [
            self.users.to_string(),
            self.category.to_string(),
            self.detailed.to_string(),
        ]
    }
}

fn marker_cells(err: &AnalyticsError) -> [String; 3] {
    std::array::from_fn(|_| err.marker().to_string())
}

fn cells(result: &Result<Measurement>) -> [String; 3] {
    match result {
        Ok(m) => m.cells(),
        Err(e) => marker_cells(e),
    }
}

/// The API client, classifier and pacing state for one run.
pub struct Session<'a, S: ?Sized> {
    source: &'a S,
    classifier: &'a MilestoneClassifier,
    property_id: String,
    pacer: Pacer,
}

impl<'a, S: UserCountSource + ?Sized> Session<'a, S> {
    pub fn new(
        source: &'a S,
        classifier: &'a MilestoneClassifier,
        property_id: impl Into<String>,
        pacer: Pacer,
    ) -> Self {
        Self {
            source,
            classifier,
            property_id: property_id.into(),
            pacer,
        }
    }

    /// Number of API calls issued so far.
    pub fn calls(&self) -> usize {
        self.pacer.calls()
    }

    /// Counts users for `url` in `window` and classifies the result.
    pub async fn measure(
        &mut self,
        url: &str,
        window: DateWindow,
        custom_regex: Option<&str>,
    ) -> Result<Measurement> {
        self.pacer.wait_turn().await;
        let users = self
            .source
            .get_user_count(&self.property_id, url, &window, custom_regex)
            .await?;
        let (category, detailed) = self.classifier.classify_both(users)?;
        Ok(Measurement {
            window,
            users,
            category,
            detailed,
        })
    }
}

/// A row that could not be read from the input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRow {
    pub row: usize,
    pub url: String,
    pub reason: String,
}

/// Input columns plus appended result columns.
#[derive(Debug, Clone, Default)]
pub struct TableReport {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub invalid: Vec<InvalidRow>,
    pub failures: usize,
}

impl TableReport {
    fn with_headers(input: &InputTable, extra: impl IntoIterator<Item = String>) -> Self {
        let mut headers = input.headers.clone();
        headers.extend(extra);
        Self {
            headers,
            rows: Vec::with_capacity(input.len()),
            ..Default::default()
        }
    }
}

pub fn users_column(days: u32) -> String {
    format!("users_{days}_days")
}

pub fn milestone_column(days: u32) -> String {
    format!("milestone_{days}_days")
}

pub fn detailed_milestone_column(days: u32) -> String {
    format!("detailed_milestone_{days}_days")
}

fn malformed(input: &crate::input::InputRow, err: &AnalyticsError) -> InvalidRow {
    let reason = match err {
        AnalyticsError::MalformedRow { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    InvalidRow {
        row: input.row,
        url: input.url.clone(),
        reason,
    }
}

/// One window per offset; an offset that overflows the calendar fails alone.
fn offset_windows(start: NaiveDate, offsets: &[u32]) -> Vec<Result<DateWindow>> {
    match windows_for(start, offsets) {
        Ok(windows) => windows.into_iter().map(Ok).collect(),
        Err(_) => offsets.iter().map(|&days| window_after(start, days)).collect(),
    }
}

fn log_failure(url: &str, err: &AnalyticsError) {
    match err {
        AnalyticsError::UpstreamFailure(_) => error!(url, error = %err, "Failed to fetch user count"),
        _ => warn!(url, error = %err, "Skipping window"),
    }
}

/// Counts users for every row over `publication + d` days for each offset.
///
/// Adds `users_{d}_days`, `milestone_{d}_days` and `detailed_milestone_{d}_days`
/// per offset, in offset order.
///
/// # Errors
///
/// Only configuration problems abort: no offsets, or a zero offset.
#[tracing::instrument(skip_all, fields(rows = input.len(), offsets = ?offsets))]
pub async fn run_offsets<S: UserCountSource + ?Sized>(
    session: &mut Session<'_, S>,
    input: &InputTable,
    offsets: &[u32],
) -> Result<TableReport> {
    if offsets.is_empty() {
        return Err(AnalyticsError::Config("no day offsets supplied".into()));
    }
    if offsets.contains(&0) {
        return Err(AnalyticsError::Config("day offsets must be positive".into()));
    }

    let extra = offsets.iter().flat_map(|&d| {
        [users_column(d), milestone_column(d), detailed_milestone_column(d)]
    });
    let mut report = TableReport::with_headers(input, extra);
    let total = input.len();

    for row in &input.rows {
        let mut fields = row.fields.clone();

        let record = match &row.record {
            Ok(record) => record,
            Err(e) => {
                warn!(row = row.row, url = %row.url, error = %e, "Skipping row with missing or invalid date_published");
                report.invalid.push(malformed(row, e));
                for _ in offsets {
                    fields.extend(marker_cells(e));
                }
                report.rows.push(fields);
                continue;
            }
        };

        info!(row = row.row, total, url = %record.url, "Processing URL");

        let windows = offset_windows(record.date_published, offsets);

        for (&days, window) in offsets.iter().zip(windows) {
            let result = match window {
                Ok(window) => {
                    session
                        .measure(&record.url, window, record.regex.as_deref())
                        .await
                }
                Err(e) => Err(e),
            };

            match &result {
                Ok(m) => info!(url = %record.url, days, users = m.users, milestone = %m.category, "Fetched user count"),
                Err(e) => {
                    report.failures += 1;
                    log_failure(&record.url, e);
                }
            }
            fields.extend(cells(&result));
        }

        report.rows.push(fields);
    }

    info!(rows = report.rows.len(), invalid = report.invalid.len(), failures = report.failures, "Batch complete");
    Ok(report)
}

pub const USERS_COLUMN: &str = "users";
pub const MILESTONE_COLUMN: &str = "milestone";
pub const DETAILED_MILESTONE_COLUMN: &str = "detailed_milestone";

/// Counts users for every row from publication up to a shared `end_date`.
///
/// Rows published after `end_date` are skipped and marked `invalid_range`.
#[tracing::instrument(skip_all, fields(rows = input.len(), end_date = %end_date))]
pub async fn run_to_date<S: UserCountSource + ?Sized>(
    session: &mut Session<'_, S>,
    input: &InputTable,
    end_date: NaiveDate,
) -> Result<TableReport> {
    let extra = [USERS_COLUMN, MILESTONE_COLUMN, DETAILED_MILESTONE_COLUMN].map(String::from);
    let mut report = TableReport::with_headers(input, extra);
    let total = input.len();

    for row in &input.rows {
        let mut fields = row.fields.clone();

        let record = match &row.record {
            Ok(record) => record,
            Err(e) => {
                warn!(row = row.row, url = %row.url, error = %e, "Skipping row with missing or invalid date_published");
                report.invalid.push(malformed(row, e));
                fields.extend(marker_cells(e));
                report.rows.push(fields);
                continue;
            }
        };

        info!(row = row.row, total, url = %record.url, "Processing URL");

        let result = match window_to_fixed_end(record.date_published, end_date) {
            Ok(window) => {
                session
                    .measure(&record.url, window, record.regex.as_deref())
                    .await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(m) => info!(url = %record.url, window = %m.window, users = m.users, milestone = %m.category, "Fetched user count"),
            Err(e) => {
                report.failures += 1;
                log_failure(&record.url, e);
            }
        }
        fields.extend(cells(&result));
        report.rows.push(fields);
    }

    info!(rows = report.rows.len(), invalid = report.invalid.len(), failures = report.failures, "Batch complete");
    Ok(report)
}

/// One URL's counts over a window shared by every URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeRow {
    pub url: String,
    pub start_date: String,
    pub end_date: String,
    pub users: String,
    pub category: String,
    pub detailed_category: String,
}

#[derive(Debug, Clone, Default)]
pub struct RangeReport {
    pub rows: Vec<RangeRow>,
    pub total_users: u64,
    /// URL with the most users; the earliest one wins a tie.
    pub top: Option<(String, u64)>,
}

/// Counts users for each URL over the same fixed window.
#[tracing::instrument(skip_all, fields(urls = urls.len(), window = %window))]
pub async fn run_date_range<S: UserCountSource + ?Sized>(
    session: &mut Session<'_, S>,
    urls: &[String],
    window: DateWindow,
) -> Result<RangeReport> {
    let mut report = RangeReport::default();

    for (i, url) in urls.iter().enumerate() {
        let url = url.trim();
        info!(row = i + 1, total = urls.len(), url, "Processing URL");

        let result = if url.is_empty() {
            Err(AnalyticsError::MalformedRow {
                row: i + 1,
                reason: "missing url".into(),
            })
        } else {
            session.measure(url, window, None).await
        };

        match &result {
            Ok(m) => {
                info!(url, users = m.users, category = %m.category, detailed_category = %m.detailed, "Fetched user count");
                report.total_users = report.total_users.saturating_add(m.users);
                if report.top.as_ref().is_none_or(|(_, best)| m.users > *best) {
                    report.top = Some((url.to_string(), m.users));
                }
            }
            Err(e) => log_failure(url, e),
        }

        let [users, category, detailed_category] = cells(&result);
        report.rows.push(RangeRow {
            url: url.to_string(),
            start_date: window.start_str(),
            end_date: window.end_str(),
            users,
            category,
            detailed_category,
        });
    }

    info!(
        window = %window,
        urls = urls.len(),
        total_users = report.total_users,
        top_url = report.top.as_ref().map(|(url, _)| url.as_str()),
        top_users = report.top.as_ref().map(|(_, users)| *users),
        "Date range summary"
    );
    Ok(report)
}

/// One period of a URL's growth curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendRow {
    pub days: u32,
    pub start_date: String,
    pub end_date: String,
    pub users: String,
    pub category: String,
    pub detailed_category: String,
}

/// Counts one URL's users over growing periods after `start_date`.
///
/// Periods are reported in ascending order. A period whose end overflows the
/// calendar is marked `invalid_range` and the rest are still counted.
#[tracing::instrument(skip_all, fields(url = %url, start_date = %start_date))]
pub async fn run_trend<S: UserCountSource + ?Sized>(
    session: &mut Session<'_, S>,
    url: &str,
    start_date: NaiveDate,
    periods: &[u32],
) -> Result<Vec<TrendRow>> {
    if periods.is_empty() {
        return Err(AnalyticsError::Config("no periods supplied".into()));
    }
    if periods.contains(&0) {
        return Err(AnalyticsError::Config("periods must be positive".into()));
    }
    let mut periods = periods.to_vec();
    periods.sort_unstable();

    let windows = offset_windows(start_date, &periods);
    let mut rows = Vec::with_capacity(periods.len());

    for (&days, window) in periods.iter().zip(windows) {
        let end_date = window.as_ref().map(DateWindow::end_str).unwrap_or_default();
        let result = match window {
            Ok(window) => {
                info!(days, window = %window, "Fetching period");
                session.measure(url, window, None).await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(m) => info!(days, users = m.users, category = %m.category, "Fetched user count"),
            Err(e) => log_failure(url, e),
        }

        let [users, category, detailed_category] = cells(&result);
        rows.push(TrendRow {
            days,
            start_date: start_date.format(DATE_FORMAT).to_string(),
            end_date,
            users,
            category,
            detailed_category,
        });
    }

    Ok(rows)
}

/// Counts one URL over one window. Errors go straight back to the caller.
#[tracing::instrument(skip_all, fields(url = %url, window = %window))]
pub async fn run_single<S: UserCountSource + ?Sized>(
    session: &mut Session<'_, S>,
    url: &str,
    window: DateWindow,
) -> Result<Measurement> {
    let m = session.measure(url, window, None).await?;
    info!(
        users = m.users,
        category = %m.category,
        detailed_category = %m.detailed,
        "Single URL result"
    );
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::read_publications;
    use crate::window::parse_date;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Call = (String, DateWindow, Option<String>);

    /// Returns canned counts per URL; unknown URLs fail upstream.
    #[derive(Default)]
    struct StubSource {
        counts: HashMap<String, u64>,
        calls: Mutex<Vec<Call>>,
    }

    impl StubSource {
        fn with(counts: &[(&str, u64)]) -> Self {
            Self {
                counts: counts.iter().map(|(u, c)| (u.to_string(), *c)).collect(),
                calls: Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserCountSource for StubSource {
        async fn get_user_count(
            &self,
            _property_id: &str,
            url: &str,
            window: &DateWindow,
            custom_regex: Option<&str>,
        ) -> Result<u64> {
            self.calls.lock().unwrap().push((
                url.to_string(),
                *window,
                custom_regex.map(str::to_string),
            ));
            self.counts
                .get(url)
                .copied()
                .ok_or_else(|| AnalyticsError::UpstreamFailure(format!("no data for {url}")))
        }
    }

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn table(csv: &str) -> InputTable {
        read_publications(csv.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_offsets_two_rows_keep_order_and_classification() {
        let source = StubSource::with(&[("https://x/a", 750), ("https://x/b", 4500)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let input = table("url,date_published\nhttps://x/a,2023-06-01\nhttps://x/b,2023-06-15\n");

        let report = run_offsets(&mut session, &input, &[30]).await.unwrap();

        assert_eq!(
            report.headers,
            vec![
                "url",
                "date_published",
                "users_30_days",
                "milestone_30_days",
                "detailed_milestone_30_days"
            ]
        );
        assert_eq!(
            report.rows,
            vec![
                vec!["https://x/a", "2023-06-01", "750", "0-10k", "0-10k"],
                vec!["https://x/b", "2023-06-15", "4500", "0-10k", "0-10k"],
            ]
        );

        let calls = source.calls();
        assert_eq!(calls[0].1.end(), date("2023-07-01"));
        assert_eq!(calls[1].1.end(), date("2023-07-15"));
    }

    #[tokio::test]
    async fn test_offsets_with_custom_ladder_separates_rows() {
        use crate::milestone::{Ladder, Rung};
        let rung = |lower: u64, label: &str| Rung {
            lower,
            label: label.to_string(),
        };
        let classifier = MilestoneClassifier::new(
            Ladder::new("coarse", vec![rung(0, "Low"), rung(1000, "Medium"), rung(5000, "High")]).unwrap(),
            Ladder::detailed(),
        );
        let source = StubSource::with(&[("https://x/a", 750), ("https://x/b", 4500)]);
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let input = table("url,date_published\nhttps://x/a,2023-06-01\nhttps://x/b,2023-06-15\n");

        let report = run_offsets(&mut session, &input, &[30]).await.unwrap();
        assert_eq!(report.rows[0][3], "Low");
        assert_eq!(report.rows[1][3], "Medium");
    }

    #[tokio::test]
    async fn test_offsets_columns_follow_offset_order() {
        let source = StubSource::with(&[("https://x/a", 12_000)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let input = table("url,date_published\nhttps://x/a,2023-06-01\n");

        let report = run_offsets(&mut session, &input, &[90, 7, 90]).await.unwrap();

        assert_eq!(report.headers[2], "users_90_days");
        assert_eq!(report.headers[5], "users_7_days");
        assert_eq!(report.headers[8], "users_90_days");
        assert_eq!(report.rows[0].len(), 11);

        let ends: Vec<_> = source.calls().iter().map(|c| c.1.end_str()).collect();
        assert_eq!(ends, vec!["2023-08-30", "2023-06-08", "2023-08-30"]);
        assert_eq!(session.calls(), 3);
    }

    #[tokio::test]
    async fn test_upstream_failure_marks_row_and_continues() {
        let source = StubSource::with(&[("https://x/b", 45_000)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let input = table("url,date_published\nhttps://x/a,2023-06-01\nhttps://x/b,2023-06-01\n");

        let report = run_offsets(&mut session, &input, &[30]).await.unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(
            report.rows[0][2..],
            ["upstream_failure", "upstream_failure", "upstream_failure"]
        );
        assert_eq!(report.rows[1][2..], ["45000", ">40k", "40k-100k"]);
    }

    #[tokio::test]
    async fn test_malformed_rows_are_reported_and_not_queried() {
        let source = StubSource::with(&[("https://x/b", 1)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let input = table("url,date_published\nhttps://x/a,someday\nhttps://x/b,2023-06-01\n");

        let report = run_offsets(&mut session, &input, &[7, 30]).await.unwrap();

        assert_eq!(
            report.invalid,
            vec![InvalidRow {
                row: 1,
                url: "https://x/a".into(),
                reason: "invalid date_published 'someday'".into(),
            }]
        );
        assert!(report.rows[0][2..].iter().all(|c| c == "malformed_row"));
        assert_eq!(source.calls().len(), 2);
        assert!(source.calls().iter().all(|c| c.0 == "https://x/b"));
    }

    #[tokio::test]
    async fn test_row_regex_is_forwarded() {
        let source = StubSource::with(&[("https://x/a", 5)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let input = table("url,date_published,regex\nhttps://x/a,2023-06-01,^/a\n");

        run_offsets(&mut session, &input, &[1]).await.unwrap();
        assert_eq!(source.calls()[0].2.as_deref(), Some("^/a"));
    }

    #[tokio::test]
    async fn test_offsets_config_errors_abort() {
        let source = StubSource::default();
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let input = table("url,date_published\nhttps://x/a,2023-06-01\n");

        assert!(matches!(
            run_offsets(&mut session, &input, &[]).await,
            Err(AnalyticsError::Config(_))
        ));
        assert!(matches!(
            run_offsets(&mut session, &input, &[30, 0]).await,
            Err(AnalyticsError::Config(_))
        ));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_count_is_invalid_input() {
        let source = StubSource::with(&[("https://x/a", u64::MAX)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let input = table("url,date_published\nhttps://x/a,2023-06-01\n");

        let report = run_offsets(&mut session, &input, &[30]).await.unwrap();
        assert_eq!(report.rows[0][2], "invalid_input");
    }

    #[tokio::test]
    async fn test_to_date_skips_rows_published_after_end() {
        let source = StubSource::with(&[("https://x/a", 20_000), ("https://x/late", 1)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let input = table(
            "url,date_published\nhttps://x/a,2023-06-01\nhttps://x/late,2024-03-10\n",
        );

        let report = run_to_date(&mut session, &input, date("2023-12-31"))
            .await
            .unwrap();

        assert_eq!(
            report.headers[2..],
            ["users", "milestone", "detailed_milestone"]
        );
        assert_eq!(report.rows[0][2..], ["20000", "20-30k", "20-30k"]);
        assert_eq!(
            report.rows[1][2..],
            ["invalid_range", "invalid_range", "invalid_range"]
        );
        assert_eq!(source.calls().len(), 1);
        assert_eq!(source.calls()[0].1.end(), date("2023-12-31"));
    }

    #[tokio::test]
    async fn test_date_range_summary() {
        let source = StubSource::with(&[
            ("https://x/a", 100),
            ("https://x/b", 300),
            ("https://x/c", 300),
        ]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let window = DateWindow::new(date("2023-01-01"), date("2023-01-31")).unwrap();
        let urls: Vec<String> = ["https://x/a", "https://x/b", "https://x/c", "https://x/missing"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let report = run_date_range(&mut session, &urls, window).await.unwrap();

        assert_eq!(report.total_users, 700);
        assert_eq!(report.top, Some(("https://x/b".to_string(), 300)));
        assert_eq!(report.rows.len(), 4);
        assert_eq!(report.rows[0].start_date, "2023-01-01");
        assert_eq!(report.rows[0].end_date, "2023-01-31");
        assert_eq!(report.rows[3].users, "upstream_failure");
    }

    #[tokio::test]
    async fn test_trend_sorts_periods() {
        let source = StubSource::with(&[("https://x/a", 50_000)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());

        let rows = run_trend(&mut session, "https://x/a", date("2023-01-01"), &[90, 7, 30])
            .await
            .unwrap();

        let days: Vec<_> = rows.iter().map(|r| r.days).collect();
        assert_eq!(days, vec![7, 30, 90]);
        assert_eq!(rows[0].end_date, "2023-01-08");
        assert_eq!(rows[2].detailed_category, "40k-100k");
    }

    #[tokio::test]
    async fn test_offset_past_calendar_end_fails_alone() {
        let source = StubSource::with(&[("https://x/a", 15_000)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let near_end = NaiveDate::MAX - chrono::Days::new(10);
        let published = near_end.format(DATE_FORMAT).to_string();
        let input = InputTable {
            headers: vec!["url".into(), "date_published".into()],
            rows: vec![crate::input::InputRow {
                row: 1,
                url: "https://x/a".into(),
                fields: vec!["https://x/a".into(), published],
                record: Ok(crate::input::PublicationRecord {
                    row: 1,
                    url: "https://x/a".into(),
                    date_published: near_end,
                    regex: None,
                }),
            }],
        };

        let report = run_offsets(&mut session, &input, &[1, u32::MAX]).await.unwrap();

        assert_eq!(
            report.rows[0][2..],
            ["15000", "10-20k", "10-20k", "invalid_range", "invalid_range", "invalid_range"]
        );
        assert_eq!(report.failures, 1);
        assert_eq!(source.calls().len(), 1);
        assert_eq!(source.calls()[0].1.end(), near_end + chrono::Days::new(1));
    }

    #[tokio::test]
    async fn test_trend_period_past_calendar_end_fails_alone() {
        let source = StubSource::with(&[("https://x/a", 8)]);
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let near_end = NaiveDate::MAX - chrono::Days::new(10);

        let rows = run_trend(&mut session, "https://x/a", near_end, &[u32::MAX, 7])
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].days, 7);
        assert_eq!(rows[0].users, "8");
        assert_eq!(rows[1].days, u32::MAX);
        assert_eq!(rows[1].users, "invalid_range");
        assert_eq!(rows[1].end_date, "");
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_single_surfaces_errors() {
        let source = StubSource::default();
        let classifier = MilestoneClassifier::default();
        let mut session = Session::new(&source, &classifier, "1", Pacer::unpaced());
        let window = DateWindow::trailing(date("2024-03-01"), 30).unwrap();

        let err = run_single(&mut session, "https://x/a", window).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamFailure(_)));
    }
}
