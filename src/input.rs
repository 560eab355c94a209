//! Loading publication records from the input CSV.
//!
//! The file must have `url` and `date_published` headers. A `regex` column,
//! when present, overrides the page-path pattern for that row. Every column is
//! kept so the report can pass it through unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{AnalyticsError, Result};
use crate::window::parse_date;

pub const URL_COLUMN: &str = "url";
pub const DATE_COLUMN: &str = "date_published";
pub const REGEX_COLUMN: &str = "regex";

/// A URL and the day it was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationRecord {
    /// 1-based data row number.
    pub row: usize,
    pub url: String,
    pub date_published: NaiveDate,
    pub regex: Option<String>,
}

/// One data row: its raw cells plus the parsed record, or why parsing failed.
#[derive(Debug)]
pub struct InputRow {
    pub row: usize,
    pub url: String,
    pub fields: Vec<String>,
    pub record: Result<PublicationRecord>,
}

/// The whole input file.
#[derive(Debug)]
pub struct InputTable {
    pub headers: Vec<String>,
    pub rows: Vec<InputRow>,
}

impl InputTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn malformed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.record.is_err()).count()
    }
}

/// Opens and reads the input CSV at `path`.
pub fn load_publications(path: &Path) -> Result<InputTable> {
    info!(path = %path.display(), "Loading input CSV");
    let file = File::open(path).map_err(|e| {
        AnalyticsError::Config(format!("cannot open input file {}: {e}", path.display()))
    })?;
    read_publications(file)
}

/// Reads publication rows from any CSV source.
///
/// # Errors
///
/// Returns [`AnalyticsError::Config`] if a required header is missing; that
/// aborts the run. Bad rows do not fail the read: they come back with a
/// [`AnalyticsError::MalformedRow`] record.
pub fn read_publications<R: Read>(reader: R) -> Result<InputTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AnalyticsError::Config(format!("input CSV has no '{name}' column")))
    };
    let url_idx = column(URL_COLUMN)?;
    let date_idx = column(DATE_COLUMN)?;
    let regex_idx = headers.iter().position(|h| h == REGEX_COLUMN);

    let mut rows = Vec::new();
    for (i, result) in rdr.byte_records().enumerate() {
        let record = result?;
        let row = i + 1;

        let mut fields: Vec<String> = record
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).into_owned())
            .collect();
        fields.resize(headers.len(), String::new());

        let url = fields[url_idx].trim().to_string();
        let parsed = match std::str::from_utf8(record.as_slice()) {
            Ok(_) => parse_row(row, &url, &fields[date_idx], regex_idx.map(|idx| fields[idx].as_str())),
            Err(e) => Err(AnalyticsError::MalformedRow {
                row,
                reason: format!("invalid UTF-8: {e}"),
            }),
        };
        if let Err(e) = &parsed {
            debug!(row, url = %url, error = %e, "Malformed input row");
        }

        rows.push(InputRow {
            row,
            url,
            fields,
            record: parsed,
        });
    }

    info!(rows = rows.len(), "Input CSV loaded");
    Ok(InputTable { headers, rows })
}

fn parse_row(row: usize, url: &str, date: &str, regex: Option<&str>) -> Result<PublicationRecord> {
    if url.is_empty() {
        return Err(AnalyticsError::MalformedRow {
            row,
            reason: "missing url".into(),
        });
    }
    let date_published = parse_published(date).ok_or_else(|| AnalyticsError::MalformedRow {
        row,
        reason: if date.trim().is_empty() {
            "missing date_published".into()
        } else {
            format!("invalid date_published '{}'", date.trim())
        },
    })?;
    let regex = regex
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    Ok(PublicationRecord {
        row,
        url: url.to_string(),
        date_published,
        regex,
    })
}

/// Parses a publication date, keeping only the calendar day.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and RFC 3339.
pub fn parse_published(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    parse_date(value)
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}
