//! Writing reports to CSV.

use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;

/// Logs a value as pretty-printed JSON.
pub fn print_json<S: Serialize>(value: &S) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a header row and string rows, replacing any existing file.
pub fn write_table(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");
    let mut writer = WriterBuilder::new().from_writer(File::create(path)?);

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Saved results");
    Ok(())
}

/// Serializes records to a CSV file with a header derived from the record type.
pub fn write_records<S: Serialize>(path: &Path, records: &[S]) -> Result<()> {
    debug!(path = %path.display(), rows = records.len(), "Writing CSV records");
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_writer(File::create(path)?);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = records.len(), "Saved results");
    Ok(())
}

/// `prefix` + the input file's name, in the current directory.
pub fn default_output_path(prefix: &str, input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results.csv".to_string());
    PathBuf::from(format!("{prefix}{name}"))
}
