//! CLI entry point for the GA4 milestone reporter.
//!
//! Every subcommand builds one authenticated client and one session, then
//! walks its URLs sequentially, pausing between API calls.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use ga4_milestones::{
    analytics::Ga4Client,
    batch::{Session, TableReport, run_date_range, run_offsets, run_single, run_to_date, run_trend},
    config::{Settings, SettingsArgs, load_classifier},
    input::load_publications,
    output::{default_output_path, print_json, write_records, write_table},
    pacing::Pacer,
    window::{DATE_FORMAT, DateWindow, parse_date},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const INVALID_ROWS_FILE: &str = "invalid_date_published_rows.csv";

#[derive(Parser)]
#[command(name = "ga4_milestones")]
#[command(about = "Fetch GA4 user counts for URLs and bucket them into milestones", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Service-account key or authorized_user JSON for the analytics API [env: GA4_CREDENTIALS]
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// GA4 property ID [env: GA4_PROPERTY_ID]
    #[arg(long, global = true)]
    property_id: Option<String>,

    /// Seconds to wait between API requests [env: GA4_SLEEP_SECS, default: 10]
    #[arg(long, global = true)]
    sleep: Option<u64>,

    /// JSON file overriding the coarse and/or detailed milestone ladders
    #[arg(long, global = true)]
    ladders: Option<PathBuf>,

    /// Prefix stripped from URLs before matching page paths [env: GA4_SITE_PREFIX]
    #[arg(long, global = true)]
    site_prefix: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Users per URL for N days after each URL's publication date
    Offsets {
        /// Days after publication to collect data for (e.g. 30 90 360)
        #[arg(long = "days", num_args = 1.., default_values_t = [360])]
        days: Vec<u32>,

        /// CSV with "url" and "date_published" columns
        #[arg(short, long)]
        input_file: PathBuf,

        /// Output CSV [default: ga4_<input file name>]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Users per URL from its publication date up to a fixed end date
    ToDate {
        /// End date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,

        /// CSV with "url" and "date_published" columns
        #[arg(short, long)]
        input_file: PathBuf,

        /// Output CSV [default: ga4_uptodate_<input file name>]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Users for a list of URLs over one shared date range
    DateRange {
        /// Start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        start_date: NaiveDate,

        /// End date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        end_date: NaiveDate,

        /// URLs to analyze
        #[arg(long, num_args = 1.., required = true)]
        urls: Vec<String>,

        /// Output CSV
        #[arg(short, long, default_value = "date_range_results.csv")]
        output: PathBuf,
    },
    /// One URL's growth over several periods after a start date
    Trend {
        /// URL to analyze
        #[arg(long)]
        url: String,

        /// Publication or start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        start_date: NaiveDate,

        /// Periods in days
        #[arg(long, num_args = 1.., default_values_t = [7, 14, 30, 60, 90, 180, 360])]
        periods: Vec<u32>,

        /// Optional output CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// One URL over the last N days
    Single {
        /// URL to analyze
        #[arg(long)]
        url: String,

        /// Number of days back from today
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Also log the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn parse_date_arg(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ga4_milestones.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ga4_milestones.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let settings = Settings::resolve(SettingsArgs {
        property_id: cli.common.property_id,
        credentials: cli.common.credentials,
        site_prefix: cli.common.site_prefix,
        sleep_secs: cli.common.sleep,
    })?;
    let classifier = load_classifier(cli.common.ladders.as_deref())?;
    debug!(
        coarse = ?classifier.coarse().rungs(),
        detailed = ?classifier.detailed().rungs(),
        "Milestone ladders"
    );

    info!("Initializing GA4 client");
    let client = Ga4Client::connect(&settings.ga4).await?;
    info!(property_id = %settings.property_id, sleep_secs = settings.sleep.as_secs(), "GA4 client initialized");

    let mut session = Session::new(
        &client,
        &classifier,
        settings.property_id.clone(),
        Pacer::new(settings.sleep),
    );

    match cli.command {
        Commands::Offsets {
            days,
            input_file,
            output,
        } => {
            info!(days = ?days, "Collecting data for day periods");
            let input = load_publications(&input_file)?;
            let report = run_offsets(&mut session, &input, &days).await?;
            let output = output.unwrap_or_else(|| default_output_path("ga4_", &input_file));
            save_table_report(&report, &output)?;
        }
        Commands::ToDate {
            date,
            input_file,
            output,
        } => {
            info!(end_date = %date.format(DATE_FORMAT), "Collecting data up to end date");
            let input = load_publications(&input_file)?;
            let report = run_to_date(&mut session, &input, date).await?;
            let output =
                output.unwrap_or_else(|| default_output_path("ga4_uptodate_", &input_file));
            save_table_report(&report, &output)?;
        }
        Commands::DateRange {
            start_date,
            end_date,
            urls,
            output,
        } => {
            let window = DateWindow::new(start_date, end_date)?;
            info!(urls = urls.len(), window = %window, "Analyzing URLs over date range");
            let report = run_date_range(&mut session, &urls, window).await?;
            write_records(&output, &report.rows)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        Commands::Trend {
            url,
            start_date,
            periods,
            output,
        } => {
            let rows = run_trend(&mut session, &url, start_date, &periods).await?;
            for row in &rows {
                info!(days = row.days, users = %row.users, category = %row.category, "Period");
            }
            if let Some(output) = output {
                write_records(&output, &rows)
                    .with_context(|| format!("failed to write {}", output.display()))?;
            }
        }
        Commands::Single { url, days, json } => {
            let today = Local::now().date_naive();
            let window = DateWindow::trailing(today, days)?;
            let m = run_single(&mut session, &url, window).await?;
            if json {
                print_json(&serde_json::json!({
                    "url": url,
                    "start_date": m.window.start_str(),
                    "end_date": m.window.end_str(),
                    "users": m.users,
                    "category": m.category.label(),
                    "detailed_category": m.detailed.label(),
                }))?;
            }
        }
    }

    info!(api_calls = session.calls(), "Done");
    Ok(())
}

/// Writes the report and, if any rows were unreadable, the invalid-rows file.
fn save_table_report(report: &TableReport, output: &Path) -> Result<()> {
    write_table(output, &report.headers, &report.rows)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if !report.invalid.is_empty() {
        write_records(Path::new(INVALID_ROWS_FILE), &report.invalid)
            .with_context(|| format!("failed to write {INVALID_ROWS_FILE}"))?;
        info!(
            count = report.invalid.len(),
            path = INVALID_ROWS_FILE,
            "Saved rows with invalid date_published"
        );
    }
    Ok(())
}

