//! CLI entry point for the ATSPM turning-movement-count tool.
//!
//! Fetches turning-movement counts for a set of signals and days, aligns them
//! to the signal timing plans, and exports the rows or a time-of-day summary.

use anyhow::{Context, Result};
use atspm_tmc::{
    align::align,
    batch::{RetryPolicy, TmcReport, TmcRequest, fetch_turning_movements},
    config::ClientConfig,
    flatten::flatten,
    output::{print_json, write_csv},
    report::{AtspmClient, ReportDocument},
    summary::{TimeWindow, summarize},
};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "atspm_tmc")]
#[command(
    about = "Turning-movement counts from the ATSPM report API, aligned to timing plans",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FetchArgs {
    /// Signal (location) identifier; repeat for several signals
    #[arg(short, long = "signal", value_name = "ID", required = true)]
    signals: Vec<String>,

    /// First day to query (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,

    /// Last day to query, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: NaiveDate,

    /// Bin size in minutes requested from the API
    #[arg(short, long, default_value_t = 5)]
    bin_size: u32,

    /// Maximum number of concurrent report requests
    #[arg(short, long, default_value_t = 5)]
    concurrency: usize,
}

impl FetchArgs {
    fn request(&self) -> TmcRequest {
        TmcRequest {
            location_ids: self.signals.clone(),
            start_date: self.start,
            end_date: self.end,
            bin_size_minutes: self.bin_size,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch counts and write the plan-aligned rows as CSV
    Tmc {
        #[command(flatten)]
        fetch: FetchArgs,

        /// CSV file to write
        #[arg(short, long, default_value = "tmc.csv")]
        output: PathBuf,

        /// Gzip-compress the CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Fetch counts and summarize volumes inside a time-of-day window
    Summary {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Window start, inclusive (HH:MM); defaults to midnight
        #[arg(long, value_parser = parse_time_of_day)]
        from: Option<NaiveTime>,

        /// Window end, inclusive (HH:MM); defaults to 23:59:59
        #[arg(long, value_parser = parse_time_of_day)]
        to: Option<NaiveTime>,

        /// Directory for daily_totals.csv and averages.csv
        #[arg(short = 'd', long, default_value = "summary")]
        output_dir: PathBuf,

        /// Gzip-compress the CSVs
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Flatten and align a saved report response without calling the API
    Align {
        /// Path to a JSON response of the turning-movement-count report
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Signal the response was fetched for
        #[arg(short, long)]
        location: String,

        /// CSV file to write
        #[arg(short, long, default_value = "tmc.csv")]
        output: PathBuf,
    },
}

fn parse_time_of_day(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| format!("'{raw}' is not a time of day (HH:MM or HH:MM:SS)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/atspm_tmc.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("atspm_tmc.log"));

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

    match cli.command {
        Commands::Tmc {
            fetch,
            output,
            gzip,
        } => {
            let report = run_batch(&fetch).await?;
            let written = write_csv(&output, &report.rows, gzip)?;
            info!(path = %written.display(), rows = report.rows.len(), "Aligned counts written");
        }
        Commands::Summary {
            fetch,
            from,
            to,
            output_dir,
            gzip,
        } => {
            let report = run_batch(&fetch).await?;
            let day = TimeWindow::all_day();
            let window = TimeWindow::new(from.unwrap_or(day.start), to.unwrap_or(day.end));
            let summary = summarize(&report.rows, window);

            write_csv(&output_dir.join("daily_totals.csv"), &summary.daily_totals, gzip)?;
            write_csv(&output_dir.join("averages.csv"), &summary.averages, gzip)?;
            print_json(&summary.averages)?;

            info!(
                output_dir = %output_dir.display(),
                daily_totals = summary.daily_totals.len(),
                averages = summary.averages.len(),
                "Summary written"
            );
        }
        Commands::Align {
            source,
            location,
            output,
        } => {
            let bytes = std::fs::read(&source)
                .with_context(|| format!("reading {}", source.display()))?;
            let doc: ReportDocument = serde_json::from_slice(&bytes)
                .with_context(|| format!("{} is not a report document", source.display()))?;

            let flat = flatten(&location, &doc);
            let alignment = align(flat.samples, flat.plans);
            let written = write_csv(&output, &alignment.rows, false)?;

            info!(
                path = %written.display(),
                rows = alignment.rows.len(),
                dropped = alignment.dropped.total(),
                skipped_records = flat.issues.len(),
                "Aligned counts written"
            );
        }
    }

    Ok(())
}

/// Runs one batch against the configured ATSPM deployment and reports
/// failed queries.
async fn run_batch(args: &FetchArgs) -> Result<TmcReport> {
    let config = ClientConfig::from_env();
    info!(base_url = %config.base_url, "Using ATSPM report API");

    let client = Arc::new(AtspmClient::from_config(&config)?);
    let report = fetch_turning_movements(
        client,
        &args.request(),
        RetryPolicy::from_config(&config),
        args.concurrency,
    )
    .await?;

    for failure in &report.failures {
        warn!(
            location = %failure.location_id,
            date = %failure.date,
            kind = ?failure.kind,
            attempts = failure.attempts,
            error = %failure.message,
            "No data for signal and day"
        );
    }
    if !report.is_complete() {
        warn!(
            failed_queries = report.failures.len(),
            skipped_records = report.issues.len(),
            "Report is partial"
        );
    }

    Ok(report)
}
