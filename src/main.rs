//! CLI entry point for the Romanian energy dataset tool.
//!
//! Provides subcommands for cleaning a raw export into the canonical table,
//! inspecting missing values, and computing the statistics report and
//! dashboard series over a canonical table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ro_energy::analyzers::aggregate::{AggregateQuery, Granularity, aggregate};
use ro_energy::analyzers::describe::describe;
use ro_energy::config::PipelineConfig;
use ro_energy::output::{print_json, write_json};
use ro_energy::parser::{self, Encoding};
use ro_energy::pipeline::Pipeline;
use ro_energy::quality::{ImputeStrategy, KeepPolicy, detect_bad_rows, report_missing};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ro_energy")]
#[command(about = "Clean and analyze the Romanian energy production/consumption dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw CSV and write the canonical table
    Clean {
        /// Raw input file (.csv or .csv.gz)
        #[arg(short, long)]
        input: PathBuf,

        /// Canonical output file (.csv or .csv.gz)
        #[arg(short, long, default_value = "energie_transformata.csv")]
        output: PathBuf,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Imputation strategy: drop, ffill, median or mode
        #[arg(short, long)]
        strategy: Option<ImputeStrategy>,

        /// Duplicate keep policy: first, last or none
        #[arg(short, long)]
        keep: Option<KeepPolicy>,

        /// Columns forming the duplicate key (default: whole row)
        #[arg(long, value_delimiter = ',')]
        key: Option<Vec<String>>,

        /// Missing-value percentage above which a row is flagged
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Remove flagged rows before imputation
        #[arg(long, default_value_t = false)]
        drop_bad_rows: bool,

        /// Input encoding: utf-8, utf-8-lossy or latin-1
        #[arg(short, long)]
        encoding: Option<Encoding>,

        /// Write the run report as JSON here instead of stdout
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the missing-value summary of a raw CSV
    Missing {
        #[arg(short, long)]
        input: PathBuf,

        /// Missing-value percentage above which a row is flagged
        #[arg(short, long, default_value_t = 50.0)]
        threshold: f64,

        #[arg(short, long, default_value = "utf-8")]
        encoding: Encoding,
    },
    /// Compute the descriptive statistics report over a canonical CSV
    Describe {
        #[arg(short, long, default_value = "energie_transformata.csv")]
        input: PathBuf,

        /// Write the report as JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Filter and group metrics of a canonical CSV for charting
    Aggregate {
        #[arg(short, long, default_value = "energie_transformata.csv")]
        input: PathBuf,

        /// Metric columns to aggregate
        #[arg(short, long, value_delimiter = ',', required = true)]
        metric: Vec<String>,

        #[arg(long)]
        year: Option<i64>,

        #[arg(long)]
        month: Option<i64>,

        #[arg(long)]
        hour: Option<i64>,

        /// hourly (mean per hour), daily (sum per day) or monthly (sum per month)
        #[arg(short, long, default_value = "hourly")]
        granularity: Granularity,

        /// Write the series as JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct MissingOutput {
    summary: ro_energy::quality::MissingSummary,
    threshold_pct: f64,
    bad_rows: usize,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ro_energy.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ro_energy.log"));

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
        Commands::Clean {
            input,
            output,
            config,
            strategy,
            keep,
            key,
            threshold,
            drop_bad_rows,
            encoding,
            report,
        } => {
            let mut cfg = match &config {
                Some(path) => PipelineConfig::load(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            if let Some(strategy) = strategy {
                cfg.strategy = strategy;
            }
            if let Some(keep) = keep {
                cfg.keep = keep;
            }
            if key.is_some() {
                cfg.duplicate_key = key;
            }
            if let Some(threshold) = threshold {
                cfg.bad_row_threshold = threshold;
            }
            if let Some(encoding) = encoding {
                cfg.encoding = encoding;
            }
            cfg.drop_bad_rows |= drop_bad_rows;

            info!(
                strategy = %cfg.strategy,
                keep = %cfg.keep,
                threshold = cfg.bad_row_threshold,
                "Starting clean"
            );
            let run = Pipeline::new(cfg)
                .run(&input, &output)
                .with_context(|| format!("cleaning {}", input.display()))?;

            match report {
                Some(path) => write_json(&path, &run)?,
                None => print_json(&run)?,
            }
        }
        Commands::Missing {
            input,
            threshold,
            encoding,
        } => {
            let options = parser::LoadOptions {
                encoding,
                ..parser::LoadOptions::default()
            };
            let table = parser::load(&input, &options)
                .with_context(|| format!("loading {}", input.display()))?;
            let summary = report_missing(&table);
            let bad = detect_bad_rows(&table, threshold)?;

            print_json(&MissingOutput {
                summary,
                threshold_pct: threshold,
                bad_rows: bad.n_rows(),
            })?;
        }
        Commands::Describe { input, output } => {
            let table = parser::load(&input, &parser::LoadOptions::default())
                .with_context(|| format!("loading {}", input.display()))?;
            let report = describe(&table);

            match output {
                Some(path) => write_json(&path, &report)?,
                None => print_json(&report)?,
            }
        }
        Commands::Aggregate {
            input,
            metric,
            year,
            month,
            hour,
            granularity,
            output,
        } => {
            let table = parser::load(&input, &parser::LoadOptions::default())
                .with_context(|| format!("loading {}", input.display()))?;
            let query = AggregateQuery {
                year,
                month,
                hour,
                metrics: metric,
                granularity,
            };
            let report = aggregate(&table, &query)?;

            match output {
                Some(path) => write_json(&path, &report)?,
                None => print_json(&report)?,
            }
        }
    }

    Ok(())
}
