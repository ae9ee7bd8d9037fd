//! calidx: query a calendar index built from a JSON vault snapshot.
//!
//! Usage:
//!   calidx --vault vault.json day 2024-03-01
//!   calidx --vault vault.json --config config.json span 2024-03-01 2024-03-07
//!   calidx --vault vault.json --holidays holidays.json span 2024-12-20 2024-12-31 --skip-empty

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use calendar_index::{DateKey, DayView, Holiday, InMemorySource, IndexConfig, IndexService};

/// Longest span `span` will print.
const MAX_SPAN_DAYS: i64 = 3_660;

#[derive(Parser)]
#[command(name = "calidx")]
#[command(about = "Build a calendar index from a vault snapshot and print what falls on given days")]
#[command(version)]
struct Cli {
    /// JSON array of documents: [{"path": ..., "metadata": {...}}]
    #[arg(long)]
    vault: PathBuf,

    /// Index configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Holidays (JSON object of date -> [{"name": ..., "region": ...}])
    #[arg(long)]
    holidays: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print everything on one day
    Day {
        /// Date as YYYY-MM-DD
        date: String,
    },

    /// Print every day from FROM to TO inclusive
    Span {
        from: String,
        to: String,

        /// Leave out days with nothing on them
        #[arg(long)]
        skip_empty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let mut index = build_index(&cli)?;

    let output = match &cli.command {
        Commands::Day { date } => {
            let date = parse_date(date)?;
            index.ensure_year_cached(date.year());
            serde_json::to_string_pretty(&index.get_day(date))?
        }
        Commands::Span {
            from,
            to,
            skip_empty,
        } => {
            let (from, to) = (parse_date(from)?, parse_date(to)?);
            if to < from {
                bail!("span end {to} is before start {from}");
            }
            if from.days_until(to) >= MAX_SPAN_DAYS {
                bail!("span {from}..{to} is longer than {MAX_SPAN_DAYS} days");
            }
            for year in from.year()..=to.year() {
                index.ensure_year_cached(year);
            }
            let days: Vec<DayView> = from
                .through(to)
                .map(|d| index.get_day(d))
                .filter(|view| !*skip_empty || !is_empty_day(view))
                .collect();
            serde_json::to_string_pretty(&days)?
        }
    };

    println!("{output}");
    Ok(())
}

fn build_index(cli: &Cli) -> Result<IndexService> {
    let config = match &cli.config {
        Some(path) => IndexConfig::from_json_str(&read(path)?)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => IndexConfig::default(),
    };
    let mut index = IndexService::new(config)?;

    if let Some(path) = &cli.holidays {
        let days: BTreeMap<DateKey, Vec<Holiday>> = serde_json::from_str(&read(path)?)
            .with_context(|| format!("invalid holidays file {}", path.display()))?;
        let mut by_year: BTreeMap<i32, BTreeMap<DateKey, Vec<Holiday>>> = BTreeMap::new();
        for (date, holidays) in days {
            by_year.entry(date.year()).or_default().insert(date, holidays);
        }
        for (year, days) in by_year {
            index.set_holidays_for_year(year, days);
        }
    }

    let source = InMemorySource::from_json_str(&read(&cli.vault)?)
        .with_context(|| format!("invalid vault {}", cli.vault.display()))?;
    let summary = index.index_vault(&source);
    tracing::info!(
        documents = summary.documents,
        ranges = summary.ranges,
        tasks = summary.tasks,
        "vault loaded"
    );
    Ok(index)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn parse_date(raw: &str) -> Result<DateKey> {
    DateKey::parse(raw).with_context(|| format!("expected a YYYY-MM-DD date, got {raw:?}"))
}

fn is_empty_day(view: &DayView) -> bool {
    !view.status.has_daily_note
        && view.notes.is_empty()
        && view.ranges.is_empty()
        && view.tasks.is_empty()
        && view.holidays.is_empty()
}
