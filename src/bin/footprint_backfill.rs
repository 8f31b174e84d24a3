//! CLI surface for an idempotent per-symbol backfill run.

use chrono::NaiveDate;
use clap::Parser;
use footprint_engine::orchestrator::{BackfillRequest, Orchestrator};
use footprint_engine::providers::HttpSecondDataSource;
use footprint_engine::Settings;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "footprint-backfill", version, about = "Backfill volume-partitioned footprint bars into the columnar store")]
struct Cli {
    /// Symbol to backfill, as the upstream source names it.
    #[arg(long, env = "FOOTPRINT_SYMBOL")]
    symbol: String,

    /// Inclusive start date, YYYY-MM-DD.
    #[arg(long)]
    start_date: String,

    /// Inclusive end date, YYYY-MM-DD.
    #[arg(long)]
    end_date: String,

    /// Volume threshold per V-bar.
    #[arg(long)]
    v_unit: i64,

    /// Minimum price increment for this symbol.
    #[arg(long)]
    tick_size: f64,

    /// Recompute every date in range, even ones already present.
    #[arg(long, default_value_t = false)]
    force_recompute: bool,

    /// Overrides the configured store root.
    #[arg(long, env = "FOOTPRINT_DATA_ROOT")]
    data_root: Option<PathBuf>,

    /// URL template for second-resolution data; supports `{symbol}` and `{date}`.
    #[arg(long, env = "FOOTPRINT_SECONDS_URL")]
    seconds_url: String,

    /// URL template for reference minute bars; supports `{symbol}`, `{start}`, `{end}`.
    #[arg(long, env = "FOOTPRINT_MINUTES_URL")]
    minutes_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    footprint_engine::init();
    let cli = Cli::parse();

    let mut settings = Settings::load().unwrap_or_default();
    if let Some(root) = cli.data_root {
        settings.data_root = root;
    }

    let start_date = NaiveDate::parse_from_str(&cli.start_date, "%Y-%m-%d")?;
    let end_date = NaiveDate::parse_from_str(&cli.end_date, "%Y-%m-%d")?;

    let source = HttpSecondDataSource::new(cli.seconds_url, cli.minutes_url);
    let orchestrator = Orchestrator::new(
        source,
        settings.data_root.clone(),
        settings.max_consecutive_errors,
    );

    let req = BackfillRequest {
        symbol: cli.symbol,
        start_date,
        end_date,
        v_unit: cli.v_unit,
        tick_size: cli.tick_size,
        force_recompute: cli.force_recompute,
    };

    let report = orchestrator
        .run(&req)
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { Box::new(std::io::Error::other(e.to_string())) })?;

    tracing::info!(
        processed = report.dates_processed.len(),
        skipped = report.dates_skipped.len(),
        errored = report.dates_errored.len(),
        "backfill run complete"
    );

    if report.had_fatal_error {
        std::process::exit(1);
    }
    Ok(())
}
