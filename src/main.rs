mod config;
mod error;
mod fetcher;
mod models;
mod pipeline;
mod placement;
mod retry;
mod sheets;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, Credentials};
use crate::fetcher::{PortalFetcher, QuoteSource};
use crate::models::ControlRecord;
use crate::pipeline::Pipeline;
use crate::sheets::RestSheetsClient;

#[derive(Parser)]
#[command(name = "icis-sync", about = "ICIS price quotation → spreadsheet sync", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the latest quotation for every control record and append each to
    /// its target worksheet
    Run,

    /// Read the control worksheet and report per-row validation results
    /// without fetching anything
    Check,

    /// Fetch a single portal URL once (no retry, no write) and print the
    /// observation as JSON — for debugging selector drift
    Probe { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "icis_price_sync=info,warn",
        1 => "icis_price_sync=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Run => {
            let _t = utils::Timer::start("Sync run");

            let credentials = Credentials::from_env()?;
            let token = config::sheets_token_from_env()?;
            let sheets = RestSheetsClient::new(&config.sheets, token)?;
            let source = PortalFetcher::new(config.fetcher.clone(), credentials);

            let report = Pipeline::new(config).run(&sheets, &source).await?;
            info!(
                "Run started {}: {} records, {} appended, {} skipped, {} failed",
                report.started_at,
                report.outcomes.len(),
                report.appended(),
                report.skipped(),
                report.failed(),
            );
            // Per-record failures are in the report/log; only setup failures
            // change the exit status.
        }

        Command::Check => {
            let token = config::sheets_token_from_env()?;
            let sheets = RestSheetsClient::new(&config.sheets, token)?;
            let pipeline = Pipeline::new(config);

            let rows = pipeline.control_rows(&sheets).await?;
            let mut valid = 0usize;
            for (idx, cells) in rows.iter().enumerate().skip(1) {
                let row_number = idx + 1;
                match ControlRecord::from_row(row_number, cells) {
                    Ok(record) => {
                        valid += 1;
                        println!(
                            "row {:>3}  ok    {} → {}/{} [{}]",
                            row_number,
                            record.display_name(),
                            record.target_sheet_id,
                            record.target_worksheet_name,
                            record.category,
                        );
                    }
                    Err(e) => {
                        println!("row {:>3}  SKIP  {}", row_number, e);
                    }
                }
            }
            println!(
                "{} data rows, {} valid",
                rows.len().saturating_sub(1),
                valid
            );
        }

        Command::Probe { url } => {
            let credentials = Credentials::from_env()?;
            let source = PortalFetcher::new(config.fetcher.clone(), credentials);

            let observation = source.fetch_latest(&url).await?;
            println!("{}", serde_json::to_string_pretty(&observation)?);
        }
    }

    Ok(())
}
