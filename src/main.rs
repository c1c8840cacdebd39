mod config;
mod models;
mod pipeline;
mod provider;
mod storage;
mod utils;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;

/// Download daily Dow Jones price history into a fresh local database.
///
/// Every run drops and rebuilds the `StockInfo` and `StockPrices` tables.
#[derive(Parser)]
#[command(name = "dow-history-etl", version)]
struct Cli {
    /// Database file, overriding `storage.db_path`
    #[arg(long, env = "DOW_DB_PATH")]
    db: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "dow_history_etl=info,warn",
        1 => "dow_history_etl=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }

    let _t = utils::Timer::start("Full refresh");
    Pipeline::from_config(config)?.run().await?;

    Ok(())
}
