//! Pipeline orchestrator: ties provider → storage together.
//!
//! One run is a full refresh:
//!   1. Compute the `[today - lookback, today)` window
//!   2. Fetch every symbol's history (nothing is written if this fails)
//!   3. In a single transaction: drop + recreate both tables, insert one
//!      `StockInfo` row per symbol and its complete days into `StockPrices`
//!   4. Commit. Any error before this point leaves the previous database intact.

use crate::config::AppConfig;
use crate::models::{DateRange, PriceHistory, Ticker};
use crate::provider::cleaner::{clean_series, normalise_symbol};
use crate::provider::{MarketDataSource, YahooChartSource};
use crate::storage::Repository;
use crate::utils::fmt_count;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

pub struct Pipeline<S> {
    config: AppConfig,
    source: S,
}

impl Pipeline<YahooChartSource> {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let source = YahooChartSource::new(&config.provider)
            .context("Failed to build market data client")?;
        Ok(Self::new(config, source))
    }
}

impl<S: MarketDataSource> Pipeline<S> {
    pub fn new(config: AppConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Run against the configured database file, ending today.
    pub async fn run(&self) -> Result<PipelineStats> {
        let range = DateRange::ending_today(self.config.ingest.lookback_days);
        let history = self.fetch(range).await?;

        let mut repo = Repository::open(&self.config.storage.db_path)?;
        self.load(&mut repo, range, &history)
    }

    /// Same as `run`, with an explicit repository and "today".
    pub async fn run_on(&self, repo: &mut Repository, today: NaiveDate) -> Result<PipelineStats> {
        let range = DateRange::ending_on(today, self.config.ingest.lookback_days);
        let history = self.fetch(range).await?;
        self.load(repo, range, &history)
    }

    fn symbols(&self) -> Vec<String> {
        self.config.ingest.symbols.iter().map(|s| normalise_symbol(s)).collect()
    }

    async fn fetch(&self, range: DateRange) -> Result<PriceHistory> {
        let symbols = self.symbols();
        let dupes = self.config.duplicate_symbols();
        if !dupes.is_empty() {
            warn!("Duplicate symbols in config: {:?}; the run will fail on insert", dupes);
        }

        info!(
            "Downloading data from {}: {} symbols, {} → {} ({} days, {:?})",
            self.source.name(),
            symbols.len(),
            range.start,
            range.end,
            range.days(),
            self.config.ingest.interval,
        );

        self.source
            .fetch_history(&symbols, range, self.config.ingest.interval)
            .await
            .context("Market data fetch failed")
    }

    fn load(
        &self,
        repo: &mut Repository,
        range: DateRange,
        history: &PriceHistory,
    ) -> Result<PipelineStats> {
        let mut refresh = repo.begin_refresh()?;
        let mut dropped = 0usize;

        for symbol in self.symbols() {
            info!("Adding {} data to database", symbol);
            refresh.insert_ticker(&Ticker { symbol: symbol.clone() })?;

            let cleaned = clean_series(&symbol, history.rows(&symbol), &range);
            if cleaned.incomplete > 0 || cleaned.out_of_range > 0 {
                debug!(
                    "{}: dropped {} incomplete and {} out-of-range days",
                    symbol, cleaned.incomplete, cleaned.out_of_range
                );
            }
            dropped += cleaned.incomplete + cleaned.out_of_range;

            let n = refresh.insert_bars(&cleaned.bars)?;
            debug!("{}: {} bars", symbol, n);
        }

        let (tickers, bars) = refresh.commit()?;

        let stats = PipelineStats {
            tickers_inserted: tickers,
            bars_inserted: bars,
            rows_dropped: dropped,
        };

        let (min_date, max_date) = repo.date_range().unwrap_or((None, None));
        info!(
            "=== Done: {} tickers | {} bars | {} dropped | DB range: {:?} → {:?} ===",
            stats.tickers_inserted,
            fmt_count(stats.bars_inserted),
            fmt_count(stats.rows_dropped),
            min_date,
            max_date,
        );

        Ok(stats)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    pub tickers_inserted: usize,
    pub bars_inserted: usize,
    pub rows_dropped: usize,
}
