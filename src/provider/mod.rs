pub mod cleaner;
pub mod http_client;
pub mod parsers;

#[cfg(test)]
pub(crate) mod test_server;

use crate::config::{Interval, ProviderConfig};
use crate::models::{DateRange, PriceHistory, RawDailyRow};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use self::http_client::HttpClient;
use self::parsers::parse_chart;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider (HTTP 429)")]
    RateLimited,

    #[error("provider refused access (HTTP {0})")]
    Unauthorized(u16),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String, body: String },

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("bad provider URL: {0}")]
    BadUrl(String),

    #[error("provider returned no data for any of {0} symbols")]
    NoData(usize),
}

impl FetchError {
    /// Worth another attempt: connectivity, throttling, server-side failures.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout(_) | FetchError::RateLimited => true,
            FetchError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable data source abstraction.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch every symbol's series over `range`. Any error aborts the batch.
    async fn fetch_history(
        &self,
        symbols: &[String],
        range: DateRange,
        interval: Interval,
    ) -> Result<PriceHistory, FetchError>;
}

// ── Yahoo chart API ───────────────────────────────────────────────────────────

pub struct YahooChartSource {
    client: HttpClient,
    base_url: Url,
}

impl YahooChartSource {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| FetchError::BadUrl(format!("{}: {e}", config.base_url)))?;
        Ok(Self {
            client: HttpClient::new(config)?,
            base_url,
        })
    }

    /// e.g. AAPL → /v8/finance/chart/AAPL?period1=..&period2=..&interval=1d
    ///
    /// `period2` is midnight UTC of `range.end`, so the end day is excluded.
    fn chart_url(&self, symbol: &str, range: DateRange, interval: Interval) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::BadUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);

        url.query_pairs_mut()
            .append_pair("period1", &midnight_utc(range.start).to_string())
            .append_pair("period2", &midnight_utc(range.end).to_string())
            .append_pair("interval", interval.as_provider_str())
            .append_pair("events", "history");
        Ok(url)
    }

    async fn fetch_symbol(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<Vec<RawDailyRow>, FetchError> {
        let url = self.chart_url(symbol, range, interval)?;
        match self.client.get_text(&url).await {
            Ok(body) => parse_chart(symbol, &body),
            // Only the chart API's own error payload means "unknown symbol";
            // any other 404 (wrong base URL, proxy) is a failed fetch.
            Err(FetchError::Http { status: 404, url, body }) => match parse_chart(symbol, &body) {
                Err(not_found @ FetchError::SymbolNotFound(_)) => Err(not_found),
                _ => Err(FetchError::Http { status: 404, url, body }),
            },
            Err(e) => Err(e),
        }
    }
}

fn midnight_utc(date: chrono::NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

#[async_trait]
impl MarketDataSource for YahooChartSource {
    fn name(&self) -> &str {
        "yahoo_chart"
    }

    async fn fetch_history(
        &self,
        symbols: &[String],
        range: DateRange,
        interval: Interval,
    ) -> Result<PriceHistory, FetchError> {
        let mut history = PriceHistory::new();
        let mut not_found = 0usize;

        for (i, symbol) in symbols.iter().enumerate() {
            debug!("[{}/{}] Fetching {}", i + 1, symbols.len(), symbol);

            let rows = match self.fetch_symbol(symbol, range, interval).await {
                Ok(rows) => rows,
                Err(FetchError::SymbolNotFound(_)) => {
                    warn!("{}: provider has no data, storing ticker without prices", symbol);
                    not_found += 1;
                    Vec::new()
                }
                Err(e) => {
                    error!("{}: fetch failed: {}", symbol, e);
                    return Err(e);
                }
            };

            debug!("{}: {} raw rows", symbol, rows.len());
            history.insert(symbol.clone(), rows);
        }

        if !symbols.is_empty() && not_found == symbols.len() {
            return Err(FetchError::NoData(symbols.len()));
        }

        info!(
            "Fetched {} raw rows for {} symbols",
            history.row_count(),
            history.symbol_count()
        );
        Ok(history)
    }
}
