use crate::provider::cleaner::normalise_symbol;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Market-data provider (Yahoo chart API) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

/// What to ingest: symbol list, lookback window and sampling interval
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    #[serde(default)]
    pub interval: Interval,
}

/// Sampling interval of the requested series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    #[default]
    Daily,
}

impl Interval {
    /// Label understood by the chart API.
    pub fn as_provider_str(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

/// Dow Jones Industrial Average constituents.
pub const DOW_JONES_SYMBOLS: [&str; 30] = [
    "MMM", "AXP", "AMGN", "AAPL", "BA", "CAT", "CVX", "CSCO", "KO", "DOW",
    "GS", "HD", "HON", "IBM", "INTC", "JNJ", "JPM", "MCD", "MRK", "MSFT",
    "NKE", "PG", "CRM", "TRV", "UNH", "VZ", "V", "WBA", "WMT", "DIS",
];

fn default_base_url() -> String {
    "https://query2.finance.yahoo.com".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    250
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) dow-history-etl/0.1".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("mltrainingdata.db")
}
fn default_symbols() -> Vec<String> {
    DOW_JONES_SYMBOLS.iter().map(|s| s.to_string()).collect()
}
fn default_lookback_days() -> u32 {
    10_000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            lookback_days: default_lookback_days(),
            interval: Interval::default(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = ::config::Config::builder()
            .add_source(
                ::config::File::with_name("config/default")
                    .required(false)
                    .format(::config::FileFormat::Toml),
            )
            .add_source(
                ::config::File::with_name("config/local")
                    .required(false)
                    .format(::config::FileFormat::Toml),
            )
            .add_source(
                ::config::Environment::with_prefix("DOW")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("ingest.symbols")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    /// Reject settings that would make a run meaningless.
    ///
    /// Duplicate symbols are deliberately not rejected here: the primary key
    /// on `StockInfo` catches them and the whole run is rolled back.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.symbols.is_empty() {
            bail!("ingest.symbols must list at least one ticker");
        }
        if let Some(blank) = self.ingest.symbols.iter().position(|s| s.trim().is_empty()) {
            bail!("ingest.symbols[{}] is blank", blank);
        }
        if self.ingest.lookback_days == 0 {
            bail!("ingest.lookback_days must be greater than zero");
        }
        if self.provider.timeout_secs == 0 {
            bail!("provider.timeout_secs must be greater than zero");
        }
        if self.storage.db_path.as_os_str().is_empty() {
            bail!("storage.db_path is empty");
        }
        Ok(())
    }

    /// Symbols that appear more than once after normalisation, in first-seen order.
    pub fn duplicate_symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for s in self.ingest.symbols.iter().map(|s| normalise_symbol(s)) {
            if seen.contains(&s) {
                if !dupes.contains(&s) {
                    dupes.push(s);
                }
            } else {
                seen.insert(s);
            }
        }
        dupes
    }
}
