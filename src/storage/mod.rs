use crate::models::{DailyBar, Ticker};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use tracing::{debug, info};

// ── Schema ────────────────────────────────────────────────────────────────────

const DROP: &str = r#"
DROP TABLE IF EXISTS StockPrices;
DROP TABLE IF EXISTS StockInfo;
"#;

const DDL: &str = r#"
CREATE TABLE StockInfo (
    Ticker  TEXT NOT NULL,
    CONSTRAINT stocks_pk PRIMARY KEY (Ticker)
);

-- Date is ISO-8601 text (YYYY-MM-DD), readable as a DateTime by SQLite clients
CREATE TABLE StockPrices (
    Date    TIMESTAMP NOT NULL,
    Ticker  TEXT      NOT NULL,
    Open    REAL      NOT NULL,
    High    REAL      NOT NULL,
    Low     REAL      NOT NULL,
    Close   REAL      NOT NULL,
    Volume  REAL      NOT NULL,
    CONSTRAINT data_pk PRIMARY KEY (Date, Ticker)
);
"#;

const INSERT_TICKER: &str = "INSERT INTO StockInfo (Ticker) VALUES (?)";

const INSERT_BAR: &str = r#"
    INSERT INTO StockPrices (Date, Ticker, Open, High, Low, Close, Volume)
    VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

// ── Repository ────────────────────────────────────────────────────────────────

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    /// Start a full refresh: drop and recreate both tables inside one
    /// transaction. Nothing is visible to other readers until `commit`;
    /// dropping the returned `Refresh` rolls everything back.
    pub fn begin_refresh(&mut self) -> Result<Refresh<'_>> {
        let tx = self.conn.transaction().context("Failed to begin transaction")?;
        info!("Resetting schema…");
        tx.execute_batch(DROP).context("Dropping tables failed")?;
        tx.execute_batch(DDL).context("DDL failed")?;
        Ok(Refresh { tx, tickers: 0, bars: 0 })
    }

    // ── Summary helpers ───────────────────────────────────────────────────────

    #[cfg(test)]
    pub(crate) fn has_table(&self, name: &str) -> Result<bool> {
        let mut s = self.conn.prepare(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )?;
        let n: i64 = s.query_row(params![name], |r| r.get(0))?;
        Ok(n > 0)
    }

    #[cfg(test)]
    pub(crate) fn list_symbols(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT Ticker FROM StockInfo ORDER BY Ticker")?;
        let syms = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(syms)
    }

    #[cfg(test)]
    pub(crate) fn bar_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM StockPrices")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    #[cfg(test)]
    pub(crate) fn ticker_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM StockInfo")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn date_range(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let mut s = self.conn.prepare("SELECT MIN(Date), MAX(Date) FROM StockPrices")?;
        Ok(s.query_row([], |r| Ok((r.get(0)?, r.get(1)?)))?)
    }

    #[cfg(test)]
    pub(crate) fn bars_for(&self, symbol: &str) -> Result<Vec<DailyBar>> {
        let mut stmt = self.conn.prepare(
            "SELECT Date, Ticker, Open, High, Low, Close, Volume
             FROM StockPrices WHERE Ticker = ? ORDER BY Date",
        )?;
        let bars = stmt
            .query_map(params![symbol], |r| {
                Ok(DailyBar {
                    date: r.get(0)?,
                    symbol: r.get(1)?,
                    open: r.get(2)?,
                    high: r.get(3)?,
                    low: r.get(4)?,
                    close: r.get(5)?,
                    volume: r.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bars)
    }
}

// ── Refresh transaction ───────────────────────────────────────────────────────

/// Writes of one run. Rolled back on drop unless committed.
pub struct Refresh<'a> {
    tx: Transaction<'a>,
    tickers: usize,
    bars: usize,
}

impl Refresh<'_> {
    pub fn insert_ticker(&mut self, ticker: &Ticker) -> Result<()> {
        self.tx
            .execute(INSERT_TICKER, params![ticker.symbol])
            .with_context(|| format!("insert ticker {}", ticker.symbol))?;
        self.tickers += 1;
        Ok(())
    }

    pub fn insert_bars(&mut self, bars: &[DailyBar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }

        let mut stmt = self.tx.prepare(INSERT_BAR)?;
        for bar in bars {
            stmt.execute(params![
                bar.date, bar.symbol,
                bar.open, bar.high, bar.low, bar.close,
                bar.volume,
            ])
            .with_context(|| format!("insert bar {} {}", bar.symbol, bar.date))?;
        }

        self.bars += bars.len();
        Ok(bars.len())
    }

    /// Make the refresh visible. Returns (tickers, bars) written.
    pub fn commit(self) -> Result<(usize, usize)> {
        debug!("Committing {} tickers, {} bars", self.tickers, self.bars);
        self.tx.commit().context("Commit failed")?;
        Ok((self.tickers, self.bars))
    }
}
