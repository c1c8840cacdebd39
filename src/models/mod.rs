use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Ticker ────────────────────────────────────────────────────────────────────

/// One `StockInfo` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticker {
    pub symbol: String,
}

// ── Equity daily bar ──────────────────────────────────────────────────────────

/// One `StockPrices` row. Every field is present by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

// ── Raw provider rows ─────────────────────────────────────────────────────────

/// A provider day as delivered: any field may be missing (holidays, gaps).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDailyRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Fetched data reshaped to symbol → days in ascending date order.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    series: HashMap<String, Vec<RawDailyRow>>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a symbol's rows, sorted by date.
    pub fn insert(&mut self, symbol: impl Into<String>, mut rows: Vec<RawDailyRow>) {
        rows.sort_by_key(|r| r.date);
        self.series.insert(symbol.into(), rows);
    }

    /// Rows for `symbol`; empty when the provider had nothing for it.
    pub fn rows(&self, symbol: &str) -> &[RawDailyRow] {
        self.series.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }

    pub fn row_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }
}

// ── Date range ────────────────────────────────────────────────────────────────

/// Half-open `[start, end)` window of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Window of `lookback_days` ending on (and excluding) `today`.
    pub fn ending_on(today: NaiveDate, lookback_days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn ending_today(lookback_days: u32) -> Self {
        Self::ending_on(chrono::Local::now().date_naive(), lookback_days)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_range_is_half_open() {
        let r = DateRange::ending_on(d(2024, 3, 8), 5);
        assert_eq!(r.start, d(2024, 3, 3));
        assert_eq!(r.end, d(2024, 3, 8));
        assert_eq!(r.days(), 5);
        assert!(r.contains(d(2024, 3, 3)));
        assert!(r.contains(d(2024, 3, 7)));
        assert!(!r.contains(d(2024, 3, 8)));
        assert!(!r.contains(d(2024, 3, 2)));
    }

    #[test]
    fn test_range_crosses_leap_day() {
        let r = DateRange::ending_on(d(2024, 3, 1), 2);
        assert_eq!(r.start, d(2024, 2, 28));
    }

    #[test]
    fn test_history_sorts_and_defaults_empty() {
        let mut h = PriceHistory::new();
        h.insert(
            "AAPL",
            vec![
                RawDailyRow { date: d(2024, 1, 3), ..Default::default() },
                RawDailyRow { date: d(2024, 1, 2), ..Default::default() },
            ],
        );
        let dates: Vec<_> = h.rows("AAPL").iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 3)]);
        assert!(h.rows("MSFT").is_empty());
        assert_eq!(h.symbol_count(), 1);
        assert_eq!(h.row_count(), 2);
    }
}
