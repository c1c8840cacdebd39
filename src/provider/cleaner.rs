use crate::models::{DailyBar, DateRange, RawDailyRow};

// ── Parsers ───────────────────────────────────────────────────────────────────

pub fn normalise_symbol(s: &str) -> String {
    s.trim().to_uppercase()
}

/// A value the provider actually delivered. NaN is a gap marker, not a price.
fn present(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

// ── Raw row → DailyBar ────────────────────────────────────────────────────────

/// `None` unless all five fields are present.
pub fn complete_bar(symbol: &str, row: &RawDailyRow) -> Option<DailyBar> {
    Some(DailyBar {
        symbol: symbol.to_string(),
        date: row.date,
        open: present(row.open)?,
        high: present(row.high)?,
        low: present(row.low)?,
        close: present(row.close)?,
        volume: present(row.volume)?,
    })
}

/// Result of filtering one symbol's series.
#[derive(Debug, Default)]
pub struct CleanedSeries {
    pub bars: Vec<DailyBar>,
    pub incomplete: usize,
    pub out_of_range: usize,
}

/// Keep complete days inside `range`, preserving input order.
pub fn clean_series(symbol: &str, rows: &[RawDailyRow], range: &DateRange) -> CleanedSeries {
    let mut out = CleanedSeries::default();
    for row in rows {
        if !range.contains(row.date) {
            out.out_of_range += 1;
            continue;
        }
        match complete_bar(symbol, row) {
            Some(bar) => out.bars.push(bar),
            None => out.incomplete += 1,
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
