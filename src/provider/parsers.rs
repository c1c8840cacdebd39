use crate::models::RawDailyRow;
use crate::provider::FetchError;
use chrono::DateTime;
use serde::Deserialize;

// ── Chart API payload ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse a chart API body into one row per timestamp.
///
/// Missing values stay `None`; filtering is the cleaner's job. A range with
/// no trading days has no `timestamp` array and yields an empty vec.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<RawDailyRow>, FetchError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        FetchError::ResponseFormat(format!("{symbol}: chart payload did not parse: {e}"))
    })?;

    if let Some(err) = resp.chart.error {
        return Err(chart_error(symbol, err));
    }

    let data = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FetchError::ResponseFormat(format!("{symbol}: empty chart result")))?;

    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    data.timestamp
        .iter()
        .enumerate()
        .map(|(i, &ts)| {
            // Exchange-local calendar day
            let date = ts
                .checked_add(offset)
                .and_then(|local| DateTime::from_timestamp(local, 0))
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    FetchError::ResponseFormat(format!("{symbol}: invalid timestamp {ts}"))
                })?;

            Ok(RawDailyRow {
                date,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close: at(&quote.close, i),
                volume: at(&quote.volume, i),
            })
        })
        .collect()
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

fn chart_error(symbol: &str, err: ChartError) -> FetchError {
    if err.code == "Not Found" {
        FetchError::SymbolNotFound(symbol.to_string())
    } else {
        FetchError::ResponseFormat(format!("{symbol}: {}: {}", err.code, err.description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2024-01-02 and 2024-01-03 at 14:30 UTC, US/Eastern offset
    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                "timestamp": [1704205800, 1704292200],
                "indicators": {
                    "quote": [{
                        "open":   [187.15, null],
                        "high":   [188.44, 185.88],
                        "low":    [183.89, 183.43],
                        "close":  [185.64, 184.25],
                        "volume": [82488700, 58414500]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_keeps_nulls() {
        let rows = parse_chart("AAPL", BODY).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(rows[0].open, Some(187.15));
        assert_eq!(rows[0].volume, Some(82_488_700.0));
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(rows[1].open, None);
        assert_eq!(rows[1].close, Some(184.25));
    }

    #[test]
    fn test_gmtoffset_shifts_calendar_day() {
        // 2024-01-03 02:00 UTC is still Jan 2 in New York
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":-18000},
            "timestamp":[1704247200],
            "indicators":{"quote":[{"open":[1.0],"high":[1.0],"low":[1.0],"close":[1.0],"volume":[1]}]}}],
            "error":null}}"#;
        let rows = parse_chart("X", body).unwrap();
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_short_arrays_read_as_missing() {
        let body = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"open":[1.0],"high":[1.0],"low":[1.0],"close":[1.0],"volume":[5]}]}}],
            "error":null}}"#;
        let rows = parse_chart("X", body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].open, None);
        assert_eq!(rows[1].volume, None);
    }

    #[test]
    fn test_no_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart("X", body).unwrap().is_empty());
    }

    #[test]
    fn test_overflowing_timestamp_is_format_error() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":3600},
            "timestamp":[9223372036854775807],
            "indicators":{"quote":[{"open":[1.0]}]}}],"error":null}}"#;
        assert!(matches!(parse_chart("X", body), Err(FetchError::ResponseFormat(_))));
    }

    #[test]
    fn test_not_found_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(
            parse_chart("ZZZZ", body),
            Err(FetchError::SymbolNotFound(s)) if s == "ZZZZ"
        ));
    }

    #[test]
    fn test_garbage_is_format_error() {
        assert!(matches!(
            parse_chart("X", "<html>consent</html>"),
            Err(FetchError::ResponseFormat(_))
        ));
    }
}
