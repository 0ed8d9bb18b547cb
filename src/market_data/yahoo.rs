// =============================================================================
// Yahoo Finance chart API — public OHLCV for stocks and `*-USD` crypto pairs
// =============================================================================
//
// GET {base}/v8/finance/chart/{symbol}?interval=1d&range=2y
//
// Response shape (abridged):
//   { "chart": { "result": [ { "timestamp": [..secs..],
//                              "indicators": { "quote": [ { "open": [..],
//                                 "high": [..], "low": [..], "close": [..],
//                                 "volume": [..] } ] } } ],
//                "error": null } }
//
// Quote arrays may contain `null` for bars with no trades; those bars are
// skipped when the close is missing.
// =============================================================================

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::bar::Bar;

#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Fetch up to `lookback` most recent bars.
    #[instrument(skip(self), name = "yahoo::get_chart")]
    pub async fn get_chart(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
        lookback: usize,
    ) -> Result<Vec<Bar>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[("interval", interval), ("range", range)])
            .send()
            .await
            .with_context(|| format!("GET chart for {symbol} failed"))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse chart response for {symbol}"))?;

        if !status.is_success() {
            bail!(
                "Yahoo chart for {} returned {}: {}",
                symbol,
                status,
                chart_error(&body).unwrap_or_else(|| body.to_string())
            );
        }

        let bars = parse_chart(&body, lookback)?;
        debug!(symbol, interval, count = bars.len(), "chart fetched");
        Ok(bars)
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn chart_error(body: &Value) -> Option<String> {
    let err = body.pointer("/chart/error")?;
    if err.is_null() {
        return None;
    }
    Some(format!(
        "{}: {}",
        err["code"].as_str().unwrap_or("error"),
        err["description"].as_str().unwrap_or("")
    ))
}

fn column<'a>(quote: &'a Value, name: &str) -> &'a [Value] {
    quote[name].as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// Parse a chart response body into bars, keeping the last `lookback`.
pub fn parse_chart(body: &Value, lookback: usize) -> Result<Vec<Bar>> {
    if let Some(msg) = chart_error(body) {
        bail!("Yahoo chart error {msg}");
    }

    let result = body
        .pointer("/chart/result/0")
        .context("chart response has no result")?;

    // A symbol with no bars in range omits `timestamp` entirely.
    let Some(timestamps) = result["timestamp"].as_array() else {
        return Ok(Vec::new());
    };

    let quote = result
        .pointer("/indicators/quote/0")
        .context("chart response has no quote block")?;
    let (opens, highs, lows, closes, volumes) = (
        column(quote, "open"),
        column(quote, "high"),
        column(quote, "low"),
        column(quote, "close"),
        column(quote, "volume"),
    );

    let mut bars = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;
    for (i, ts) in timestamps.iter().enumerate() {
        let ts = ts.as_i64().context("chart timestamp is not an integer")?;
        let Some(close) = closes.get(i).and_then(Value::as_f64) else {
            skipped += 1;
            continue;
        };
        let field = |col: &[Value]| col.get(i).and_then(Value::as_f64);
        bars.push(Bar::new(
            ts * 1000,
            field(opens).unwrap_or(close),
            field(highs).unwrap_or(close),
            field(lows).unwrap_or(close),
            close,
            field(volumes).unwrap_or(0.0),
        ));
    }

    if skipped > 0 {
        warn!(skipped, "chart bars without a close were dropped");
    }

    let start = bars.len().saturating_sub(lookback);
    Ok(bars.split_off(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL", "dataGranularity": "1d" },
                    "timestamp": [1700000000, 1700086400, 1700172800, 1700259200],
                    "indicators": {
                        "quote": [{
                            "open":   [189.0, 190.1, null, 191.0],
                            "high":   [190.5, 191.2, null, 192.3],
                            "low":    [188.2, 189.7, null, 190.4],
                            "close":  [190.0, 190.9, null, 192.0],
                            "volume": [5000, 6000, null, null]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn parses_bars_and_skips_null_closes() {
        let bars = parse_chart(&sample(), 200).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, 1_700_000_000_000);
        assert!((bars[1].close - 190.9).abs() < f64::EPSILON);
        assert!((bars[2].close - 192.0).abs() < f64::EPSILON);
        assert_eq!(bars[2].volume, 0.0);
    }

    #[test]
    fn keeps_only_the_tail() {
        let bars = parse_chart(&sample(), 2).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].timestamp, 1_700_259_200_000);
    }

    #[test]
    fn error_payload_is_an_error() {
        let body = serde_json::json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        let err = parse_chart(&body, 10).unwrap_err();
        assert!(err.to_string().contains("Not Found"));
    }

    #[test]
    fn missing_timestamps_is_empty() {
        let body = serde_json::json!({
            "chart": { "result": [{ "meta": {}, "indicators": { "quote": [{}] } }], "error": null }
        });
        assert!(parse_chart(&body, 10).unwrap().is_empty());
    }
}
