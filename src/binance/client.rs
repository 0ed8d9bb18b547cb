// =============================================================================
// Binance REST API Client — public kline endpoint
// =============================================================================
//
// Only unsigned market-data endpoints are used, so no API key or secret is
// configured.  Request weight reported by Binance is tracked and fetches are
// refused once the per-minute budget is nearly spent.
// =============================================================================

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, instrument, warn};

use super::rate_limit::RateLimitTracker;
use crate::market_data::Bar;

/// Request weight of one `/api/v3/klines` call.
const KLINES_WEIGHT: u32 = 2;

/// Binance caps `limit` at 1000 bars per request.
const MAX_KLINES_LIMIT: usize = 1000;

/// Binance REST market-data client.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl BinanceClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        debug!(base_url, "BinanceClient initialised");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            rate_limit: Arc::new(RateLimitTracker::new()),
        }
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /api/v3/klines (public — no signature required).
    ///
    /// `symbol` and `interval` may be given in the Yahoo-style form used by
    /// the default config (`BTC-USD`, `60m`); both are normalised first.
    ///
    /// Array indices:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, ...
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Bar>> {
        let symbol = binance_symbol(symbol);
        let interval = binance_interval(interval)?;
        let limit = limit.clamp(1, MAX_KLINES_LIMIT);

        if !self.rate_limit.can_send_request(KLINES_WEIGHT) {
            bail!("Binance request weight budget exhausted; skipping {symbol}@{interval}");
        }

        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            bail!("Binance GET /api/v3/klines returned {}: {}", status, body);
        }

        let bars = parse_klines(&body)?;
        debug!(%symbol, interval, count = bars.len(), "klines fetched");
        Ok(bars)
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

// -------------------------------------------------------------------------
// Normalisation and parsing
// -------------------------------------------------------------------------

/// `BTC-USD` → `BTCUSDT`, `eth-usdt` → `ETHUSDT`, `SOLUSDT` unchanged.
pub fn binance_symbol(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    match upper.split_once('-') {
        Some((base, "USD")) => format!("{base}USDT"),
        Some((base, quote)) => format!("{base}{quote}"),
        None => upper,
    }
}

/// Map an interval to the Binance vocabulary.
pub fn binance_interval(interval: &str) -> Result<&'static str> {
    Ok(match interval {
        "1m" => "1m",
        "3m" => "3m",
        "5m" => "5m",
        "15m" => "15m",
        "30m" => "30m",
        "1h" | "60m" => "1h",
        "2h" => "2h",
        "4h" => "4h",
        "6h" => "6h",
        "8h" => "8h",
        "12h" => "12h",
        "1d" => "1d",
        "3d" => "3d",
        "1w" | "1wk" => "1w",
        "1M" | "1mo" => "1M",
        other => bail!("interval {other:?} is not supported by Binance"),
    })
}

/// Parse a string-or-number JSON value as `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        bail!("expected string or number, got: {val}")
    }
}

/// Parse the array-of-arrays kline payload.
pub fn parse_klines(body: &serde_json::Value) -> Result<Vec<Bar>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut bars = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        let open_time = arr[0].as_i64().context("kline open time is not an integer")?;
        bars.push(Bar::new(
            open_time,
            parse_str_f64(&arr[1])?,
            parse_str_f64(&arr[2])?,
            parse_str_f64(&arr[3])?,
            parse_str_f64(&arr[4])?,
            parse_str_f64(&arr[5])?,
        ));
    }
    Ok(bars)
}
