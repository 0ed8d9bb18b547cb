// =============================================================================
// Series Loader — the boundary between the scanner and a price source
// =============================================================================
//
// A loader returns raw bars for one symbol and timeframe, oldest first, at
// most `lookback` long.  Retries and timeouts belong to the implementation;
// the scanner treats any error as "no data" for that pair.
// =============================================================================

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};

use super::bar::Bar;
use super::yahoo::YahooClient;
use crate::binance::BinanceClient;
use crate::runtime_config::{DataSource, ScannerConfig, TimeframeSpec};

/// Source of OHLCV bars.
pub trait SeriesLoader {
    fn load(
        &self,
        symbol: &str,
        timeframe: &TimeframeSpec,
        lookback: usize,
    ) -> impl Future<Output = Result<Vec<Bar>>> + Send;
}

/// The configured price source.
#[derive(Debug, Clone)]
pub enum MarketDataClient {
    Yahoo(YahooClient),
    Binance(BinanceClient),
}

impl MarketDataClient {
    /// Build the client selected by `config.source`.
    pub fn from_config(config: &ScannerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("market-edge/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(match config.source {
            DataSource::Yahoo => Self::Yahoo(YahooClient::new(http, &config.yahoo_base_url)),
            DataSource::Binance => Self::Binance(BinanceClient::new(http, &config.binance_base_url)),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Yahoo(_) => "yahoo",
            Self::Binance(_) => "binance",
        }
    }
}

impl SeriesLoader for MarketDataClient {
    async fn load(
        &self,
        symbol: &str,
        timeframe: &TimeframeSpec,
        lookback: usize,
    ) -> Result<Vec<Bar>> {
        match self {
            Self::Yahoo(client) => {
                client
                    .get_chart(symbol, &timeframe.interval, &timeframe.range, lookback)
                    .await
            }
            Self::Binance(client) => client.get_klines(symbol, &timeframe.interval, lookback).await,
        }
    }
}
