// =============================================================================
// Runtime Configuration — scanner settings with atomic save
// =============================================================================
//
// Every tunable the scanner reads lives here: what to scan (symbols,
// timeframes, lookback), how to compute it (indicator windows), how to judge
// it (RSI thresholds) and how to run (concurrency, timeouts, API bind).
//
// All fields carry `#[serde(default)]` so that a partial JSON file loads, and
// so that adding new fields never breaks an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::IndicatorParams;
use crate::signals::SignalThresholds;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_symbols() -> Vec<String> {
    vec![
        "TSLA".to_string(),
        "AAPL".to_string(),
        "ETH-USD".to_string(),
        "BTC-USD".to_string(),
        "SOL-USD".to_string(),
    ]
}

fn default_range() -> String {
    "60d".to_string()
}

fn default_timeframes() -> Vec<TimeframeSpec> {
    vec![
        TimeframeSpec::new("1d", "1d", "2y"),
        TimeframeSpec::new("4h", "60m", "60d"),
        TimeframeSpec::new("1h", "60m", "60d"),
        TimeframeSpec::new("30m", "30m", "60d"),
        TimeframeSpec::new("5m", "5m", "60d"),
    ]
}

fn default_lookback() -> usize {
    200
}

fn default_trade_idea_band_pct() -> f64 {
    3.0
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_scan_interval_secs() -> u64 {
    300
}

fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_yahoo_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_binance_base_url() -> String {
    "https://api.binance.com".to_string()
}

// =============================================================================
// Building blocks
// =============================================================================

/// Where bars are fetched from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Yahoo,
    Binance,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yahoo => write!(f, "yahoo"),
            Self::Binance => write!(f, "binance"),
        }
    }
}

impl std::str::FromStr for DataSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "binance" => Ok(Self::Binance),
            other => bail!("unknown data source {other:?} (expected yahoo or binance)"),
        }
    }
}

/// A named timeframe and the source interval used to fetch it.
///
/// `name` is what the display shows; `interval` is sent to the source.  The
/// two differ when a source lacks the interval (Yahoo has no 4h bars, so the
/// default "4h" row is fetched as 60m).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeSpec {
    pub name: String,
    pub interval: String,
    /// History window requested from Yahoo (ignored by Binance).
    #[serde(default = "default_range")]
    pub range: String,
}

impl TimeframeSpec {
    pub fn new(name: &str, interval: &str, range: &str) -> Self {
        Self {
            name: name.to_string(),
            interval: interval.to_string(),
            range: range.to_string(),
        }
    }
}

// =============================================================================
// ScannerConfig
// =============================================================================

/// Top-level configuration for the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    // --- What to scan --------------------------------------------------------

    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    #[serde(default)]
    pub source: DataSource,

    /// Timeframes in display order.
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<TimeframeSpec>,

    /// Maximum bars kept per series.
    #[serde(default = "default_lookback")]
    pub lookback: usize,

    // --- Indicator and signal parameters ------------------------------------

    #[serde(default)]
    pub indicators: IndicatorParams,

    #[serde(default)]
    pub thresholds: SignalThresholds,

    /// Open → close move (percent) beyond which the latest bar suggests
    /// Buy (below −band) or Wait (above +band).
    #[serde(default = "default_trade_idea_band_pct")]
    pub trade_idea_band_pct: f64,

    // --- Runtime -------------------------------------------------------------

    /// Pairs fetched and evaluated at the same time.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Seconds between scan passes; 0 runs a single pass and exits.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    #[serde(default = "default_true")]
    pub api_enabled: bool,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,

    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            source: DataSource::default(),
            timeframes: default_timeframes(),
            lookback: default_lookback(),
            indicators: IndicatorParams::default(),
            thresholds: SignalThresholds::default(),
            trade_idea_band_pct: default_trade_idea_band_pct(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout_secs: default_request_timeout_secs(),
            scan_interval_secs: default_scan_interval_secs(),
            api_enabled: true,
            bind_addr: default_bind_addr(),
            yahoo_base_url: default_yahoo_base_url(),
            binance_base_url: default_binance_base_url(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scanner config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scanner config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            source = %config.source,
            "scanner config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise scanner config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "scanner config saved (atomic)");
        Ok(())
    }

    /// Apply `MARKET_EDGE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(syms) = std::env::var("MARKET_EDGE_SYMBOLS") {
            self.symbols = parse_symbol_list(&syms);
        }
        if let Ok(source) = std::env::var("MARKET_EDGE_SOURCE") {
            self.source = source.parse()?;
        }
        if let Ok(addr) = std::env::var("MARKET_EDGE_BIND_ADDR") {
            self.bind_addr = addr;
        }
        Ok(())
    }

    /// Reject settings the scanner cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            bail!("no symbols configured");
        }
        if self.timeframes.is_empty() {
            bail!("no timeframes configured");
        }
        if let Some(tf) = self
            .timeframes
            .iter()
            .find(|tf| tf.name.trim().is_empty() || tf.interval.trim().is_empty())
        {
            bail!("timeframe entries need a name and an interval: {tf:?}");
        }
        if self.lookback == 0 {
            bail!("lookback must be positive");
        }
        if self.max_concurrent_fetches == 0 {
            bail!("max_concurrent_fetches must be positive");
        }
        if self.thresholds.rsi_oversold >= self.thresholds.rsi_overbought {
            bail!(
                "rsi_oversold ({}) must be below rsi_overbought ({})",
                self.thresholds.rsi_oversold,
                self.thresholds.rsi_overbought
            );
        }
        if !self.trade_idea_band_pct.is_finite() || self.trade_idea_band_pct < 0.0 {
            bail!(
                "trade_idea_band_pct must be a non-negative number, got {}",
                self.trade_idea_band_pct
            );
        }
        self.indicators.validate()
    }
}

/// Split a comma-separated symbol list, trimming and upper-casing entries.
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
