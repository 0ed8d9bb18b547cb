// =============================================================================
// Scanner — one pass over every (symbol, timeframe) pair
// =============================================================================
//
// Pipeline per pair:
//   1. Load bars from the configured source
//   2. Validate ordering into a PriceSeries
//   3. Indicator engine → warmed rows
//   4. Classify the last two rows
//   5. Emit a PairVerdict
//
// Pairs are independent and run with bounded concurrency; output keeps config
// order.  A failed fetch or a malformed series becomes InsufficientData for
// that pair and never stops the pass.
// =============================================================================

use futures_util::StreamExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::indicators::{IndicatorEngine, IndicatorRow};
use crate::market_data::{Bar, PriceSeries, SeriesKey, SeriesLoader};
use crate::runtime_config::{ScannerConfig, TimeframeSpec};
use crate::signals::{classify, latest_bar_idea, Signal, SignalThresholds, TradeIdea};

// =============================================================================
// Verdicts and reports
// =============================================================================

/// The outcome for one (symbol, timeframe) pair.
#[derive(Debug, Clone, Serialize)]
pub struct PairVerdict {
    pub symbol: String,
    pub timeframe: String,
    /// Interval actually requested from the source.
    pub interval: String,
    pub signal: Signal,
    pub label: &'static str,
    /// Bars delivered by the loader.
    pub bars: usize,
    /// Open time of the most recent bar (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<String>,
    /// Rows left after warm-up trimming.
    pub usable_rows: usize,
    /// Open → close move of the most recent bar, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_idea: Option<TradeIdea>,
    /// Most recent warmed row, for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<IndicatorRow>,
    /// Loader or validation failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// All verdicts from one scan pass.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Unique identifier for this pass (UUID v4).
    pub id: String,
    pub source: String,
    /// RFC 3339 timestamps.
    pub started_at: String,
    pub finished_at: String,
    pub verdicts: Vec<PairVerdict>,
}

impl ScanReport {
    pub fn count(&self, signal: Signal) -> usize {
        self.verdicts.iter().filter(|v| v.signal == signal).count()
    }

    /// Count per signal, in `Signal::ALL` order.
    pub fn counts(&self) -> Vec<(Signal, usize)> {
        Signal::ALL.iter().map(|&s| (s, self.count(s))).collect()
    }

    /// Verdicts for `symbol` (case-insensitive), in timeframe order.
    pub fn for_symbol(&self, symbol: &str) -> Vec<&PairVerdict> {
        self.verdicts
            .iter()
            .filter(|v| v.symbol.eq_ignore_ascii_case(symbol))
            .collect()
    }

    pub fn setups(&self) -> impl Iterator<Item = &PairVerdict> {
        self.verdicts.iter().filter(|v| v.signal.is_setup())
    }
}

// =============================================================================
// Pure evaluation
// =============================================================================

/// Signal, usable row count and latest warmed row for one series.
pub fn evaluate_series(
    series: &PriceSeries,
    engine: &IndicatorEngine,
    thresholds: &SignalThresholds,
) -> (Signal, usize, Option<IndicatorRow>) {
    match engine.run(series) {
        Some(rows) => {
            let signal = classify(&rows, thresholds);
            (signal, rows.len(), rows.last().cloned())
        }
        None => (Signal::InsufficientData, 0, None),
    }
}

// =============================================================================
// Scanner
// =============================================================================

pub struct Scanner<L> {
    loader: L,
    source: String,
    engine: IndicatorEngine,
    thresholds: SignalThresholds,
    trade_idea_band_pct: f64,
    symbols: Vec<String>,
    timeframes: Vec<TimeframeSpec>,
    lookback: usize,
    concurrency: usize,
}

impl<L: SeriesLoader> Scanner<L> {
    pub fn new(loader: L, source: impl Into<String>, config: &ScannerConfig) -> Self {
        let engine = IndicatorEngine::new(config.indicators.clone());
        let min_bars = engine.params().min_bars();
        if config.lookback < min_bars {
            warn!(
                lookback = config.lookback,
                min_bars,
                "lookback is shorter than the indicator warm-up; every pair will report insufficient data"
            );
        }

        Self {
            loader,
            source: source.into(),
            engine,
            thresholds: config.thresholds,
            trade_idea_band_pct: config.trade_idea_band_pct,
            symbols: config.symbols.clone(),
            timeframes: config.timeframes.clone(),
            lookback: config.lookback,
            concurrency: config.max_concurrent_fetches.max(1),
        }
    }

    /// Load, compute and classify a single pair.
    pub async fn evaluate(&self, symbol: &str, timeframe: &TimeframeSpec) -> PairVerdict {
        let key = SeriesKey::new(symbol, &timeframe.name);

        let mut delivered = 0;
        let loaded = self
            .loader
            .load(symbol, timeframe, self.lookback)
            .await
            .and_then(|bars| {
                delivered = bars.len();
                PriceSeries::new(key.clone(), bars)
            });

        let (series, error) = match loaded {
            Ok(series) => (series, None),
            Err(e) => {
                let msg = format!("{e:#}");
                warn!(key = %key, error = %msg, "series unavailable; reporting insufficient data");
                (PriceSeries::empty(key), Some(msg))
            }
        };

        let (signal, usable_rows, latest) =
            evaluate_series(&series, &self.engine, &self.thresholds);

        let idea = series
            .last()
            .and_then(|bar| latest_bar_idea(bar, self.trade_idea_band_pct));

        let key = series.key();
        if signal.is_setup() {
            info!(key = %key, signal = %signal, close = ?latest.as_ref().map(|r| r.close), "setup detected");
        } else {
            info!(key = %key, signal = %signal, bars = delivered, usable_rows, "pair evaluated");
        }

        PairVerdict {
            symbol: symbol.to_string(),
            timeframe: timeframe.name.clone(),
            interval: timeframe.interval.clone(),
            signal,
            label: signal.label(),
            bars: delivered,
            as_of: series.last().and_then(Bar::time).map(|t| t.to_rfc3339()),
            usable_rows,
            change_pct: idea.map(|(change, _)| change),
            trade_idea: idea.map(|(_, idea)| idea),
            latest,
            error,
        }
    }

    /// Run one full pass over symbols × timeframes.
    pub async fn run_pass(&self) -> ScanReport {
        let started_at = chrono::Utc::now();
        let pairs: Vec<(&str, &TimeframeSpec)> = self
            .symbols
            .iter()
            .flat_map(|s| self.timeframes.iter().map(move |tf| (s.as_str(), tf)))
            .collect();

        let verdicts: Vec<PairVerdict> = futures_util::stream::iter(pairs)
            .map(|(symbol, tf)| self.evaluate(symbol, tf))
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = ScanReport {
            id: uuid::Uuid::new_v4().to_string(),
            source: self.source.clone(),
            started_at: started_at.to_rfc3339(),
            finished_at: chrono::Utc::now().to_rfc3339(),
            verdicts,
        };

        info!(
            scan_id = %report.id,
            pairs = report.verdicts.len(),
            bullish = report.count(Signal::BullishReversal),
            bearish = report.count(Signal::BearishReversal),
            setups = report.setups().count(),
            insufficient = report.count(Signal::InsufficientData),
            elapsed_ms = (chrono::Utc::now() - started_at).num_milliseconds(),
            "scan pass complete"
        );

        report
    }
}
