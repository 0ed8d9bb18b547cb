// =============================================================================
// Indicator Engine
// =============================================================================
//
// Turns a price series into a row-per-bar table of EMA / RSI / MACD values,
// then trims the warm-up rows the classifier cannot use.
//
//   compute_rows  — index-aligned, one row per bar, `None` during warm-up
//   warmed_rows   — rows with every classifier input defined (>= 2 or None)
//   run           — both, for one `PriceSeries`
//
// The engine holds no state between calls.
// =============================================================================

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::ema::ema_series;
use super::macd::calculate_macd;
use super::rsi::rsi_series;
use crate::market_data::{Bar, PriceSeries};

// =============================================================================
// Parameters
// =============================================================================

fn default_ema_windows() -> Vec<usize> {
    vec![21, 50, 90, 180]
}

fn default_trend_fast_ema() -> usize {
    21
}

fn default_trend_slow_ema() -> usize {
    50
}

fn default_rsi_period() -> usize {
    14
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

/// Window sizes for every indicator the engine computes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// EMA overlays computed for display (21/50/90/180).
    #[serde(default = "default_ema_windows")]
    pub ema_windows: Vec<usize>,

    /// Fast trend EMA read by the classifier (close > fast > slow).
    #[serde(default = "default_trend_fast_ema")]
    pub trend_fast_ema: usize,

    /// Slow trend EMA read by the classifier.
    #[serde(default = "default_trend_slow_ema")]
    pub trend_slow_ema: usize,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_windows: default_ema_windows(),
            trend_fast_ema: default_trend_fast_ema(),
            trend_slow_ema: default_trend_slow_ema(),
            rsi_period: default_rsi_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<()> {
        if self.ema_windows.iter().any(|&w| w == 0) {
            bail!("EMA windows must be positive: {:?}", self.ema_windows);
        }
        if self.trend_fast_ema == 0 || self.trend_slow_ema == 0 {
            bail!("trend EMA windows must be positive");
        }
        if self.rsi_period == 0 {
            bail!("RSI period must be positive");
        }
        if self.macd_fast == 0 || self.macd_signal == 0 {
            bail!("MACD periods must be positive");
        }
        if self.macd_fast >= self.macd_slow {
            bail!(
                "MACD fast period ({}) must be shorter than slow period ({})",
                self.macd_fast,
                self.macd_slow
            );
        }
        Ok(())
    }

    /// Smallest series length that can leave two fully warmed rows.
    pub fn min_bars(&self) -> usize {
        let trend = self.trend_fast_ema.max(self.trend_slow_ema);
        let rsi = self.rsi_period + 1;
        let macd = self.macd_slow + self.macd_signal - 1;
        trend.max(rsi).max(macd) + 1
    }
}

// =============================================================================
// IndicatorRow
// =============================================================================

/// Derived values for one bar.  `None` means the indicator is still warming up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub timestamp: i64,
    pub close: f64,
    /// Value of the fast trend EMA (EMA21 by default).
    pub ema_fast: Option<f64>,
    /// Value of the slow trend EMA (EMA50 by default).
    pub ema_slow: Option<f64>,
    /// Display overlays keyed by window.
    pub emas: BTreeMap<usize, Option<f64>>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
}

impl IndicatorRow {
    /// A row with only price data filled in.
    pub fn bare(timestamp: i64, close: f64) -> Self {
        Self {
            timestamp,
            close,
            ema_fast: None,
            ema_slow: None,
            emas: BTreeMap::new(),
            rsi: None,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
        }
    }

    /// True when every field the classifier reads is defined.
    pub fn is_warm(&self) -> bool {
        self.close.is_finite()
            && self.ema_fast.is_some()
            && self.ema_slow.is_some()
            && self.rsi.is_some()
            && self.macd.is_some()
            && self.macd_histogram.is_some()
    }

    pub fn ema(&self, window: usize) -> Option<f64> {
        self.emas.get(&window).copied().flatten()
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Compute one row per bar.  The output is index-aligned with `bars`.
    pub fn compute_rows(&self, bars: &[Bar]) -> Vec<IndicatorRow> {
        let p = &self.params;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let ema_fast = ema_series(&closes, p.trend_fast_ema);
        let ema_slow = ema_series(&closes, p.trend_slow_ema);
        let overlays: Vec<(usize, Vec<Option<f64>>)> = p
            .ema_windows
            .iter()
            .map(|&w| (w, ema_series(&closes, w)))
            .collect();
        let rsi = rsi_series(&closes, p.rsi_period);
        let macd = calculate_macd(&closes, p.macd_fast, p.macd_slow, p.macd_signal);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| IndicatorRow {
                timestamp: bar.timestamp,
                close: bar.close,
                ema_fast: ema_fast[i],
                ema_slow: ema_slow[i],
                emas: overlays.iter().map(|(w, s)| (*w, s[i])).collect(),
                rsi: rsi[i],
                macd: macd.line[i],
                macd_signal: macd.signal[i],
                macd_histogram: macd.histogram[i],
            })
            .collect()
    }

    /// Compute and trim the rows for `series`.
    ///
    /// Returns `None` (insufficient data) when fewer than two warmed rows
    /// remain.
    pub fn run(&self, series: &PriceSeries) -> Option<Vec<IndicatorRow>> {
        warmed_rows(self.compute_rows(series.bars()))
    }
}

/// Drop rows missing any classifier input.  `None` if fewer than two remain.
pub fn warmed_rows(rows: Vec<IndicatorRow>) -> Option<Vec<IndicatorRow>> {
    let warmed: Vec<IndicatorRow> = rows.into_iter().filter(IndicatorRow::is_warm).collect();
    (warmed.len() >= 2).then_some(warmed)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::SeriesKey;

    fn bars_from(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 60_000, c, c, c, c, 1.0))
            .collect()
    }

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new(SeriesKey::new("TEST", "1h"), bars_from(closes)).unwrap()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 8.0 * (i as f64 / 9.0).sin() + 0.05 * i as f64)
            .collect()
    }

    #[test]
    fn default_params() {
        let p = IndicatorParams::default();
        assert_eq!(p.ema_windows, vec![21, 50, 90, 180]);
        assert_eq!((p.macd_fast, p.macd_slow, p.macd_signal), (12, 26, 9));
        assert_eq!(p.rsi_period, 14);
        assert_eq!(p.min_bars(), 51);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_macd() {
        let p = IndicatorParams {
            macd_fast: 26,
            macd_slow: 12,
            ..IndicatorParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_window() {
        let p = IndicatorParams {
            ema_windows: vec![21, 0],
            ..IndicatorParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn rows_are_index_aligned() {
        let closes = wave(200);
        let rows = IndicatorEngine::default().compute_rows(&bars_from(&closes));
        assert_eq!(rows.len(), 200);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.timestamp, i as i64 * 60_000);
            assert_eq!(row.close, closes[i]);
        }
    }

    #[test]
    fn warm_up_boundaries() {
        let rows = IndicatorEngine::default().compute_rows(&bars_from(&wave(200)));
        assert!(rows[19].ema_fast.is_none());
        assert!(rows[20].ema_fast.is_some());
        assert!(rows[48].ema_slow.is_none());
        assert!(rows[49].ema_slow.is_some());
        assert!(rows[13].rsi.is_none());
        assert!(rows[14].rsi.is_some());
        assert!(rows[32].macd_histogram.is_none());
        assert!(rows[33].macd_histogram.is_some());
        assert!(rows[178].ema(180).is_none());
        assert!(rows[179].ema(180).is_some());
        assert!(rows[199].ema(90).is_some());
    }

    #[test]
    fn run_trims_warm_up_rows() {
        let rows = IndicatorEngine::default().run(&series(&wave(200))).unwrap();
        // First warm row is the slow trend EMA's first value.
        assert_eq!(rows.len(), 200 - 49);
        assert_eq!(rows[0].timestamp, 49 * 60_000);
        assert!(rows.iter().all(IndicatorRow::is_warm));
    }

    #[test]
    fn ema180_not_required_for_classification() {
        let rows = IndicatorEngine::default().run(&series(&wave(100))).unwrap();
        assert!(rows.iter().all(|r| r.ema(180).is_none()));
    }

    #[test]
    fn exactly_min_bars_gives_two_rows() {
        let engine = IndicatorEngine::default();
        let n = engine.params().min_bars();
        assert_eq!(engine.run(&series(&wave(n))).map(|r| r.len()), Some(2));
        assert!(engine.run(&series(&wave(n - 1))).is_none());
    }

    #[test]
    fn short_and_empty_series_are_insufficient() {
        let engine = IndicatorEngine::default();
        assert!(engine.run(&series(&[])).is_none());
        assert!(engine.run(&series(&[1.0])).is_none());
        assert!(engine.run(&series(&wave(40))).is_none());
    }

    #[test]
    fn rising_series_pins_rsi_and_keeps_histogram_non_negative() {
        let closes: Vec<f64> = (0..250).map(|i| 50.0 + i as f64 * 0.5).collect();
        let rows = IndicatorEngine::default().run(&series(&closes)).unwrap();
        for row in &rows {
            assert!((row.rsi.unwrap() - 100.0).abs() < 1e-9);
            assert!(row.macd_histogram.unwrap() >= -1e-9);
        }
    }

    #[test]
    fn later_bars_do_not_change_earlier_rows() {
        let mut closes = wave(220);
        let engine = IndicatorEngine::default();
        let before = engine.compute_rows(&bars_from(&closes));
        closes[150] += 40.0;
        closes[219] -= 40.0;
        let after = engine.compute_rows(&bars_from(&closes));
        assert_eq!(before[..150], after[..150]);
    }

    #[test]
    fn same_input_same_output() {
        let s = series(&wave(220));
        let engine = IndicatorEngine::default();
        assert_eq!(engine.run(&s), engine.run(&s));
    }

    #[test]
    fn warmed_rows_needs_two() {
        let mut row = IndicatorRow::bare(0, 1.0);
        row.ema_fast = Some(1.0);
        row.ema_slow = Some(1.0);
        row.rsi = Some(50.0);
        row.macd = Some(0.0);
        row.macd_histogram = Some(0.0);
        assert!(warmed_rows(vec![row.clone()]).is_none());
        assert_eq!(warmed_rows(vec![row.clone(), IndicatorRow::bare(1, 1.0), row]).map(|r| r.len()), Some(2));
    }
}
