// =============================================================================
// Reversal Setup Classifier
// =============================================================================
//
// Reads the last two warmed rows (`prior`, `latest`) and returns one Signal.
// First match wins:
//
//   1. fewer than 2 rows                                  → InsufficientData
//   2. RSI / histogram / trend EMAs / close missing        → MissingIndicator
//   3. RSI < oversold, histogram − → +, close > fast > slow → BullishReversal
//   4. RSI > overbought, histogram + → −, close < fast < slow → BearishReversal
//   5. otherwise                                          → NoSetup
//
// All comparisons are strict.  The classifier is stateless.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorRow;

fn default_rsi_oversold() -> f64 {
    40.0
}

fn default_rsi_overbought() -> f64 {
    60.0
}

/// RSI levels that gate the reversal setups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    /// Bullish reversals need RSI strictly below this.
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    /// Bearish reversals need RSI strictly above this.
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: default_rsi_oversold(),
            rsi_overbought: default_rsi_overbought(),
        }
    }
}

/// Outcome of classifying one (symbol, timeframe) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    BullishReversal,
    BearishReversal,
    NoSetup,
    InsufficientData,
    MissingIndicator,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::BullishReversal,
        Signal::BearishReversal,
        Signal::NoSetup,
        Signal::InsufficientData,
        Signal::MissingIndicator,
    ];

    /// Short human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BullishReversal => "Bullish Reversal Signal",
            Self::BearishReversal => "Bearish Reversal Signal",
            Self::NoSetup => "No clear setup",
            Self::InsufficientData => "Not enough data",
            Self::MissingIndicator => "Missing indicator data",
        }
    }

    /// True for the two actionable setups.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::BullishReversal | Self::BearishReversal)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify the most recent two rows of `rows` (oldest first).
pub fn classify(rows: &[IndicatorRow], thresholds: &SignalThresholds) -> Signal {
    match rows {
        [.., prior, latest] => classify_pair(prior, latest, thresholds),
        _ => Signal::InsufficientData,
    }
}

/// Apply the decision rule to two consecutive rows.
pub fn classify_pair(
    prior: &IndicatorRow,
    latest: &IndicatorRow,
    thresholds: &SignalThresholds,
) -> Signal {
    let (Some(rsi), Some(hist_prior), Some(hist_latest), Some(fast), Some(slow)) = (
        latest.rsi,
        prior.macd_histogram,
        latest.macd_histogram,
        latest.ema_fast,
        latest.ema_slow,
    ) else {
        return Signal::MissingIndicator;
    };
    let close = latest.close;
    if !close.is_finite() || !prior.close.is_finite() {
        return Signal::MissingIndicator;
    }

    let bullish = rsi < thresholds.rsi_oversold
        && hist_prior < 0.0
        && hist_latest > 0.0
        && close > fast
        && fast > slow;
    if bullish {
        return Signal::BullishReversal;
    }

    let bearish = rsi > thresholds.rsi_overbought
        && hist_prior > 0.0
        && hist_latest < 0.0
        && close < fast
        && fast < slow;
    if bearish {
        return Signal::BearishReversal;
    }

    Signal::NoSetup
}
