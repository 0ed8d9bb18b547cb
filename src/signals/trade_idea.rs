// =============================================================================
// Trade Idea — intrabar percent-change heuristic
// =============================================================================
//
// A coarse companion to the reversal classifier.  It looks only at the latest
// bar's open → close move:
//
//   change < −band  → Buy   (oversold dip, rebound candidate)
//   change > +band  → Wait  (already pumped, let it cool)
//   otherwise       → Hold
//
// Comparisons are strict, so a move of exactly ±band is Hold.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeIdea {
    Buy,
    Wait,
    Hold,
}

impl TradeIdea {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Buy => "BUY: Oversold dip. Strong potential for rebound. Target +8%",
            Self::Wait => "WAIT: Already pumped. Watch for cooldown.",
            Self::Hold => "HOLD: Stable range. No clear setup yet.",
        }
    }
}

impl std::fmt::Display for TradeIdea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Percent move from `open` to `close`.  `None` for a zero or non-finite open,
/// or a non-finite close.
pub fn percent_change(open: f64, close: f64) -> Option<f64> {
    if !open.is_finite() || !close.is_finite() || open == 0.0 {
        return None;
    }
    Some((close - open) / open * 100.0)
}

/// Map a percent change onto a trade idea using a symmetric `band_pct`.
pub fn trade_idea(change_pct: f64, band_pct: f64) -> TradeIdea {
    if change_pct < -band_pct {
        TradeIdea::Buy
    } else if change_pct > band_pct {
        TradeIdea::Wait
    } else {
        TradeIdea::Hold
    }
}

/// Change and idea for the latest bar, if its prices allow one.
pub fn latest_bar_idea(bar: &Bar, band_pct: f64) -> Option<(f64, TradeIdea)> {
    let change = percent_change(bar.open, bar.close)?;
    Some((change, trade_idea(change, band_pct)))
}
