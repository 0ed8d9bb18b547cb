// =============================================================================
// Signals Module
// =============================================================================
//
// Discrete setup classification on top of the indicator rows, plus the
// open → close trade idea for the latest bar.

pub mod classifier;
pub mod trade_idea;

pub use classifier::{classify, classify_pair, Signal, SignalThresholds};
pub use trade_idea::{latest_bar_idea, TradeIdea};
