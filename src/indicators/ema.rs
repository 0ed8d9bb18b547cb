// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = value_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// Every EMA in the scanner (the 21/50/90/180 overlays and all three MACD legs)
// is seeded with the SMA of the first `period` values, so the first defined
// value sits at index `period - 1`.
// =============================================================================

use super::align;

/// Compute the compact EMA series for `values` and look-back `period`.
///
/// Each output element corresponds to an input starting at index
/// `period - 1`.  Returns an empty `Vec` when `period == 0` or the input is
/// shorter than `period`.  A non-finite intermediate value ends the series.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    let sma: f64 = values[..period].iter().sum::<f64>() / period as f64;
    if !sma.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(sma);

    let mut prev_ema = sma;
    for &value in &values[period..] {
        let ema = value * multiplier + prev_ema * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// Index-aligned EMA: one entry per input, `None` during warm-up.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    align(&calculate_ema(values, period), period - 1, values.len())
}
