// =============================================================================
// MACD — Moving Average Convergence Divergence
// =============================================================================
//
//   line      = EMA(fast) - EMA(slow)            defined from index slow - 1
//   signal    = EMA(signal) over the defined line  defined from slow + signal - 2
//   histogram = line - signal
//
// All three EMAs are SMA-seeded (see `ema.rs`).
// =============================================================================

use super::align;
use super::ema::{calculate_ema, ema_series};

/// Index-aligned MACD output; every vector has the input length.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Compute MACD(`fast`, `slow`, `signal`) over `closes`.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let len = closes.len();
    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    // The signal EMA runs over the first contiguous defined stretch of the line.
    let start = line.iter().position(Option::is_some);
    let signal_line = match start {
        Some(start) if signal > 0 => {
            let defined: Vec<f64> = line[start..].iter().map_while(|v| *v).collect();
            align(&calculate_ema(&defined, signal), start + signal - 1, len)
        }
        _ => vec![None; len],
    };

    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    MacdSeries {
        line,
        signal: signal_line,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + 5.0 * (i as f64 / 7.0).sin()).collect()
    }

    #[test]
    fn warm_up_boundaries_for_standard_periods() {
        let macd = calculate_macd(&wave(60), 12, 26, 9);
        assert!(macd.line[24].is_none());
        assert!(macd.line[25].is_some());
        assert!(macd.signal[32].is_none());
        assert!(macd.signal[33].is_some());
        assert!(macd.histogram[32].is_none());
        assert!(macd.histogram[33].is_some());
        assert!(macd.histogram[59].is_some());
    }

    #[test]
    fn histogram_is_line_minus_signal() {
        let macd = calculate_macd(&wave(80), 12, 26, 9);
        for i in 33..80 {
            let (l, s, h) = (
                macd.line[i].unwrap(),
                macd.signal[i].unwrap(),
                macd.histogram[i].unwrap(),
            );
            assert!((h - (l - s)).abs() < 1e-12);
        }
    }

    #[test]
    fn short_input_is_all_none() {
        let macd = calculate_macd(&wave(30), 12, 26, 9);
        assert_eq!(macd.histogram.len(), 30);
        assert!(macd.histogram.iter().all(Option::is_none));
    }

    #[test]
    fn flat_input_has_zero_histogram() {
        let macd = calculate_macd(&vec![10.0; 50], 12, 26, 9);
        for h in macd.histogram.iter().flatten() {
            assert!(h.abs() < 1e-12);
        }
    }

    #[test]
    fn later_bars_do_not_change_earlier_values() {
        let mut closes = wave(70);
        let before = calculate_macd(&closes, 12, 26, 9);
        closes[50] *= 3.0;
        let after = calculate_macd(&closes, 12, 26, 9);
        assert_eq!(before.histogram[..50], after.histogram[..50]);
    }
}
