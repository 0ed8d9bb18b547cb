// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the scanner reads.
// The low-level calculators return compact series (one value per defined
// position); `align` re-expands them onto the bar index so that every derived
// value sits next to the bar it was computed from.  Warm-up positions are
// `None`.
//
// No calculator looks ahead: the value at index `i` depends only on inputs at
// indices `<= i`.

pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;

pub use engine::{IndicatorEngine, IndicatorParams, IndicatorRow};

/// Expand a compact series whose first value belongs to input index `offset`
/// into a `len`-long, index-aligned series.
///
/// Positions before `offset`, and positions past the end of `compact` (a
/// series truncated by a non-finite value), are `None`.
pub fn align(compact: &[f64], offset: usize, len: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; len];
    for (i, &v) in compact.iter().enumerate() {
        match out.get_mut(offset + i) {
            Some(slot) => *slot = Some(v),
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_places_values_after_offset() {
        let out = align(&[1.0, 2.0], 2, 5);
        assert_eq!(out, vec![None, None, Some(1.0), Some(2.0), None]);
    }

    #[test]
    fn align_empty_compact_is_all_none() {
        assert_eq!(align(&[], 0, 3), vec![None, None, None]);
    }

    #[test]
    fn align_never_grows_past_len() {
        let out = align(&[1.0, 2.0, 3.0], 1, 2);
        assert_eq!(out, vec![None, Some(1.0)]);
    }
}
