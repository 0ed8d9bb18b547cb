// =============================================================================
// Rate-Limit Tracker — request weight reported by Binance
// =============================================================================
//
// Binance allows 1200 request weight per minute per IP; we stop at 1000.
// The `X-MBX-USED-WEIGHT-1M` header carries the current minute's usage after
// every response, so the tracker mirrors the latest value together with the
// UTC minute it was reported in.  Binance resets the counter at each minute
// boundary, so a value recorded in an earlier minute reads as zero.
// =============================================================================

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
const WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 800;

/// Minutes since the UNIX epoch, UTC.
fn current_minute() -> i64 {
    chrono::Utc::now().timestamp_millis().div_euclid(60_000)
}

/// Thread-safe request-weight tracker backed by atomic counters.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
    /// Minute in which `used_weight_1m` was last reported.
    weight_minute: AtomicI64,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
            weight_minute: AtomicI64::new(i64::MIN),
        }
    }

    /// Update the counter from Binance response headers.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(w) = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };
        self.record_weight(w, current_minute());
    }

    fn record_weight(&self, w: u32, minute: i64) {
        let prev = self.weight_at(minute);
        self.weight_minute.store(minute, Ordering::Relaxed);
        self.used_weight_1m.store(w, Ordering::Relaxed);
        if w >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = w,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = w, "rate-limit weight updated from header");
    }

    /// Weight used during `minute`; zero if the last report is older.
    fn weight_at(&self, minute: i64) -> u32 {
        if self.weight_minute.load(Ordering::Relaxed) == minute {
            self.used_weight_1m.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    /// Return `true` if `weight` more can be spent without crossing the
    /// hard limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        self.can_send_at(weight, current_minute())
    }

    fn can_send_at(&self, weight: u32, minute: i64) -> bool {
        let current = self.weight_at(minute);
        let allowed = current.saturating_add(weight) <= WEIGHT_HARD_LIMIT;
        if !allowed {
            warn!(
                current_weight = current,
                requested_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "request blocked — would exceed rate-limit"
            );
        }
        allowed
    }

    /// Weight used in the current minute.
    pub fn used_weight(&self) -> u32 {
        self.weight_at(current_minute())
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn headers(weight: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-MBX-USED-WEIGHT-1M", HeaderValue::from_static(weight));
        headers
    }

    #[test]
    fn mirrors_header_value() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&headers("42"));
        assert_eq!(tracker.used_weight_1m.load(Ordering::Relaxed), 42);
        let minute = tracker.weight_minute.load(Ordering::Relaxed);
        assert_eq!(tracker.weight_at(minute), 42);
    }

    #[test]
    fn ignores_missing_or_bad_header() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&HeaderMap::new());
        tracker.update_from_headers(&headers("lots"));
        assert_eq!(tracker.used_weight(), 0);
        assert!(tracker.can_send_request(2));
    }

    #[test]
    fn blocks_near_hard_limit() {
        let tracker = RateLimitTracker::new();
        assert!(tracker.can_send_at(2, 100));
        tracker.record_weight(999, 100);
        assert!(!tracker.can_send_at(2, 100));
        assert!(tracker.can_send_at(1, 100));
    }

    #[test]
    fn budget_reopens_next_minute() {
        let tracker = RateLimitTracker::new();
        tracker.record_weight(999, 100);
        for _ in 0..100 {
            assert!(!tracker.can_send_at(2, 100));
        }
        assert!(tracker.can_send_at(2, 101));
        assert_eq!(tracker.weight_at(101), 0);

        tracker.record_weight(10, 101);
        assert_eq!(tracker.weight_at(101), 10);
    }

    #[test]
    fn huge_header_value_does_not_overflow() {
        let tracker = RateLimitTracker::new();
        tracker.record_weight(u32::MAX, 7);
        assert!(!tracker.can_send_at(2, 7));
        assert!(tracker.can_send_at(2, 8));
    }
}
