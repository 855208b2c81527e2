//! # Backoff Policy
//!
//! Pure retry-delay computation: exponential growth with ±20% jitter.
//!
//! ## Delay Curve
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Exponential Backoff with Jitter                         │
//! │                                                                         │
//! │  attempt 0:  base        (1s)   ± 20%                                  │
//! │  attempt 1:  base · 2    (2s)   ± 20%                                  │
//! │  attempt 2:  base · 4    (4s)   ± 20%                                  │
//! │  attempt 3:  base · 8    (8s)   ± 20%                                  │
//! │  ...                                                                    │
//! │  attempt n:  min(base · 2ⁿ, max) ± 20%                                 │
//! │                                                                         │
//! │  CEILING: the jittered delay never exceeds max · 1.2                   │
//! │                                                                         │
//! │  WHY JITTER: a fleet of displays losing the same network link would    │
//! │  otherwise reconnect in lockstep and stampede the server.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//! The jitter draw is a *parameter* (a unit-interval float), never an internal
//! RNG. Production call sites pass `rand::random::<f64>()`; tests pass a fixed
//! value and get byte-identical delays. This is what makes retry timing
//! testable without real timers.

use std::time::Duration;

/// Default base delay for the first retry.
pub const DEFAULT_BASE: Duration = Duration::from_millis(1000);

/// Default ceiling on the un-jittered delay.
pub const DEFAULT_MAX: Duration = Duration::from_millis(60_000);

/// Default jitter fraction (±20%).
pub const DEFAULT_JITTER: f64 = 0.2;

/// Pure exponential-backoff policy.
///
/// ## Contract
/// `delay_for(attempt, draw)` = `min(base · 2^attempt, max)` scaled by a
/// uniform factor in `[1 - jitter, 1 + jitter]` derived from `draw`:
/// - monotonically non-decreasing in expectation as `attempt` grows
/// - bounded above by `max · (1 + jitter)` for every attempt
/// - deterministic given a fixed `draw`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay for attempt 0, before jitter.
    pub base: Duration,

    /// Ceiling on the un-jittered delay.
    pub max: Duration,

    /// Jitter fraction in [0, 1]. 0.2 means ±20%.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: DEFAULT_BASE,
            max: DEFAULT_MAX,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with the given base and ceiling, keeping ±20% jitter.
    pub fn new(base: Duration, max: Duration) -> Self {
        BackoffPolicy {
            base,
            max,
            jitter: DEFAULT_JITTER,
        }
    }

    /// Computes the delay for the given attempt.
    ///
    /// ## Arguments
    /// * `attempt` - Zero-based count of consecutive failures.
    /// * `unit_draw` - A value in [0, 1). 0.0 yields the minimum jitter,
    ///   values near 1.0 the maximum, 0.5 exactly the un-jittered delay.
    ///   Out-of-range inputs are clamped.
    pub fn delay_for(&self, attempt: u32, unit_draw: f64) -> Duration {
        let base_ms = self.base.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;

        // base · 2^attempt, saturating: past ~2^63 the shift alone would
        // overflow long before the cap applies
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let raw_ms = base_ms.saturating_mul(factor);

        let capped_ms = raw_ms.min(max_ms);

        // Map draw ∈ [0,1) onto [1 - jitter, 1 + jitter]
        let draw = unit_draw.clamp(0.0, 1.0);
        let scale = 1.0 - self.jitter + (2.0 * self.jitter * draw);
        let jittered_ms = (capped_ms as f64 * scale).round() as u64;

        Duration::from_millis(jittered_ms)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MID_DRAW: f64 = 0.5; // exactly zero jitter

    #[test]
    fn test_doubles_per_attempt_at_mid_draw() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(0, MID_DRAW), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1, MID_DRAW), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2, MID_DRAW), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3, MID_DRAW), Duration::from_millis(8000));
    }

    #[test]
    fn test_capped_at_max() {
        let policy = BackoffPolicy::default();
        // 2^10 seconds would be ~17 minutes; the cap holds it at 60s
        assert_eq!(policy.delay_for(10, MID_DRAW), Duration::from_millis(60_000));
        assert_eq!(policy.delay_for(63, MID_DRAW), Duration::from_millis(60_000));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(u32::MAX, MID_DRAW), Duration::from_millis(60_000));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = BackoffPolicy::default();

        for attempt in 0..20 {
            let nominal = policy.delay_for(attempt, MID_DRAW).as_millis() as f64;
            let low = policy.delay_for(attempt, 0.0).as_millis() as f64;
            let high = policy.delay_for(attempt, 0.999_999).as_millis() as f64;

            assert!((low - nominal * 0.8).abs() < 1.0, "attempt {}", attempt);
            assert!(high <= nominal * 1.2 + 1.0, "attempt {}", attempt);
        }
    }

    #[test]
    fn test_never_exceeds_max_times_one_point_two() {
        let policy = BackoffPolicy::default();
        let ceiling = Duration::from_millis((60_000f64 * 1.2) as u64);

        for attempt in [0, 5, 10, 31, 64, 1000] {
            assert!(policy.delay_for(attempt, 1.0) <= ceiling);
        }
    }

    #[test]
    fn test_deterministic_given_fixed_draw() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(4, 0.25), policy.delay_for(4, 0.25));
    }

    #[test]
    fn test_out_of_range_draw_is_clamped() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(0, -3.0), policy.delay_for(0, 0.0));
        assert_eq!(policy.delay_for(0, 7.5), policy.delay_for(0, 1.0));
    }

    #[test]
    fn test_custom_base_and_max() {
        let policy = BackoffPolicy::new(Duration::from_millis(250), Duration::from_secs(5));
        assert_eq!(policy.delay_for(0, MID_DRAW), Duration::from_millis(250));
        assert_eq!(policy.delay_for(1, MID_DRAW), Duration::from_millis(500));
        assert_eq!(policy.delay_for(20, MID_DRAW), Duration::from_millis(5000));
    }
}
