//! Exponential backoff delay computation, per SPEC_FULL.md §4.3.4:
//! `delay = retry_delay_base ^ retry_count` seconds, capped at an
//! implementation-defined ceiling.

use std::time::Duration;

/// Computes the backoff delay before the attempt numbered `retry_count`
/// (1-indexed: the first retry is `retry_count = 1`), capped at `cap`.
pub fn backoff_delay(retry_count: u32, base: f64, cap: Duration) -> Duration {
    let seconds = base.powi(retry_count as i32);
    if !seconds.is_finite() || seconds < 0.0 {
        return cap;
    }
    Duration::from_secs_f64(seconds).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_two_doubles_each_retry() {
        assert_eq!(backoff_delay(1, 2.0, Duration::from_secs(600)), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, 2.0, Duration::from_secs(600)), Duration::from_secs(4));
        assert_eq!(backoff_delay(3, 2.0, Duration::from_secs(600)), Duration::from_secs(8));
    }

    #[test]
    fn delay_is_capped() {
        let delay = backoff_delay(20, 2.0, Duration::from_secs(600));
        assert_eq!(delay, Duration::from_secs(600));
    }

    #[test]
    fn delays_are_monotonically_non_decreasing() {
        let cap = Duration::from_secs(600);
        let mut previous = Duration::ZERO;
        for retry in 1..10 {
            let delay = backoff_delay(retry, 2.0, cap);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn fractional_base_matches_scenario_in_spec() {
        // SPEC_FULL.md §8.3 scenario 3: retry_delay_base = 1.1.
        let first = backoff_delay(1, 1.1, Duration::from_secs(600));
        let second = backoff_delay(2, 1.1, Duration::from_secs(600));
        assert!(first.as_secs_f64() >= 1.1 - 1e-9);
        assert!(second.as_secs_f64() >= 1.21 - 1e-9);
    }
}
