//! Linear backoff with an upper bound.

use std::time::Duration;

/// Delay before reconnect attempt `attempt` (1-based): `min(attempt * step, cap)`.
///
/// Attempt 0 means "no failure yet" and yields no delay. The sequence is
/// monotonic non-decreasing and never exceeds `cap`.
pub fn linear_backoff(attempt: u32, step: Duration, cap: Duration) -> Duration {
    step.saturating_mul(attempt).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_secs(2);
    const CAP: Duration = Duration::from_secs(30);

    #[test]
    fn test_backoff_sequence() {
        let delays: Vec<u64> = (1..=18)
            .map(|attempt| linear_backoff(attempt, STEP, CAP).as_secs())
            .collect();

        assert_eq!(
            delays,
            vec![2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30, 30, 30, 30]
        );
    }

    #[test]
    fn test_backoff_monotonic_and_capped() {
        let mut previous = Duration::ZERO;
        for attempt in 1..200 {
            let delay = linear_backoff(attempt, STEP, CAP);
            assert!(delay >= previous);
            assert!(delay <= CAP);
            previous = delay;
        }
    }

    #[test]
    fn test_backoff_zero_and_overflow() {
        assert_eq!(linear_backoff(0, STEP, CAP), Duration::ZERO);
        assert_eq!(linear_backoff(u32::MAX, Duration::MAX, CAP), CAP);
    }
}
