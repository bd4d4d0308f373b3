//! Exponential backoff with jitter for restart retries.

use std::time::Duration;

use rand::Rng;

/// Delay before retry number `attempt` (1-based). Attempt 0 waits nothing.
///
/// `base * 2^(attempt-1)`, capped at `max`, plus up to 10% jitter so repeated
/// restarts do not land on the service manager in lockstep.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(attempt - 1);
    let capped = base.saturating_mul(factor).min(max);

    let jitter_ms = capped.as_millis() as u64 / 10;
    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..jitter_ms)
    } else {
        0
    };

    capped + Duration::from_millis(jitter)
}
