//! Exponential backoff with jitter.
//!
//! Used by reply pumps between consecutive consume failures so a dead broker
//! connection is not polled in a hot loop. Requests themselves are never
//! retried.

use rand::Rng;
use std::time::Duration;

/// Delay after the first failure.
pub const BASE_DELAY_MS: u64 = 50;

/// Upper bound on any single delay.
pub const MAX_DELAY_MS: u64 = 5_000;

/// Delay before the next attempt after `failures` consecutive failures.
pub fn calculate_backoff(failures: u32, base_ms: u64, max_ms: u64) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(failures - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    // Up to 10% jitter so pumps of several channels do not wake in lockstep.
    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

/// Pump backoff with the default bounds.
pub fn pump_backoff(failures: u32) -> Duration {
    calculate_backoff(failures, BASE_DELAY_MS, MAX_DELAY_MS)
}
