//! Background cleanup of expired rate counters.

use std::time::{Duration, Instant};

use gatehouse_core::RateLimiter;

/// Sweeps expired counters every `every` until the task is dropped.
pub async fn run(limiter: RateLimiter, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let removed = limiter.cleanup(Instant::now());
        if removed > 0 {
            tracing::info!(removed, remaining = limiter.tracked(), "Swept expired rate counters");
        }
    }
}
