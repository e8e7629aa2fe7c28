//! Periodic removal of expired client state.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::registry::LimiterSet;

/// Spawn a task that sweeps `limiters` every `interval`.
///
/// The task runs until the returned handle is aborted.
pub fn spawn_sweeper(limiters: Arc<LimiterSet>, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs_f64(), "Starting client state sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiters.sweep_expired();
            debug!(removed, "Swept expired client windows");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::{Clock, ManualClock};
    use crate::ratelimit::{PolicyConfig, SWEEP_GRACE_MS};

    #[tokio::test]
    async fn test_sweeper_prunes_expired_clients() {
        let clock = Arc::new(ManualClock::new(0));
        let set = Arc::new(
            LimiterSet::new(
                [("general", PolicyConfig::new(1_000, 10, "slow down").unwrap())],
                clock.clone(),
            )
            .unwrap(),
        );

        let limiter = set.get("general").unwrap().clone();
        limiter.check_now("a");
        limiter.check_now("b");
        clock.advance(Duration::from_millis(1_000 + SWEEP_GRACE_MS + 1));
        limiter.check_now("c");

        let handle = spawn_sweeper(set.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.client_count("c", clock.now_ms()), Some(1));
    }
}
