//! Background eviction of idle clients.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::rate_limiter::RateLimiter;

/// Spawn the periodic sweep task.
///
/// Every `interval` the task evicts clients idle for at least `idle_timeout`.
/// It exits at the next await point after `shutdown` flips to `true` or its
/// sender is dropped; await the returned handle to join it.
pub fn spawn(
    limiter: RateLimiter,
    interval: Duration,
    idle_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = interval.as_secs_f64(),
            idle_timeout_secs = idle_timeout.as_secs_f64(),
            "idle client sweeper started"
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let evicted = limiter.sweep_idle(idle_timeout);
                    if evicted > 0 {
                        debug!(evicted, remaining = limiter.len(), "evicted idle clients");
                    }
                }
            }
        }

        info!("idle client sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::policy::RateLimitPolicy;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sweeper_evicts_idle_clients() {
        let clock = MockClock::default();
        let limiter = RateLimiter::with_clock(RateLimitPolicy::default(), Arc::new(clock.clone()));
        limiter.admit("idle");
        clock.advance(Duration::from_secs(600));
        limiter.admit("active");

        let (tx, rx) = watch::channel(false);
        let handle = spawn(
            limiter.clone(),
            Duration::from_millis(10),
            Duration::from_secs(180),
            rx,
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!limiter.is_tracked("idle"));
        assert!(limiter.is_tracked("active"));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_sender_dropped() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        let (tx, rx) = watch::channel(false);
        let handle = spawn(limiter, Duration::from_secs(60), Duration::from_secs(180), rx);

        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_exits_if_already_shut_down() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        let (_tx, rx) = watch::channel(true);
        let handle = spawn(limiter, Duration::from_secs(60), Duration::from_secs(180), rx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
