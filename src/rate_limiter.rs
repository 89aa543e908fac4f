use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::policy::RateLimitPolicy;
use crate::token_bucket::TokenBucket;

/// Per-client rate limiter registry.
///
/// Every identity gets its own [`TokenBucket`], created on first sight and
/// evicted by [`RateLimiter::sweep`] once the client has been idle long
/// enough. Cloning is cheap and all clones share the same registry.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    clients: Arc<Mutex<HashMap<String, ClientRecord>>>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug)]
struct ClientRecord {
    last_seen: Instant,
    bucket: TokenBucket,
}

impl ClientRecord {
    fn new(policy: &RateLimitPolicy, now: Instant) -> Self {
        Self {
            last_seen: now,
            bucket: TokenBucket::new(policy.capacity, policy.refill_rate, now),
        }
    }
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clients: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Decide whether a request from `identity` may proceed.
    ///
    /// Creates the client's record on first use, refreshes its last-seen time,
    /// refills its bucket and takes one token. The whole read-modify-write
    /// happens under the registry lock, so concurrent calls for the same
    /// identity are linearizable.
    pub fn admit(&self, identity: &str) -> bool {
        let now = self.clock.now();
        let mut clients = self.clients.lock();

        let record = clients
            .entry(identity.to_owned())
            .or_insert_with(|| ClientRecord::new(&self.policy, now));

        record.last_seen = now;
        record.bucket.try_consume(now)
    }

    /// Remove every client idle for at least `idle_threshold` as of `now`.
    ///
    /// Returns the number of evicted clients.
    pub fn sweep(&self, idle_threshold: Duration, now: Instant) -> usize {
        let mut clients = self.clients.lock();
        let initial_count = clients.len();

        clients.retain(|_, record| now.saturating_duration_since(record.last_seen) < idle_threshold);

        initial_count - clients.len()
    }

    /// [`RateLimiter::sweep`] using the limiter's own clock.
    pub fn sweep_idle(&self, idle_threshold: Duration) -> usize {
        self.sweep(idle_threshold, self.clock.now())
    }

    /// Whole tokens currently held by `identity`, or `None` if it is not tracked.
    ///
    /// Does not refill and does not count as activity.
    pub fn remaining_tokens(&self, identity: &str) -> Option<u32> {
        self.clients
            .lock()
            .get(identity)
            .map(|record| record.bucket.tokens().floor() as u32)
    }

    pub fn is_tracked(&self, identity: &str) -> bool {
        self.clients.lock().contains_key(identity)
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How long a denied client should wait before one token is back.
    pub fn retry_after(&self) -> Duration {
        self.policy.retry_after()
    }
}
