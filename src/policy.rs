use std::time::Duration;

use crate::error::{Result, ServiceError};

/// Token bucket parameters shared by every client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitPolicy {
    /// Maximum burst size, and the token count of a new client's bucket
    pub capacity: u32,
    /// Tokens restored per second
    pub refill_rate: f64,
}

impl Default for RateLimitPolicy {
    /// 30 requests per minute with a burst of 10.
    fn default() -> Self {
        Self::per_minute(30, 10)
    }
}

impl RateLimitPolicy {
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
        }
    }

    /// Build a policy from a sustained "requests per minute" figure.
    pub fn per_minute(requests_per_minute: u32, burst: u32) -> Self {
        Self::new(burst, requests_per_minute as f64 / 60.0)
    }

    /// Time for an empty bucket to regain a single token.
    pub fn retry_after(&self) -> Duration {
        if self.refill_rate <= 0.0 || !self.refill_rate.is_finite() {
            return Duration::MAX;
        }
        Duration::try_from_secs_f64(1.0 / self.refill_rate).unwrap_or(Duration::MAX)
    }

    /// Validate policy parameters
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ServiceError::Config(
                "Burst capacity must be greater than 0".to_string(),
            ));
        }
        if !(self.refill_rate.is_finite() && self.refill_rate > 0.0) {
            return Err(ServiceError::Config(
                "Refill rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
