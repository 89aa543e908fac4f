use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ServiceError};
use crate::policy::RateLimitPolicy;

/// Service configuration, read from command line flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "nope", version, about = "Says no, with a reason, at a polite rate")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// JSON file holding an array of excuses
    #[arg(long, env = "EXCUSES_PATH", default_value = "reasons.json")]
    pub excuses_path: PathBuf,

    /// Sustained requests per minute allowed for each client
    #[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value_t = 30)]
    pub requests_per_minute: u32,

    /// Token bucket capacity (burst size) for each client
    #[arg(long, env = "RATE_LIMIT_BURST", default_value_t = 10)]
    pub burst: u32,

    /// Idle client sweep interval in seconds
    #[arg(long, env = "CLEANUP_INTERVAL", default_value_t = 60)]
    pub cleanup_interval_secs: u64,

    /// Seconds without a request before a client's limiter is dropped
    #[arg(long, env = "CLIENT_IDLE_TIMEOUT", default_value_t = 180)]
    pub idle_timeout_secs: u64,

    /// Seconds to let in-flight requests finish after a shutdown signal
    #[arg(long, env = "SHUTDOWN_GRACE_PERIOD", default_value_t = 10)]
    pub shutdown_grace_secs: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Fixed seed for excuse selection, for reproducible output
    #[arg(long, env = "EXCUSE_SEED")]
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            excuses_path: PathBuf::from("reasons.json"),
            requests_per_minute: 30,
            burst: 10,
            cleanup_interval_secs: 60,
            idle_timeout_secs: 180,
            shutdown_grace_secs: 10,
            log_level: "info".to_string(),
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from command line arguments and environment variables
    pub fn load() -> Self {
        Config::parse()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.policy().validate()?;

        if self.cleanup_interval_secs == 0 {
            return Err(ServiceError::Config(
                "Cleanup interval must be greater than 0".to_string(),
            ));
        }

        if self.idle_timeout_secs == 0 {
            return Err(ServiceError::Config(
                "Client idle timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::per_minute(self.requests_per_minute, self.burst)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy(), RateLimitPolicy::default());
        assert_eq!(config.cleanup_interval(), Duration::from_secs(60));
        assert_eq!(config.idle_timeout(), Duration::from_secs(180));
    }

    #[test]
    fn test_parse_flags() {
        let config = Config::try_parse_from([
            "nope",
            "--bind-addr",
            "127.0.0.1:9000",
            "--requests-per-minute",
            "60",
            "--burst",
            "3",
            "--seed",
            "11",
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.policy(), RateLimitPolicy::new(3, 1.0));
        assert_eq!(config.seed, Some(11));
    }

    #[test]
    fn test_invalid_values() {
        let config = Config {
            burst: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            requests_per_minute: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            cleanup_interval_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            idle_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        assert!(Config::try_parse_from(["nope", "--bind-addr", "localhost"]).is_err());
    }
}
