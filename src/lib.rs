pub mod clock;
pub mod config;
pub mod error;
pub mod excuses;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod policy;
pub mod rate_limiter;
pub mod response;
pub mod server;
pub mod sweeper;
pub mod token_bucket;

pub use config::Config;
pub use error::{Result, ServiceError};
pub use excuses::ExcuseList;
pub use policy::RateLimitPolicy;
pub use rate_limiter::RateLimiter;
pub use server::{create_app, Server};
