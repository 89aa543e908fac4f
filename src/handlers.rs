use axum::{
    extract::{Request, State},
    response::IntoResponse,
    Json,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::debug;

use crate::error::ServiceError;
use crate::excuses::ExcuseList;
use crate::identity::request_identity;
use crate::rate_limiter::RateLimiter;
use crate::response::{ExcuseResponse, HealthResponse};

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Everything a request handler needs, built once at startup.
#[derive(Debug)]
pub struct AppState {
    pub limiter: RateLimiter,
    pub excuses: Arc<ExcuseList>,
    rng: Mutex<StdRng>,
}

impl AppState {
    /// `seed` fixes the excuse sequence; without one the RNG is seeded from the OS.
    pub fn new(limiter: RateLimiter, excuses: Arc<ExcuseList>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            limiter,
            excuses,
            rng: Mutex::new(rng),
        }
    }

    pub fn pick_excuse(&self) -> String {
        let mut rng = self.rng.lock();
        self.excuses.pick(&mut *rng).to_string()
    }
}

/// `GET /no`: a random excuse, if the caller still has tokens.
pub async fn excuse(
    State(state): State<SharedState>,
    request: Request,
) -> Result<Json<ExcuseResponse>, ServiceError> {
    let identity = request_identity(&request);

    if !state.limiter.admit(&identity) {
        debug!(client = %identity, "rate limit exceeded");
        return Err(ServiceError::RateLimitExceeded {
            retry_after: state.limiter.retry_after(),
        });
    }

    Ok(Json(ExcuseResponse {
        reason: state.pick_excuse(),
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthResponse::healthy(
        state.limiter.len(),
        state.excuses.len(),
    ))
}
