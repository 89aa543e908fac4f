use serde::{Deserialize, Serialize};

/// Body of a successful `/no` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExcuseResponse {
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub tracked_clients: usize,
    pub excuses: usize,
}

impl HealthResponse {
    pub fn healthy(tracked_clients: usize, excuses: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tracked_clients,
            excuses,
        }
    }
}
