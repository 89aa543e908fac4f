use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to read excuse file {path}: {source}")]
    ExcusesUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("excuse file is not a JSON array of strings: {0}")]
    ExcusesMalformed(#[from] serde_json::Error),

    #[error("excuse list is empty")]
    NoExcuses,

    #[error("excuse at index {0} is blank")]
    BlankExcuse(usize),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Server(#[source] io::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Duration },
}

/// JSON body returned for every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::RateLimitExceeded { retry_after } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(ErrorResponse::new("Rate limit exceeded")),
                )
                    .into_response();

                let seconds = retry_after.as_secs_f64().ceil().clamp(1.0, u32::MAX as f64) as u64;
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
                response
            }
            // Startup failures should never reach a client, but if one does it
            // must not leak paths or io details.
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("Internal server error")),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_response() {
        let response = ServiceError::RateLimitExceeded {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let response = ServiceError::ExcusesUnreadable {
            path: PathBuf::from("/secret/reasons.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_serialization() {
        let json = serde_json::to_string(&ErrorResponse::new("Rate limit exceeded")).unwrap();
        assert_eq!(json, r#"{"error":"Rate limit exceeded"}"#);
    }
}
