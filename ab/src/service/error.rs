//! Service error types and the client's retry rule

use std::time::Duration;
use thiserror::Error;

/// Statuses worth re-sending a read-only request for
const TRANSIENT_STATUSES: &[u16] = &[408, 500, 502, 503, 504];

/// Failure talking to the puzzle or assistant service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 429; surfaced immediately with the server's hint
    #[error("Service is rate limiting requests, retry in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Service returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Could not reach service: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Response body is not the expected JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    /// The one rule the HTTP client uses to decide on another attempt
    ///
    /// Only transport failures and transient statuses qualify. The client
    /// consults it for GETs alone; generation and chat POSTs are sent once.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::ApiError { status, .. } => TRANSIENT_STATUSES.contains(status),
            ServiceError::Network(_) | ServiceError::Timeout(_) => true,
            ServiceError::RateLimited { .. } | ServiceError::InvalidResponse(_) | ServiceError::Json(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ServiceError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
