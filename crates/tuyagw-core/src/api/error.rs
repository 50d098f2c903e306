use thiserror::Error;

use crate::auth::error::truncate_body;
use crate::auth::AuthError;

/// Upstream code for an access token it no longer accepts.
pub const CODE_TOKEN_INVALID: i64 = 1010;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Upstream rejected the request (code {code:?}): {msg}")]
    Rejected { code: Option<i64>, msg: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Whether the upstream refused the access token itself.
    pub fn is_token_rejection(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
            || matches!(self, ApiError::Rejected { code: Some(CODE_TOKEN_INVALID), .. })
    }

    /// Status an HTTP front end should answer with. Only malformed input is a
    /// client error; everything else is the upstream's or the gateway's.
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Auth(e) => e.http_status(),
            _ => 502,
        }
    }
}
