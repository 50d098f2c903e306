use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Maximum length for response bodies carried in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Failure to obtain or renew a token from the upstream.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Token request rejected by upstream (code {code:?}): {msg}")]
    Rejected { code: Option<i64>, msg: String },

    #[error("Network error during token request: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Token request timed out after {0:?}")]
    Timeout(Duration),
}

impl AuthError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        AuthError::Status {
            status: status.as_u16(),
            body: truncate_body(body),
        }
    }

    /// Status an HTTP front end should answer with. Always server-side: the
    /// problem lies with the upstream or the configured credentials, not with
    /// the inbound request.
    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::Timeout(_) => 504,
            _ => 502,
        }
    }
}

/// Failure reading or writing the persisted token record.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Token file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to access token file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse token file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Nothing to persist: no authentication response held")]
    Empty,
}

/// Truncate a response body to avoid logging excessive data
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");

        let long = "x".repeat(600);
        let truncated = truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundary() {
        let long = "é".repeat(300);
        let truncated = truncate_body(&long);
        assert!(truncated.contains("truncated, 600 total bytes"));
    }

    #[test]
    fn test_http_status_is_server_side() {
        let status = AuthError::from_status(reqwest::StatusCode::UNAUTHORIZED, "nope");
        assert_eq!(status.http_status(), 502);
        assert!(matches!(status, AuthError::Status { status: 401, .. }));
        assert_eq!(AuthError::Timeout(Duration::from_secs(1)).http_status(), 504);
    }
}
