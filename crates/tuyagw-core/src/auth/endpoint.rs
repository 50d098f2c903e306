//! The upstream token endpoint.
//!
//! `GET {base}/token?grant_type=1` issues a fresh token,
//! `GET {base}/token/{refresh_token}` renews one. Both are signed without an
//! access token.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::AuthError;
use super::signer::SignedHeaders;
use super::token::AuthRecord;

/// Which kind of token call to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRequest {
    /// Full authentication with the client credentials.
    Grant,
    /// Renewal with a refresh token.
    Refresh(String),
}

impl TokenRequest {
    pub fn path(&self) -> String {
        match self {
            TokenRequest::Grant => "token?grant_type=1".to_string(),
            TokenRequest::Refresh(refresh_token) => format!("token/{}", refresh_token),
        }
    }
}

/// Something that can answer token requests. Implemented over HTTP in
/// production and by fakes in tests.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Perform the request and return the raw response body, or an error if
    /// the upstream did not issue a token.
    async fn request_token(
        &self,
        request: &TokenRequest,
        headers: &SignedHeaders,
    ) -> Result<AuthRecord, AuthError>;
}

/// Token endpoint reached over HTTP.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTokenEndpoint {
    client: Client,
    base_url: String,
}

impl HttpTokenEndpoint {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn request_token(
        &self,
        request: &TokenRequest,
        headers: &SignedHeaders,
    ) -> Result<AuthRecord, AuthError> {
        let url = format!("{}/{}", self.base_url, request.path());
        let header_map = headers
            .to_header_map()
            .map_err(|e| AuthError::InvalidResponse(format!("unencodable header: {}", e)))?;

        let response = self.client.get(&url).headers(header_map).send().await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, bytes = body.len(), "Token response received");

        if !status.is_success() {
            return Err(AuthError::from_status(status, &body));
        }
        parse_token_body(&body)
    }
}

/// Decode a 200 token response, rejecting bodies that do not carry a token.
pub(crate) fn parse_token_body(body: &str) -> Result<AuthRecord, AuthError> {
    let record: AuthRecord = serde_json::from_str(body)
        .map_err(|e| AuthError::InvalidResponse(format!("not a token response: {}", e)))?;

    if record.success == Some(false) {
        return Err(AuthError::Rejected {
            code: record.code,
            msg: record.msg.clone().unwrap_or_default(),
        });
    }

    let has_token = record
        .result
        .as_ref()
        .is_some_and(|r| r.access_token.is_some() && r.expire_time.is_some());
    if !has_token {
        return Err(AuthError::InvalidResponse(
            "missing result.access_token or result.expire_time".to_string(),
        ));
    }
    if record.t.is_none() {
        return Err(AuthError::InvalidResponse("missing t".to_string()));
    }

    Ok(record)
}
