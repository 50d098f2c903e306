use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw body of a token response, exactly as the upstream sent it.
///
/// Unknown fields are kept in `extra` so the persisted record round-trips
/// without losing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TokenResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Validity in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A bearer token with the issuance data needed to judge its freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Milliseconds since epoch.
    pub issued_at: i64,
    /// Seconds.
    pub expires_in: i64,
}

impl IssuedToken {
    pub fn expires_at(&self) -> i64 {
        self.issued_at
            .saturating_add(self.expires_in.saturating_mul(1000))
    }

    pub fn is_stale(&self, now_ms: i64) -> bool {
        self.expires_at() <= now_ms
    }

    /// Whole seconds left before the token goes stale, never negative.
    pub fn remaining_secs(&self, now_ms: i64) -> i64 {
        (self.expires_at() - now_ms).max(0) / 1000
    }
}

/// Token state owned by the credential store.
///
/// A token is only ever present together with its issuance time and
/// lifetime; `record` is the response it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenState {
    pub(crate) token: Option<IssuedToken>,
    pub(crate) record: Option<AuthRecord>,
}

/// Where a `TokenState` stands relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    NoToken,
    Valid { remaining_secs: i64 },
    Stale,
}

impl TokenState {
    /// Build state from a token response. Records without a complete token
    /// (`t`, `access_token`, `expire_time`) yield an empty state.
    pub fn from_record(record: AuthRecord) -> Self {
        match Self::issued_token(&record) {
            Some(token) => Self {
                token: Some(token),
                record: Some(record),
            },
            None => Self::default(),
        }
    }

    pub(crate) fn issued_token(record: &AuthRecord) -> Option<IssuedToken> {
        let result = record.result.as_ref()?;
        Some(IssuedToken {
            access_token: result.access_token.clone()?,
            refresh_token: result.refresh_token.clone(),
            issued_at: record.t?,
            expires_in: result.expire_time?,
        })
    }

    pub fn token(&self) -> Option<&IssuedToken> {
        self.token.as_ref()
    }

    pub fn record(&self) -> Option<&AuthRecord> {
        self.record.as_ref()
    }

    pub fn status(&self, now_ms: i64) -> TokenStatus {
        match &self.token {
            None => TokenStatus::NoToken,
            Some(token) if token.is_stale(now_ms) => TokenStatus::Stale,
            Some(token) => TokenStatus::Valid {
                remaining_secs: token.remaining_secs(now_ms),
            },
        }
    }
}
