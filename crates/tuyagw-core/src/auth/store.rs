//! The credential store: owns the token, decides when to (re)authenticate,
//! and hands out signed headers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};

use super::endpoint::{HttpTokenEndpoint, TokenEndpoint, TokenRequest};
use super::error::{AuthError, PersistError};
use super::persist::TokenFile;
use super::signer::{sign, Credentials, SignedHeaders};
use super::token::{TokenState, TokenStatus};

/// Upper bound on a single token request.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Process-wide token holder. Share it behind an `Arc`.
///
/// The state lock is held across the token request, so concurrent callers of
/// [`ensure_valid`](Self::ensure_valid) never launch a second authentication;
/// they wait and reuse the first one's result.
pub struct CredentialStore {
    credentials: Credentials,
    endpoint: Arc<dyn TokenEndpoint>,
    clock: Arc<dyn Clock>,
    file: TokenFile,
    auth_timeout: Duration,
    state: Mutex<TokenState>,
}

impl CredentialStore {
    /// Build a store and restore the last token from `file`, if any.
    /// Does no network I/O.
    pub fn initialize(
        credentials: Credentials,
        file: TokenFile,
        endpoint: Arc<dyn TokenEndpoint>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = Self::restore(&file);
        match state.status(clock.now_ms()) {
            TokenStatus::NoToken => {}
            TokenStatus::Stale => info!("Restored token has expired, will renew on first use"),
            TokenStatus::Valid { remaining_secs } => {
                info!(remaining_secs, "Restored valid token")
            }
        }

        Self {
            credentials,
            endpoint,
            clock,
            file,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            state: Mutex::new(state),
        }
    }

    /// Store talking to the real upstream at `base_url` with the system clock.
    pub fn over_http(
        credentials: Credentials,
        file: TokenFile,
        client: Client,
        base_url: impl Into<String>,
    ) -> Self {
        let endpoint = Arc::new(HttpTokenEndpoint::new(client, base_url));
        Self::initialize(credentials, file, endpoint, Arc::new(SystemClock))
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn token_file(&self) -> &TokenFile {
        &self.file
    }

    fn restore(file: &TokenFile) -> TokenState {
        info!(path = %file.path().display(), "Loading authentication details");
        match file.load() {
            Ok(record) => {
                let state = TokenState::from_record(record);
                if state.token().is_none() {
                    warn!(path = %file.path().display(), "Token file holds no usable token");
                }
                state
            }
            Err(PersistError::NotFound(_)) => {
                warn!(path = %file.path().display(), "Token file is not available");
                TokenState::default()
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable token file");
                TokenState::default()
            }
        }
    }

    /// Return headers signed with a token that is valid right now,
    /// authenticating or renewing first when needed.
    ///
    /// On failure the held token is left exactly as it was.
    pub async fn ensure_valid(&self) -> Result<SignedHeaders, AuthError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now_ms();

        let request = match state.token() {
            None => {
                warn!("No token, starting authentication");
                Some(TokenRequest::Grant)
            }
            Some(token) if token.is_stale(now) => match &token.refresh_token {
                Some(refresh_token) => {
                    warn!("Token expired, renewing");
                    Some(TokenRequest::Refresh(refresh_token.clone()))
                }
                None => {
                    warn!("Token expired and no refresh token held, re-authenticating");
                    Some(TokenRequest::Grant)
                }
            },
            Some(_) => None,
        };

        // Sign at the instant the token was checked against, never a later one.
        let signed_at = match request {
            Some(request) => {
                let (fresh, checked_at) = self.authenticate(&request).await?;
                *state = fresh;
                // The new token stays usable in memory even if caching it fails.
                if let Err(e) = self.save(&state).await {
                    warn!(error = %e, "Failed to persist authentication details");
                }
                checked_at
            }
            None => now,
        };

        let token = state.token().map(|t| t.access_token.as_str());
        Ok(sign(&self.credentials, token, signed_at))
    }

    /// Run one token request. Returns the new state and the clock reading
    /// its token was checked fresh against.
    async fn authenticate(&self, request: &TokenRequest) -> Result<(TokenState, i64), AuthError> {
        let headers = sign(&self.credentials, None, self.clock.now_ms());
        let record = tokio::time::timeout(
            self.auth_timeout,
            self.endpoint.request_token(request, &headers),
        )
        .await
        .map_err(|_| AuthError::Timeout(self.auth_timeout))??;

        let state = TokenState::from_record(record);
        let token = state.token().ok_or_else(|| {
            AuthError::InvalidResponse("token response without a complete token".to_string())
        })?;
        let checked_at = self.clock.now_ms();
        if token.is_stale(checked_at) {
            return Err(AuthError::InvalidResponse(
                "upstream issued an already expired token".to_string(),
            ));
        }

        debug!(
            expires_in = token.expires_in,
            token_len = token.access_token.len(),
            renewable = token.refresh_token.is_some(),
            "Obtained token"
        );
        Ok((state, checked_at))
    }

    /// Write the held authentication response to the token file.
    pub async fn persist(&self) -> Result<(), PersistError> {
        let state = self.state.lock().await;
        self.save(&state).await
    }

    async fn save(&self, state: &TokenState) -> Result<(), PersistError> {
        let record = state.record().ok_or(PersistError::Empty)?;
        info!(path = %self.file.path().display(), "Saving authentication details");
        self.file.save(record).await
    }

    /// Current standing of the held token.
    pub async fn status(&self) -> TokenStatus {
        self.state.lock().await.status(self.clock.now_ms())
    }

    pub async fn snapshot(&self) -> TokenState {
        self.state.lock().await.clone()
    }

    /// Forget `rejected` after the upstream reported it invalid, and delete
    /// the token file so a restart does not reload it. The next
    /// `ensure_valid` performs a full authentication.
    ///
    /// Does nothing when the held token is no longer `rejected`: a late
    /// rejection of an old token must not drop its replacement.
    pub async fn invalidate(&self, rejected: &str) {
        let mut state = self.state.lock().await;
        if state.token().map(|t| t.access_token.as_str()) != Some(rejected) {
            debug!("Rejected token already replaced, keeping the held one");
            return;
        }

        info!("Dropping held token");
        *state = TokenState::default();
        if let Err(e) = self.file.remove().await {
            warn!(error = %e, "Failed to remove token file");
        }
    }
}
