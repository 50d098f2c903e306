//! Core library for tuya-gateway.
//!
//! Signs requests for the Tuya IoT cloud OpenAPI, keeps the access token
//! fresh across requests and restarts, and wraps the device, infrared and
//! scene endpoints.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;

use std::sync::Arc;

pub use api::{ApiError, DeviceClient};
pub use auth::{AuthError, CredentialStore, Credentials, SignedHeaders};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError};

/// Wire up a store and device client from configuration.
///
/// Reads the persisted token file but performs no network I/O.
pub fn connect(config: &Config, credentials: Credentials) -> Result<DeviceClient, reqwest::Error> {
    let client = api::client::http_client()?;
    let base_url = config.api_base_url(&credentials);
    let store = CredentialStore::over_http(
        credentials,
        config.token_file(),
        client.clone(),
        base_url.clone(),
    )
    .with_auth_timeout(config.auth_timeout());
    Ok(DeviceClient::new(client, base_url, Arc::new(store)))
}
