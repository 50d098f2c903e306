//! API client for the Tuya OpenAPI.
//!
//! Requests are not retried. A response telling us the access token is no
//! longer accepted drops the held token so the next request authenticates
//! from scratch.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::CredentialStore;

use super::models::{ApiResponse, Command, CommandsBody, DeviceFunctions, IrKey, StatusEntry};
use super::ApiError;

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared HTTP client for token and device requests.
pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
}

/// Clone is cheap - reqwest::Client and the store are both reference counted.
#[derive(Clone)]
pub struct DeviceClient {
    client: Client,
    base_url: String,
    store: Arc<CredentialStore>,
}

impl DeviceClient {
    pub fn new(client: Client, base_url: impl Into<String>, store: Arc<CredentialStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            store,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Reject ids that would change the shape of the URL.
    fn path_segment<'a>(name: &str, value: &'a str) -> Result<&'a str, ApiError> {
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(value)
        } else {
            Err(ApiError::InvalidInput(format!("invalid {}: {:?}", name, value)))
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let headers = self.store.ensure_valid().await?;
        let header_map = headers
            .to_header_map()
            .map_err(|e| ApiError::InvalidInput(format!("unencodable header: {}", e)))?;

        let response = request.headers(header_map).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let result = if status.is_success() {
            Self::decode(&body)
        } else {
            Err(ApiError::from_status(status, &body))
        };

        if let (Err(e), Some(token)) = (&result, headers.access_token.as_deref()) {
            if e.is_token_rejection() {
                warn!(error = %e, "Upstream rejected the access token");
                self.store.invalidate(token).await;
            }
        }
        result
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
        let envelope: ApiResponse<T> = serde_json::from_str(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if !envelope.success {
            return Err(ApiError::Rejected {
                code: envelope.code,
                msg: envelope.msg.unwrap_or_default(),
            });
        }
        envelope
            .result
            .ok_or_else(|| ApiError::InvalidResponse("response without result".to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "GET");
        self.send(self.client.get(&url)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "POST");
        self.send(self.client.post(&url).json(body)).await
    }

    // ===== Devices =====

    /// Functions (command codes and value ranges) a device supports
    pub async fn device_functions(&self, device_id: &str) -> Result<DeviceFunctions, ApiError> {
        let id = Self::path_segment("device id", device_id)?;
        self.get(&format!("devices/{}/functions", id)).await
    }

    /// Current value of every data point of a device
    pub async fn device_status(&self, device_id: &str) -> Result<Vec<StatusEntry>, ApiError> {
        let id = Self::path_segment("device id", device_id)?;
        self.get(&format!("devices/{}/status", id)).await
    }

    /// Send commands to a device. Returns the upstream's acknowledgement.
    pub async fn send_commands(
        &self,
        device_id: &str,
        commands: &[Command],
    ) -> Result<bool, ApiError> {
        let id = Self::path_segment("device id", device_id)?;
        if commands.is_empty() {
            return Err(ApiError::InvalidInput("no commands given".to_string()));
        }
        self.post(&format!("devices/{}/commands", id), &CommandsBody { commands })
            .await
    }

    // ===== Infrared =====

    /// Press a key on a remote learned by an infrared hub
    pub async fn send_ir_key(
        &self,
        infrared_id: &str,
        remote_id: &str,
        key: &IrKey,
    ) -> Result<bool, ApiError> {
        let infrared = Self::path_segment("infrared id", infrared_id)?;
        let remote = Self::path_segment("remote id", remote_id)?;
        self.post(
            &format!("infrareds/{}/remotes/{}/command", infrared, remote),
            key,
        )
        .await
    }

    // ===== Scenes =====

    /// Trigger a tap-to-run scene of a home
    pub async fn trigger_scene(&self, home_id: &str, scene_id: &str) -> Result<bool, ApiError> {
        let home = Self::path_segment("home id", home_id)?;
        let scene = Self::path_segment("scene id", scene_id)?;
        self.post(
            &format!("homes/{}/scenes/{}/trigger", home, scene),
            &serde_json::json!({}),
        )
        .await
    }
}
