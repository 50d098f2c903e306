//! Client for the Tuya OpenAPI device, infrared and scene endpoints.
//!
//! Every request is signed with headers from the shared
//! [`CredentialStore`](crate::auth::CredentialStore).

pub mod client;
pub mod error;
pub mod models;

pub use client::DeviceClient;
pub use error::ApiError;
pub use models::{ApiResponse, Command, DeviceFunction, DeviceFunctions, IrKey, StatusEntry};
