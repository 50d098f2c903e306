//! Authentication against the Tuya OpenAPI.
//!
//! This module provides:
//! - `sign`: HMAC-SHA256 request signing
//! - `CredentialStore`: token lifecycle with lazy (re)authentication
//! - `TokenFile`: the persisted token response
//! - `SecretStore`: client secret storage via the OS keychain
//!
//! Tokens are persisted to disk so a restarted process can reuse them until
//! they expire.

pub mod endpoint;
pub mod error;
pub mod persist;
pub mod secret;
pub mod signer;
pub mod store;
pub mod token;

pub use endpoint::{HttpTokenEndpoint, TokenEndpoint, TokenRequest};
pub use error::{AuthError, PersistError};
pub use persist::TokenFile;
pub use secret::SecretStore;
pub use signer::{sign, Credentials, SignedHeaders, SIGN_METHOD};
pub use store::{CredentialStore, DEFAULT_AUTH_TIMEOUT};
pub use token::{AuthRecord, IssuedToken, TokenResult, TokenState, TokenStatus};
