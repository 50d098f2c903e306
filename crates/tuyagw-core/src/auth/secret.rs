use keyring::Entry;

const SERVICE_NAME: &str = "tuya-gateway";

/// Client secrets kept in the OS keychain, keyed by client id.
pub struct SecretStore;

impl SecretStore {
    /// Store the client secret for `client_id` in the OS keychain
    pub fn store(client_id: &str, secret: &str) -> keyring::Result<()> {
        Entry::new(SERVICE_NAME, client_id)?.set_password(secret)
    }

    /// Retrieve the client secret for `client_id` from the OS keychain
    pub fn get(client_id: &str) -> keyring::Result<String> {
        Entry::new(SERVICE_NAME, client_id)?.get_password()
    }

    /// Delete the stored secret for `client_id`
    pub fn delete(client_id: &str) -> keyring::Result<()> {
        Entry::new(SERVICE_NAME, client_id)?.delete_credential()
    }
}
