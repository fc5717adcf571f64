//! Token storage

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::error::CredentialError;

/// Keyring service name
pub const SERVICE_NAME: &str = "autopilot-cli";

/// Account the personal access token is stored under
pub const DEFAULT_ACCOUNT: &str = "default";

/// Secret store keyed by account name
///
/// A missing entry is `Ok(None)`, never an error.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;
    fn set(&self, key: &str, secret: &str) -> Result<(), CredentialError>;
    /// Returns whether an entry existed
    fn delete(&self, key: &str) -> Result<bool, CredentialError>;
}

/// Platform keyring (macOS Keychain, Windows Credential Manager, Linux keyutils)
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, key).map_err(|source| keyring_error(key, source))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(source) => Err(keyring_error(key, source)),
        }
    }

    fn set(&self, key: &str, secret: &str) -> Result<(), CredentialError> {
        self.entry(key)?
            .set_password(secret)
            .map_err(|source| keyring_error(key, source))?;
        debug!(service = %self.service, account = key, "credential stored");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CredentialError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!(service = %self.service, account = key, "credential deleted");
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(source) => Err(keyring_error(key, source)),
        }
    }
}

fn keyring_error(account: &str, source: keyring::Error) -> CredentialError {
    CredentialError::Keyring {
        account: account.to_string(),
        source,
    }
}

/// In-process store, used in tests and when no keyring is wanted
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn set(&self, key: &str, secret: &str) -> Result<(), CredentialError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CredentialError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some())
    }
}
