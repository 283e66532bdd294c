//! Credential storage with optional keyring support
//!
//! Passwords in a profile are either plaintext or a `keyring:<key>` reference
//! into the OS keyring (feature `secure-storage`). An environment variable,
//! when given and set, wins over both.

use super::error::{ConfigError, Result};
use std::env;

/// Prefix that marks a value as a keyring reference
const KEYRING_PREFIX: &str = "keyring:";

#[cfg(feature = "secure-storage")]
const SERVICE_NAME: &str = "vcfctl";

/// Storage backend for credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStorage {
    #[cfg(feature = "secure-storage")]
    Keyring,
    Plaintext,
}

/// Resolves and stores profile credentials
#[derive(Debug)]
pub struct CredentialStore {
    storage: CredentialStorage,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Pick the keyring when it is compiled in and reachable
    pub fn new() -> Self {
        #[cfg(feature = "secure-storage")]
        {
            if Self::is_keyring_available() {
                return Self {
                    storage: CredentialStorage::Keyring,
                };
            }
        }
        Self {
            storage: CredentialStorage::Plaintext,
        }
    }

    /// Always store plaintext, even with a keyring available
    pub fn plaintext() -> Self {
        Self {
            storage: CredentialStorage::Plaintext,
        }
    }

    #[cfg(feature = "secure-storage")]
    fn is_keyring_available() -> bool {
        match keyring::Entry::new(SERVICE_NAME, "__availability_check__") {
            Ok(entry) => {
                let _ = entry.get_password();
                true
            }
            Err(_) => false,
        }
    }

    pub fn storage(&self) -> CredentialStorage {
        self.storage
    }

    /// Store a credential, returning the value to write into the profile
    ///
    /// With the keyring backend this is a `keyring:<key>` reference; with
    /// plaintext it is the value itself.
    pub fn store_credential(&self, key: &str, value: &str) -> Result<String> {
        match self.storage {
            #[cfg(feature = "secure-storage")]
            CredentialStorage::Keyring => {
                let entry = keyring::Entry::new(SERVICE_NAME, key)
                    .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
                entry.set_password(value).map_err(|e| {
                    ConfigError::KeyringError(format!("Failed to store credential: {e}"))
                })?;
                Ok(format!("{KEYRING_PREFIX}{key}"))
            }
            CredentialStorage::Plaintext => {
                let _ = key;
                Ok(value.to_string())
            }
        }
    }

    /// Resolve a stored value
    ///
    /// Resolution order:
    /// 1. `env_var`, if given and set
    /// 2. keyring, if the value is a `keyring:` reference
    /// 3. the value as-is
    pub fn get_credential(&self, value: &str, env_var: Option<&str>) -> Result<String> {
        if let Some(var) = env_var
            && let Ok(env_value) = env::var(var)
        {
            return Ok(env_value);
        }

        let Some(key) = value.strip_prefix(KEYRING_PREFIX) else {
            return Ok(value.to_string());
        };

        #[cfg(feature = "secure-storage")]
        {
            let entry = keyring::Entry::new(SERVICE_NAME, key)
                .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
            entry.get_password().map_err(|e| {
                ConfigError::KeyringError(format!(
                    "Failed to retrieve credential '{key}' from keyring: {e}"
                ))
            })
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            Err(ConfigError::CredentialError(format!(
                "'{key}' is a keyring reference but secure-storage is not enabled"
            )))
        }
    }

    /// Remove a keyring entry; plaintext has nothing to delete
    pub fn delete_credential(&self, value: &str) -> Result<()> {
        let Some(key) = value.strip_prefix(KEYRING_PREFIX) else {
            return Ok(());
        };

        #[cfg(feature = "secure-storage")]
        {
            let entry = keyring::Entry::new(SERVICE_NAME, key)
                .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(ConfigError::KeyringError(format!(
                    "Failed to delete credential '{key}': {e}"
                ))),
            }
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            let _ = key;
            Ok(())
        }
    }

    pub fn is_keyring_reference(value: &str) -> bool {
        value.starts_with(KEYRING_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaintext_passthrough() {
        let store = CredentialStore::plaintext();
        assert_eq!(store.get_credential("VMware1!", None).unwrap(), "VMware1!");
        assert_eq!(store.store_credential("prod", "VMware1!").unwrap(), "VMware1!");
        assert_eq!(store.storage(), CredentialStorage::Plaintext);
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_override() {
        unsafe {
            env::set_var("VCFCTL_TEST_CREDENTIAL", "from-env");
        }

        let store = CredentialStore::plaintext();
        let value = store
            .get_credential("from-config", Some("VCFCTL_TEST_CREDENTIAL"))
            .unwrap();
        assert_eq!(value, "from-env");

        unsafe {
            env::remove_var("VCFCTL_TEST_CREDENTIAL");
        }
        let value = store
            .get_credential("from-config", Some("VCFCTL_TEST_CREDENTIAL"))
            .unwrap();
        assert_eq!(value, "from-config");
    }

    #[test]
    fn test_keyring_reference_detection() {
        assert!(CredentialStore::is_keyring_reference("keyring:prod-password"));
        assert!(!CredentialStore::is_keyring_reference("prod-password"));
        assert!(!CredentialStore::is_keyring_reference(""));
    }

    #[cfg(not(feature = "secure-storage"))]
    #[test]
    fn test_keyring_reference_without_feature() {
        let store = CredentialStore::new();
        let err = store.get_credential("keyring:prod", None).unwrap_err();
        assert!(err.to_string().contains("secure-storage"));
        assert!(store.delete_credential("keyring:prod").is_ok());
    }

    #[cfg(feature = "secure-storage")]
    #[test]
    #[ignore = "Requires keyring service to be available"]
    fn test_keyring_round_trip() {
        let store = CredentialStore::new();
        let reference = store.store_credential("vcfctl-test", "secret").unwrap();
        assert!(reference.starts_with(KEYRING_PREFIX));
        assert_eq!(store.get_credential(&reference, None).unwrap(), "secret");
        store.delete_credential(&reference).unwrap();
    }
}
