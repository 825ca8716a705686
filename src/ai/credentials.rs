// Secure credential storage for the Anthropic API key
//
// The environment always wins; the OS keychain is the fallback so a key can be
// stored once with `vibelist set-api-key` instead of living in a .env file.
// - macOS: Keychain
// - Windows: Credential Manager
// - Linux: Secret Service (GNOME/KDE)

use keyring::Entry;
use thiserror::Error;

const SERVICE_NAME: &str = "com.vibelist.app";
const API_KEY_NAME: &str = "anthropic_api_key";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Invalid API key format. Anthropic API keys should start with 'sk-ant-'")]
    InvalidFormat,

    #[error("API key appears too short. Please check and try again.")]
    TooShort,

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),
}

pub struct CredentialManager;

impl CredentialManager {
    /// Check that a key looks like an Anthropic key before it is stored.
    pub fn validate_api_key(key: &str) -> Result<(), CredentialError> {
        if !key.starts_with("sk-ant-") {
            return Err(CredentialError::InvalidFormat);
        }
        if key.len() < 20 {
            return Err(CredentialError::TooShort);
        }
        Ok(())
    }

    /// Store the API key in the OS keychain
    pub fn store_api_key(key: &str) -> Result<(), CredentialError> {
        Self::validate_api_key(key)?;

        let entry = Entry::new(SERVICE_NAME, API_KEY_NAME)?;
        entry.set_password(key)?;

        tracing::info!("API key stored in keychain");
        Ok(())
    }

    /// Retrieve the API key from the OS keychain
    pub fn retrieve_api_key() -> Result<Option<String>, CredentialError> {
        let entry = Entry::new(SERVICE_NAME, API_KEY_NAME)?;

        match entry.get_password() {
            Ok(key) => {
                tracing::debug!(len = key.len(), "API key retrieved from keychain");
                Ok(Some(key))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the API key from the OS keychain
    pub fn delete_api_key() -> Result<(), CredentialError> {
        let entry = Entry::new(SERVICE_NAME, API_KEY_NAME)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_validation() {
        assert!(CredentialManager::validate_api_key("sk-ant-api03-test123456").is_ok());
        assert!(matches!(
            CredentialManager::validate_api_key("invalid-key"),
            Err(CredentialError::InvalidFormat)
        ));
        assert!(matches!(
            CredentialManager::validate_api_key("sk-ant-x"),
            Err(CredentialError::TooShort)
        ));
    }
}
