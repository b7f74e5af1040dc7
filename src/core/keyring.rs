use std::error::Error;
use std::fmt;

use keyring::Entry;
use tracing::{debug, warn};

use crate::core::storage::{Storage, StorageError, TOKEN_KEY};

const KEYRING_SERVICE: &str = "worldchat";

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors indicate that the credential backend was temporarily
/// unavailable (a locked keychain, no secret service on a headless box).
/// Permanent errors surface the underlying cause directly.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

/// Keeps the auth token in the OS keyring and everything else in `inner`.
///
/// The account name is the service base URL, so tokens for different
/// deployments don't overwrite each other. When the keyring is temporarily
/// unavailable the token falls back to `inner`.
pub struct KeyringStorage<S> {
    inner: S,
    account: String,
}

impl<S: Storage> KeyringStorage<S> {
    pub fn new(inner: S, account: impl Into<String>) -> Self {
        Self {
            inner,
            account: account.into(),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn entry(&self) -> Result<Entry, KeyringAccessError> {
        Entry::new(KEYRING_SERVICE, &self.account).map_err(KeyringAccessError::from)
    }

    fn read_token(&self) -> Result<Option<String>, KeyringAccessError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_token(&self, token: &str) -> Result<(), KeyringAccessError> {
        self.entry()?.set_password(token).map_err(KeyringAccessError::from)
    }

    fn delete_token(&self) -> Result<(), KeyringAccessError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl<S: Storage> Storage for KeyringStorage<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if key != TOKEN_KEY {
            return self.inner.get(key);
        }
        match self.read_token() {
            Ok(Some(token)) => Ok(Some(token)),
            Ok(None) => self.inner.get(key),
            Err(err) if err.is_recoverable() => {
                debug!(error = %err, "keyring unavailable, reading token from state file");
                self.inner.get(key)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if key != TOKEN_KEY {
            return self.inner.set(key, value);
        }
        match self.write_token(value) {
            // Drop any copy an earlier fallback left in the state file.
            Ok(()) => self.inner.remove(key),
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "keyring unavailable, storing token in state file");
                self.inner.set(key, value)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if key == TOKEN_KEY {
            if let Err(err) = self.delete_token() {
                if !err.is_recoverable() {
                    return Err(err.into());
                }
                debug!(error = %err, "keyring unavailable while removing token");
            }
        }
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_failures_are_recoverable() {
        let err = KeyringAccessError::from(keyring::Error::PlatformFailure(
            "locked".to_string().into(),
        ));
        assert!(err.is_recoverable());

        let err = KeyringAccessError::from(keyring::Error::NoEntry);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn non_token_keys_bypass_the_keyring() {
        use crate::core::storage::{MemoryStorage, GUEST_MESSAGE_COUNT_KEY};

        let mut storage = KeyringStorage::new(MemoryStorage::new(), "http://127.0.0.1");
        storage.set(GUEST_MESSAGE_COUNT_KEY, "4").unwrap();
        assert_eq!(
            storage.get(GUEST_MESSAGE_COUNT_KEY).unwrap().as_deref(),
            Some("4")
        );
        let inner = storage.into_inner();
        assert_eq!(
            inner.get(GUEST_MESSAGE_COUNT_KEY).unwrap().as_deref(),
            Some("4")
        );
    }
}
