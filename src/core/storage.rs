//! Small key/value persistence for client-side state.
//!
//! Three keys matter: the auth token, the guest message counter and the guest
//! conversation snapshot. Values are strings; structured values go through
//! [`StorageExt`] as JSON.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::core::keyring::KeyringAccessError;

pub const TOKEN_KEY: &str = "token";
pub const GUEST_MESSAGE_COUNT_KEY: &str = "freeMessageCount";
pub const GUEST_CONVERSATIONS_KEY: &str = "guestConversations";

#[derive(Debug)]
pub enum StorageError {
    Io { path: PathBuf, source: std::io::Error },
    Format(serde_json::Error),
    Keyring(KeyringAccessError),
    Unavailable(&'static str),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { path, source } => {
                write!(f, "failed to access {}: {}", path.display(), source)
            }
            StorageError::Format(err) => write!(f, "stored state is not valid JSON: {err}"),
            StorageError::Keyring(err) => write!(f, "keyring error: {err}"),
            StorageError::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            StorageError::Format(err) => Some(err),
            StorageError::Keyring(err) => Some(err),
            StorageError::Unavailable(_) => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Format(err)
    }
}

impl From<KeyringAccessError> for StorageError {
    fn from(err: KeyringAccessError) -> Self {
        StorageError::Keyring(err)
    }
}

pub trait Storage: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// JSON helpers over any [`Storage`].
pub trait StorageExt: Storage {
    /// Read and decode a JSON value. Undecodable values are reported and
    /// treated as absent so a corrupt entry never blocks startup.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key, error = %err, "ignoring undecodable stored value");
                Ok(None)
            }
        }
    }

    fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value)?;
        self.set(key, &encoded)
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// In-process storage, used by tests and `--ephemeral` sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStorage {
    /// Open the state file at `path`, starting empty when it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }

    /// `state.json` in the platform data directory.
    pub fn default_path() -> Result<PathBuf, StorageError> {
        let dirs = ProjectDirs::from("org", "worldchat", "worldchat").ok_or(
            StorageError::Unavailable("could not determine a data directory"),
        )?;
        Ok(dirs.data_dir().join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(&self.values)?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(io_err)?;
        temp_file.write_all(contents.as_bytes()).map_err(io_err)?;
        temp_file.as_file_mut().sync_all().map_err(io_err)?;
        temp_file
            .persist(&self.path)
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_storage_round_trips_across_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("state.json");

        let mut storage = FileStorage::open(&path).expect("open should succeed");
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        storage.set(TOKEN_KEY, "abc").unwrap();
        storage.set(GUEST_MESSAGE_COUNT_KEY, "3").unwrap();
        storage.remove(TOKEN_KEY).unwrap();

        let reopened = FileStorage::open(&path).expect("reopen should succeed");
        assert_eq!(reopened.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(
            reopened.get(GUEST_MESSAGE_COUNT_KEY).unwrap().as_deref(),
            Some("3")
        );
    }

    #[test]
    fn corrupt_state_file_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();

        let err = FileStorage::open(&path).expect_err("corrupt file should not open");
        assert!(matches!(err, StorageError::Format(_)));
    }

    #[test]
    fn undecodable_json_values_read_as_absent() {
        let mut storage = MemoryStorage::new();
        storage.set(GUEST_CONVERSATIONS_KEY, "{broken").unwrap();
        let value: Option<Vec<String>> = storage.get_json(GUEST_CONVERSATIONS_KEY).unwrap();
        assert_eq!(value, None);

        storage
            .set_json(GUEST_CONVERSATIONS_KEY, &vec!["a".to_string()])
            .unwrap();
        let value: Option<Vec<String>> = storage.get_json(GUEST_CONVERSATIONS_KEY).unwrap();
        assert_eq!(value, Some(vec!["a".to_string()]));
    }

    #[test]
    fn boxed_storage_forwards_calls() {
        let mut boxed: Box<dyn Storage> = Box::new(MemoryStorage::new());
        boxed.set("k", "v").unwrap();
        assert_eq!(boxed.get("k").unwrap().as_deref(), Some("v"));
        boxed.remove("k").unwrap();
        assert_eq!(boxed.get("k").unwrap(), None);
    }
}
