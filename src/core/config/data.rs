use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::models::{find_model, DEFAULT_MODEL};
use crate::core::quota::DEFAULT_FREE_MESSAGE_LIMIT;
use crate::core::session::SessionOptions;
use crate::utils::url::{normalize_base_url, DEFAULT_BASE_URL};

/// Environment variable that overrides the configured service address.
pub const BASE_URL_ENV: &str = "WORLDCHAT_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address of the chat service (e.g., "https://worldgpt.up.railway.app")
    pub base_url: Option<String>,
    /// Model selected when a session starts
    pub default_model: Option<String>,
    /// Messages a guest may send before being asked to sign in
    pub free_message_limit: Option<u32>,
    /// Keep the auth token in the OS keyring rather than the state file
    pub keyring: Option<bool>,
    /// Upload guest conversations to the account on first sign-in
    pub migrate_guest_conversations: Option<bool>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    /// Service address after applying `WORLDCHAT_BASE_URL`.
    pub fn effective_base_url(&self) -> String {
        self.resolve_base_url(std::env::var(BASE_URL_ENV).ok())
    }

    pub(crate) fn resolve_base_url(&self, env_override: Option<String>) -> String {
        let chosen = env_override
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        normalize_base_url(&chosen)
    }

    /// Configured default model, falling back when unset or no longer listed.
    pub fn effective_default_model(&self) -> &'static str {
        self.default_model
            .as_deref()
            .and_then(find_model)
            .map(|model| model.id)
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn effective_free_message_limit(&self) -> u32 {
        self.free_message_limit
            .unwrap_or(DEFAULT_FREE_MESSAGE_LIMIT)
    }

    pub fn keyring_enabled(&self) -> bool {
        self.keyring.unwrap_or(true)
    }

    pub fn migrates_guest_conversations(&self) -> bool {
        self.migrate_guest_conversations.unwrap_or(true)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            free_message_limit: self.effective_free_message_limit(),
            default_model: self.effective_default_model().to_string(),
            migrate_guest_conversations: self.migrates_guest_conversations(),
        }
    }
}
