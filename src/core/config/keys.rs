use std::fmt;
use std::str::FromStr;

use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use crate::core::models::find_model;
use crate::utils::url::{is_http_url, normalize_base_url};

/// Settings addressable from `worldchat set` / `worldchat unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BaseUrl,
    DefaultModel,
    FreeMessageLimit,
    Keyring,
    MigrateGuestConversations,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::BaseUrl,
        ConfigKey::DefaultModel,
        ConfigKey::FreeMessageLimit,
        ConfigKey::Keyring,
        ConfigKey::MigrateGuestConversations,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::BaseUrl => "base-url",
            ConfigKey::DefaultModel => "default-model",
            ConfigKey::FreeMessageLimit => "free-message-limit",
            ConfigKey::Keyring => "keyring",
            ConfigKey::MigrateGuestConversations => "migrate-guest-conversations",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownKey(value.trim().to_string()))
    }
}

fn parse_toggle(key: ConfigKey, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.as_str(),
            message: "expected on or off".to_string(),
        }),
    }
}

impl Config {
    pub fn set_value(&mut self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.as_str(),
            message,
        };
        match key {
            ConfigKey::BaseUrl => {
                if !is_http_url(value) {
                    return Err(invalid(format!("'{}' is not an http(s) URL", value.trim())));
                }
                self.base_url = Some(normalize_base_url(value));
            }
            ConfigKey::DefaultModel => {
                let model = find_model(value)
                    .ok_or_else(|| invalid(format!("unknown model '{}'", value.trim())))?;
                self.default_model = Some(model.id.to_string());
            }
            ConfigKey::FreeMessageLimit => {
                let limit = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|err| invalid(err.to_string()))?;
                self.free_message_limit = Some(limit);
            }
            ConfigKey::Keyring => self.keyring = Some(parse_toggle(key, value)?),
            ConfigKey::MigrateGuestConversations => {
                self.migrate_guest_conversations = Some(parse_toggle(key, value)?)
            }
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::BaseUrl => self.base_url = None,
            ConfigKey::DefaultModel => self.default_model = None,
            ConfigKey::FreeMessageLimit => self.free_message_limit = None,
            ConfigKey::Keyring => self.keyring = None,
            ConfigKey::MigrateGuestConversations => self.migrate_guest_conversations = None,
        }
    }
}
