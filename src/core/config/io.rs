use crate::core::config::data::{path_display, Config};
use directories::ProjectDirs;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Errors that can occur when loading, saving or editing configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to write the configuration file.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    Serialize(toml::ser::Error),

    /// The platform offers no configuration directory.
    NoConfigDir,

    UnknownKey(String),

    InvalidValue {
        key: &'static str,
        message: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path_display(path), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path_display(path), source)
            }
            ConfigError::Write { path, source } => {
                write!(f, "Failed to write config at {}: {}", path_display(path), source)
            }
            ConfigError::Serialize(source) => write!(f, "Failed to encode config: {source}"),
            ConfigError::NoConfigDir => write!(f, "Failed to determine config directory"),
            ConfigError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            ConfigError::InvalidValue { key, message } => {
                write!(f, "Invalid value for {key}: {message}")
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } | ConfigError::Write { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Serialize(source) => Some(source),
            _ => None,
        }
    }
}

impl Config {
    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: config_path.to_path_buf(),
            source,
        };
        let parent = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(write_err)?;

        temp_file.write_all(contents.as_bytes()).map_err(write_err)?;
        temp_file.as_file_mut().sync_all().map_err(write_err)?;
        temp_file
            .persist(config_path)
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let proj_dirs =
            ProjectDirs::from("org", "worldchat", "worldchat").ok_or(ConfigError::NoConfigDir)?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    pub fn load() -> Result<Config, ConfigError> {
        Self::load_from_path(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::config_path()?)
    }
}
