use super::data::Config;
use super::io::ConfigError;
use super::keys::ConfigKey;
use crate::core::models::DEFAULT_MODEL;
use crate::core::quota::DEFAULT_FREE_MESSAGE_LIMIT;
use crate::utils::url::DEFAULT_BASE_URL;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config
        .set_value(ConfigKey::BaseUrl, "http://localhost:5000/")
        .expect("base url accepted");
    config
        .set_value(ConfigKey::DefaultModel, "Claude")
        .expect("model accepted");
    config
        .set_value(ConfigKey::Keyring, "off")
        .expect("toggle accepted");
    config
        .save_to_path(&config_path)
        .expect("Failed to save config");

    let mut loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded.base_url.as_deref(), Some("http://localhost:5000"));
    assert_eq!(loaded.default_model.as_deref(), Some("claude"));
    assert!(!loaded.keyring_enabled());

    loaded.unset_value(ConfigKey::DefaultModel);
    loaded
        .save_to_path(&config_path)
        .expect("Failed to save config");
    let reloaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(reloaded.default_model, None);
    assert_eq!(reloaded.effective_default_model(), DEFAULT_MODEL);
}

#[test]
fn invalid_toml_reports_the_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "base_url = [").unwrap();

    let err = Config::load_from_path(&config_path).expect_err("parse should fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at"));
}

#[test]
fn defaults_apply_when_unset() {
    let config = Config::default();
    assert_eq!(config.resolve_base_url(None), DEFAULT_BASE_URL);
    assert_eq!(config.effective_free_message_limit(), DEFAULT_FREE_MESSAGE_LIMIT);
    assert!(config.keyring_enabled());
    assert!(config.migrates_guest_conversations());

    let options = config.session_options();
    assert_eq!(options.default_model, DEFAULT_MODEL);
    assert_eq!(options.free_message_limit, DEFAULT_FREE_MESSAGE_LIMIT);
}

#[test]
fn environment_override_wins_over_file() {
    let config = Config {
        base_url: Some("https://configured.example".to_string()),
        ..Default::default()
    };
    assert_eq!(config.resolve_base_url(None), "https://configured.example");
    assert_eq!(
        config.resolve_base_url(Some("http://127.0.0.1:9000/".to_string())),
        "http://127.0.0.1:9000"
    );
    assert_eq!(
        config.resolve_base_url(Some("   ".to_string())),
        "https://configured.example"
    );
}

#[test]
fn stale_default_model_falls_back() {
    let config = Config {
        default_model: Some("retired-model".to_string()),
        ..Default::default()
    };
    assert_eq!(config.effective_default_model(), DEFAULT_MODEL);
}

#[test]
fn keys_parse_in_kebab_or_snake_case() {
    assert_eq!("base-url".parse::<ConfigKey>().unwrap(), ConfigKey::BaseUrl);
    assert_eq!(
        "MIGRATE_GUEST_CONVERSATIONS".parse::<ConfigKey>().unwrap(),
        ConfigKey::MigrateGuestConversations
    );
    let err = "theme".parse::<ConfigKey>().expect_err("unknown key");
    assert_eq!(err.to_string(), "Unknown config key: theme");
}

#[test]
fn invalid_values_are_rejected_without_changes() {
    let mut config = Config::default();
    for (key, value) in [
        (ConfigKey::BaseUrl, "ftp://example.com"),
        (ConfigKey::BaseUrl, "http://exa mple.com"),
        (ConfigKey::DefaultModel, "gpt-5"),
        (ConfigKey::FreeMessageLimit, "-1"),
        (ConfigKey::Keyring, "maybe"),
    ] {
        let err = config
            .set_value(key, value)
            .expect_err("value should be rejected");
        assert!(matches!(err, ConfigError::InvalidValue { .. }), "{key}");
    }
    assert_eq!(config, Config::default());
}

#[test]
fn describe_marks_defaults() {
    let config = Config {
        free_message_limit: Some(3),
        ..Default::default()
    };
    let lines = config.describe();
    assert!(lines.contains(&"free-message-limit: 3".to_string()));
    assert!(lines.contains(&"keyring: on (default)".to_string()));
    assert!(lines.contains(&format!("default-model: {DEFAULT_MODEL} (default)")));
}
