use crate::core::config::data::Config;

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        for line in self.describe() {
            println!("  {line}");
        }
    }

    /// One `key: value` line per setting, with effective values and a marker
    /// for defaults.
    pub fn describe(&self) -> Vec<String> {
        let default_marker = |is_set: bool| if is_set { "" } else { " (default)" };
        vec![
            format!(
                "base-url: {}{}",
                self.effective_base_url(),
                default_marker(self.base_url.is_some())
            ),
            format!(
                "default-model: {}{}",
                self.effective_default_model(),
                default_marker(self.default_model.is_some())
            ),
            format!(
                "free-message-limit: {}{}",
                self.effective_free_message_limit(),
                default_marker(self.free_message_limit.is_some())
            ),
            format!(
                "keyring: {}{}",
                on_off(self.keyring_enabled()),
                default_marker(self.keyring.is_some())
            ),
            format!(
                "migrate-guest-conversations: {}{}",
                on_off(self.migrates_guest_conversations()),
                default_marker(self.migrate_guest_conversations.is_some())
            ),
        ]
    }
}
