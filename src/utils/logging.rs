use crate::core::message::Message;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Plain-text transcript of the messages exchanged in a chat session.
pub struct LoggingState {
    file_path: Option<String>,
    is_active: bool,
}

impl LoggingState {
    /// A path given on the command line starts logging immediately.
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let logging = LoggingState {
            is_active: log_file.is_some(),
            file_path: log_file,
        };
        if let Some(path) = &logging.file_path {
            logging.test_file_access(path)?;
        }
        Ok(logging)
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        self.test_file_access(&path)?;

        self.file_path = Some(path.clone());
        self.is_active = true;

        Ok(format!("Logging enabled to: {path}"))
    }

    pub fn toggle_logging(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        match self.file_path.clone() {
            Some(path) => {
                if self.is_active {
                    self.log_note("Logging paused")?;
                    self.is_active = false;
                    Ok(format!("Logging paused (file: {path})"))
                } else {
                    self.is_active = true;
                    Ok(format!("Logging resumed to: {path}"))
                }
            }
            None => {
                Err("No log file specified. Use /log <filename> to enable logging first.".into())
            }
        }
    }

    /// Append one transcript entry. User lines carry the speaker's name;
    /// failure placeholders are marked with `##`.
    pub fn log_message(
        &self,
        message: &Message,
        user_display_name: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if message.is_user() {
            self.write_entry(&format!("{user_display_name}: {}", message.content))
        } else if message.error {
            self.write_entry(&format!("## {}", message.content))
        } else {
            self.write_entry(&message.content)
        }
    }

    pub fn log_note(&self, note: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.write_entry(&format!("## {note}"))
    }

    fn write_entry(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = self.file_path.as_ref().filter(|_| self.is_active) else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between entries, as on screen.
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn get_status_string(&self) -> String {
        let file_name = |path: &str| {
            Path::new(path)
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", file_name(path)),
            (Some(path), false) => format!("paused ({})", file_name(path)),
        }
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn transcript_records_speakers_and_pauses() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("chat.log");
        let path_str = path.to_string_lossy().into_owned();

        let mut logging = LoggingState::new(None).unwrap();
        assert_eq!(logging.get_status_string(), "disabled");
        logging
            .log_note("ignored while disabled")
            .expect("no-op when disabled");

        logging.set_log_file(path_str).expect("log file is writable");
        let now = Utc::now();
        logging
            .log_message(&Message::user("1", "Hello", now), "Ada")
            .unwrap();
        logging
            .log_message(&Message::ai("2", "Hi!\nHow can I help?", now, None), "Ada")
            .unwrap();
        logging
            .log_message(&Message::send_failure("3", "Sorry", now, None), "Ada")
            .unwrap();

        let message = logging.toggle_logging().unwrap();
        assert!(message.starts_with("Logging paused"));
        assert!(logging.get_status_string().starts_with("paused"));
        logging
            .log_message(&Message::user("4", "unlogged", now), "Ada")
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Ada: Hello\n\nHi!\nHow can I help?\n\n## Sorry\n\n## Logging paused\n\n"
        );
    }

    #[test]
    fn toggle_without_file_is_an_error() {
        let mut logging = LoggingState::new(None).unwrap();
        assert!(logging.toggle_logging().is_err());
        assert!(!logging.is_active());
    }
}
