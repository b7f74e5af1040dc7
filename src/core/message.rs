use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::RemoteMessage;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "assistant")]
    Ai,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Set on the placeholder the client writes when a send fails. These are
    /// shown locally but never uploaded.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl Message {
    pub fn user(id: impl Into<String>, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            sender: Sender::User,
            timestamp,
            model: None,
            error: false,
        }
    }

    pub fn ai(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        model: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            sender: Sender::Ai,
            timestamp,
            model,
            error: false,
        }
    }

    pub fn send_failure(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        model: Option<String>,
    ) -> Self {
        Self {
            error: true,
            ..Self::ai(id, content, timestamp, model)
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_ai(&self) -> bool {
        self.sender == Sender::Ai
    }

    pub fn to_remote(&self) -> RemoteMessage {
        RemoteMessage {
            id: Some(self.id.clone()),
            content: self.content.clone(),
            sender: self.sender,
            timestamp: Some(self.timestamp),
            model: self.model.clone(),
        }
    }
}
