use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{RemoteConversation, RemoteMessage};
use crate::core::message::Message;

pub const NEW_CHAT_TITLE: &str = "New Chat";
pub const NEW_CHAT_PREVIEW: &str = "New conversation started";
pub const WELCOME_TITLE: &str = "Welcome to AI Chat";
pub const WELCOME_MESSAGE: &str = "Hello! How can I help you today?";

const TITLE_MAX_CHARS: usize = 30;

/// An ordered, append-only transcript plus the metadata the sidebar shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub last_message: String,
    messages: Vec<Message>,
    /// Identifier the service assigned, once the conversation exists there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: NEW_CHAT_TITLE.to_string(),
            last_message: NEW_CHAT_PREVIEW.to_string(),
            messages: Vec::new(),
            server_id: None,
        }
    }

    /// The greeting conversation shown to a fresh guest.
    pub fn welcome(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let id = id.into();
        let mut conversation = Self::new(id.clone());
        conversation.title = WELCOME_TITLE.to_string();
        conversation.push(Message::ai(format!("{id}-1"), WELCOME_MESSAGE, now, None));
        conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|message| message.timestamp)
    }

    /// Whether the user has said anything here (greetings alone don't count).
    pub fn has_user_messages(&self) -> bool {
        self.messages.iter().any(Message::is_user)
    }

    /// Append a message, keeping timestamps non-decreasing and updating the
    /// preview. The first user message names an untitled conversation.
    pub fn push(&mut self, mut message: Message) {
        if let Some(last) = self.last_timestamp() {
            if message.timestamp < last {
                message.timestamp = last;
            }
        }

        if message.is_user() && !self.has_user_messages() && self.title == NEW_CHAT_TITLE {
            self.title = derive_title(&message.content);
        }

        self.last_message = message.content.clone();
        self.messages.push(message);
    }

    /// Rebuild a conversation from the service's copy.
    ///
    /// Messages are ordered by timestamp (stable for ties and missing stamps);
    /// missing ids are derived from the conversation id and position.
    pub fn from_remote(remote: RemoteConversation) -> Self {
        let RemoteConversation {
            id,
            title,
            last_message,
            mut messages,
        } = remote;

        messages.sort_by_key(|message| message.timestamp.unwrap_or(DateTime::<Utc>::MIN_UTC));

        let mut conversation = Self::new(id.clone());
        conversation.server_id = Some(id.clone());
        let mut previous = DateTime::<Utc>::MIN_UTC;
        for (index, remote_message) in messages.into_iter().enumerate() {
            let RemoteMessage {
                id: message_id,
                content,
                sender,
                timestamp,
                model,
            } = remote_message;
            let timestamp = timestamp.unwrap_or(previous);
            previous = timestamp;
            conversation.push(Message {
                id: message_id.unwrap_or_else(|| format!("{id}-{}", index + 1)),
                content,
                sender,
                timestamp,
                model,
                error: false,
            });
        }

        if let Some(title) = title.filter(|title| !title.trim().is_empty()) {
            conversation.title = title;
        }
        if let Some(preview) = last_message.filter(|preview| !preview.trim().is_empty()) {
            conversation.last_message = preview;
        }
        conversation
    }

    /// The shape uploaded when guest conversations move to an account.
    /// Failure placeholders stay local.
    pub fn to_remote(&self) -> RemoteConversation {
        RemoteConversation {
            id: self.server_id.clone().unwrap_or_else(|| self.id.clone()),
            title: Some(self.title.clone()),
            last_message: Some(self.last_message.clone()),
            messages: self
                .messages
                .iter()
                .filter(|message| !message.error)
                .map(Message::to_remote)
                .collect(),
        }
    }
}

/// Title for a conversation named after its opening message.
pub fn derive_title(text: &str) -> String {
    let text = text.trim();
    let mut chars = text.chars();
    let prefix: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", prefix.trim_end())
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Sender;
    use chrono::Duration;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn first_user_message_names_the_conversation() {
        let mut conversation = Conversation::new("c1");
        assert_eq!(conversation.title, NEW_CHAT_TITLE);
        assert_eq!(conversation.last_message, NEW_CHAT_PREVIEW);

        conversation.push(Message::user(
            "m1",
            "How do lighthouses keep their lamps turning at night?",
            at(0),
        ));
        assert_eq!(conversation.title, "How do lighthouses keep their...");

        conversation.push(Message::user("m2", "Second question", at(1)));
        assert_eq!(conversation.title, "How do lighthouses keep their...");
        assert_eq!(conversation.last_message, "Second question");
    }

    #[test]
    fn short_titles_are_kept_whole() {
        assert_eq!(derive_title("  Hello  "), "Hello");
        assert_eq!(derive_title(&"é".repeat(30)), "é".repeat(30));
        assert_eq!(derive_title(&"é".repeat(31)), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn welcome_greeting_does_not_count_as_user_message() {
        let mut conversation = Conversation::welcome("w", at(0));
        assert_eq!(conversation.title, WELCOME_TITLE);
        assert_eq!(conversation.len(), 1);
        assert!(!conversation.has_user_messages());

        conversation.push(Message::user("m", "hi", at(1)));
        assert_eq!(conversation.title, WELCOME_TITLE);
    }

    #[test]
    fn push_clamps_timestamps_to_keep_order() {
        let mut conversation = Conversation::new("c1");
        conversation.push(Message::user("m1", "first", at(10)));
        conversation.push(Message::ai("m2", "reply", at(5), None));

        let stamps: Vec<_> = conversation.messages().iter().map(|m| m.timestamp).collect();
        assert_eq!(stamps, vec![at(10), at(10)]);
    }

    #[test]
    fn remote_conversations_are_sorted_and_filled_in() {
        let remote = RemoteConversation {
            id: "srv".to_string(),
            title: None,
            last_message: None,
            messages: vec![
                RemoteMessage {
                    id: None,
                    content: "answer".to_string(),
                    sender: Sender::Ai,
                    timestamp: Some(at(20)),
                    model: Some("claude".to_string()),
                },
                RemoteMessage {
                    id: Some("q".to_string()),
                    content: "question".to_string(),
                    sender: Sender::User,
                    timestamp: Some(at(10)),
                    model: None,
                },
            ],
        };

        let conversation = Conversation::from_remote(remote);
        assert_eq!(conversation.server_id.as_deref(), Some("srv"));
        assert_eq!(conversation.title, "question");
        assert_eq!(conversation.last_message, "answer");
        assert_eq!(conversation.messages()[0].id, "q");
        assert_eq!(conversation.messages()[1].id, "srv-2");
        assert!(conversation.messages()[0].timestamp <= conversation.messages()[1].timestamp);
    }

    #[test]
    fn failure_placeholders_are_not_uploaded() {
        let mut conversation = Conversation::new("local");
        conversation.push(Message::user("m1", "hi", at(0)));
        conversation.push(Message::send_failure(
            "m2",
            "could not reach the model",
            at(0) + Duration::seconds(1),
            None,
        ));

        let remote = conversation.to_remote();
        assert_eq!(remote.id, "local");
        assert_eq!(remote.messages.len(), 1);
        assert_eq!(remote.messages[0].sender, Sender::User);
    }
}
