//! Conversation and account state for one client.
//!
//! [`Session`] owns the conversation list, the active selection, the selected
//! model, the signed-in user and the guest quota. Views forward user intent to
//! it and render what it exposes; it talks to the service only through a
//! [`ChatBackend`] and persists client state only through a [`Storage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{ApiError, ChatBackend, ChatReply, ChatRequest, Profile};
use crate::core::conversation::Conversation;
use crate::core::message::Message;
use crate::core::models::{find_model, is_premium_model, ModelInfo, DEFAULT_MODEL};
use crate::core::quota::{GuestQuota, DEFAULT_FREE_MESSAGE_LIMIT};
use crate::core::storage::{Storage, StorageExt, GUEST_CONVERSATIONS_KEY, TOKEN_KEY};

mod account;

pub use account::AuthError;


/// Text of the assistant-side placeholder written when a send fails.
pub const SEND_FAILURE_PREFIX: &str = "Sorry, I couldn't reach the model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub free_message_limit: u32,
    pub default_model: String,
    /// Upload guest conversations to the account on sign-in.
    pub migrate_guest_conversations: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            free_message_limit: DEFAULT_FREE_MESSAGE_LIMIT,
            default_model: DEFAULT_MODEL.to_string(),
            migrate_guest_conversations: true,
        }
    }
}

/// Why a send was turned into a sign-in prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPrompt {
    QuotaExhausted,
    PremiumModel(String),
}

/// The optimistic half of a send. Hand it back to
/// [`Session::complete_send`] together with the backend's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub conversation_id: String,
    pub request: ChatRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginSend {
    Ignored,
    AuthRequired(AuthPrompt),
    Pending(PendingSend),
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Nothing changed: no active conversation, blank text, or the target
    /// conversation vanished before the reply arrived.
    Ignored,
    AuthRequired(AuthPrompt),
    Replied(Message),
    /// The placeholder that was appended, and what went wrong.
    Failed { message: Message, error: ApiError },
}

/// Millisecond ids that never repeat within a session, even when the clock
/// stalls or steps backwards.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn next(&mut self, now: DateTime<Utc>) -> String {
        let candidate = now.timestamp_millis();
        self.last = candidate.max(self.last + 1);
        self.last.to_string()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuestSnapshot {
    #[serde(default)]
    conversations: Vec<Conversation>,
    #[serde(default)]
    active_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GuestSnapshotRef<'a> {
    conversations: &'a [Conversation],
    active_id: Option<&'a str>,
}

pub struct Session<B, S> {
    backend: B,
    storage: S,
    options: SessionOptions,
    conversations: Vec<Conversation>,
    active_id: Option<String>,
    model: String,
    token: Option<String>,
    user: Option<Profile>,
    quota: GuestQuota,
    in_flight: usize,
    ids: IdGenerator,
}

impl<B: ChatBackend, S: Storage> Session<B, S> {
    /// Build a guest session from whatever `storage` holds. A stored token is
    /// attached to the backend but not verified until [`Session::restore`].
    pub fn new(mut backend: B, storage: S, options: SessionOptions) -> Self {
        let token = match storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|token| !token.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "could not read stored token");
                None
            }
        };
        backend.set_token(token.clone());

        let quota = GuestQuota::load(&storage, options.free_message_limit);
        let model = match find_model(&options.default_model) {
            Some(model) => model.id.to_string(),
            None => {
                warn!(model = %options.default_model, "unknown default model, using {DEFAULT_MODEL}");
                DEFAULT_MODEL.to_string()
            }
        };

        let mut session = Self {
            backend,
            storage,
            options,
            conversations: Vec::new(),
            active_id: None,
            model,
            token,
            user: None,
            quota,
            in_flight: 0,
            ids: IdGenerator::default(),
        };
        session.load_guest_state();
        session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|conversation| conversation.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_id.as_deref().and_then(|id| self.conversation(id))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn user(&self) -> Option<&Profile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn has_stored_token(&self) -> bool {
        self.token.is_some()
    }

    /// Whether a reply is outstanding.
    pub fn is_typing(&self) -> bool {
        self.in_flight > 0
    }

    pub fn quota(&self) -> &GuestQuota {
        &self.quota
    }

    /// `None` when signed in; otherwise the guest messages left.
    pub fn remaining_free_messages(&self) -> Option<u32> {
        if self.is_authenticated() {
            None
        } else {
            Some(self.quota.remaining())
        }
    }

    pub fn reset_quota(&mut self) -> Result<(), crate::core::storage::StorageError> {
        self.quota.reset(&mut self.storage)
    }

    /// Insert an empty conversation at the head of the list and select it.
    pub fn new_conversation(&mut self) -> &Conversation {
        let id = self.ids.next(Utc::now());
        debug!(conversation = %id, "starting new conversation");
        self.conversations.insert(0, Conversation::new(id.clone()));
        self.active_id = Some(id);
        self.persist_guest_snapshot();
        &self.conversations[0]
    }

    /// Switch the active conversation. Unknown ids leave the selection alone.
    pub fn select_conversation(&mut self, id: &str) -> bool {
        if self.conversation(id).is_none() {
            return false;
        }
        self.active_id = Some(id.to_string());
        self.persist_guest_snapshot();
        true
    }

    pub fn select_model(&mut self, id: &str) -> Option<&'static ModelInfo> {
        let model = find_model(id)?;
        self.model = model.id.to_string();
        Some(model)
    }

    /// Send `text` to the active conversation and wait for the reply.
    pub async fn send_message(&mut self, text: &str) -> SendOutcome {
        match self.begin_send(text) {
            BeginSend::Ignored => SendOutcome::Ignored,
            BeginSend::AuthRequired(prompt) => SendOutcome::AuthRequired(prompt),
            BeginSend::Pending(pending) => {
                let result = self.backend.send_chat(&pending.request).await;
                self.complete_send(pending, result)
            }
        }
    }

    /// Append the user's message and build the chat request, or explain why
    /// nothing was sent.
    pub fn begin_send(&mut self, text: &str) -> BeginSend {
        let Some(active_id) = self.active_id.clone() else {
            return BeginSend::Ignored;
        };
        let text = text.trim();
        if text.is_empty() {
            return BeginSend::Ignored;
        }

        let guest = !self.is_authenticated();
        if guest {
            if is_premium_model(&self.model) {
                return BeginSend::AuthRequired(AuthPrompt::PremiumModel(self.model.clone()));
            }
            if self.quota.is_exhausted() {
                return BeginSend::AuthRequired(AuthPrompt::QuotaExhausted);
            }
        }

        let now = Utc::now();
        let message_id = self.ids.next(now);
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == active_id)
        else {
            return BeginSend::Ignored;
        };
        conversation.push(Message::user(message_id, text, now));
        let server_id = conversation.server_id.clone();

        if guest {
            if let Err(err) = self.quota.record(&mut self.storage) {
                warn!(error = %err, "could not persist guest message counter");
            }
        }
        self.in_flight += 1;
        self.persist_guest_snapshot();

        debug!(conversation = %active_id, model = %self.model, "sending message");
        BeginSend::Pending(PendingSend {
            conversation_id: active_id,
            request: ChatRequest {
                message: text.to_string(),
                model: self.model.clone(),
                conversation_id: server_id,
            },
        })
    }

    /// Append the assistant's reply, or a failure placeholder, to the
    /// conversation the send started in.
    pub fn complete_send(
        &mut self,
        pending: PendingSend,
        result: Result<ChatReply, ApiError>,
    ) -> SendOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        let PendingSend {
            conversation_id,
            request,
        } = pending;

        let now = Utc::now();
        let message_id = self.ids.next(now);
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == conversation_id)
        else {
            debug!(conversation = %conversation_id, "dropping reply for a conversation that is gone");
            return SendOutcome::Ignored;
        };

        let failure = match result {
            Ok(reply) => {
                if let Some(server_id) = reply.conversation_id {
                    conversation.server_id = Some(server_id);
                }
                conversation.push(Message::ai(message_id, reply.reply, now, Some(request.model)));
                None
            }
            Err(error) => {
                warn!(error = %error, conversation = %conversation_id, "chat request failed");
                conversation.push(Message::send_failure(
                    message_id,
                    format!("{SEND_FAILURE_PREFIX}: {error}"),
                    now,
                    Some(request.model),
                ));
                Some(error)
            }
        };
        let appended = conversation.messages().last().cloned();
        self.persist_guest_snapshot();

        match (appended, failure) {
            (Some(message), None) => SendOutcome::Replied(message),
            (Some(message), Some(error)) => SendOutcome::Failed { message, error },
            (None, _) => SendOutcome::Ignored,
        }
    }

    /// Replace the visible conversations with the guest snapshot, or a fresh
    /// welcome conversation when there is none.
    fn load_guest_state(&mut self) {
        let snapshot = match self.storage.get_json::<GuestSnapshot>(GUEST_CONVERSATIONS_KEY) {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "could not read guest conversations");
                GuestSnapshot::default()
            }
        };

        if snapshot.conversations.is_empty() {
            let now = Utc::now();
            let id = self.ids.next(now);
            self.conversations = vec![Conversation::welcome(id.clone(), now)];
            self.active_id = Some(id);
            return;
        }

        self.active_id = snapshot
            .active_id
            .filter(|id| snapshot.conversations.iter().any(|c| &c.id == id))
            .or_else(|| snapshot.conversations.first().map(|c| c.id.clone()));
        self.conversations = snapshot.conversations;
    }

    fn persist_guest_snapshot(&mut self) {
        if self.is_authenticated() {
            return;
        }
        let snapshot = GuestSnapshotRef {
            conversations: &self.conversations,
            active_id: self.active_id.as_deref(),
        };
        if let Err(err) = self.storage.set_json(GUEST_CONVERSATIONS_KEY, &snapshot) {
            warn!(error = %err, "could not save guest conversations");
        }
    }
}
