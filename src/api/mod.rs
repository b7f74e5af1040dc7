//! Wire types and backend seams for the hosted chat service.
//!
//! Field names follow the service's camelCase JSON. The [`ChatBackend`] and
//! [`AdminBackend`] traits are what the session coordinator and the admin
//! console talk to; [`client::ApiClient`] is the HTTP implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::message::Sender;

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

/// Subscription plan attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

impl Plan {
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "premium" => Ok(Plan::Premium),
            other => Err(format!("unknown plan '{other}' (expected free or premium)")),
        }
    }
}

/// Account details as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_end_date: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }

    pub fn is_premium(&self) -> bool {
        self.plan == Plan::Premium
    }
}

/// The profile endpoint answers either with the bare profile or wrapped in
/// `{"user": …}` depending on the deployment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProfileResponse {
    Wrapped { user: Profile },
    Bare(Profile),
}

impl ProfileResponse {
    pub fn into_profile(self) -> Profile {
        match self {
            ProfileResponse::Wrapped { user } => user,
            ProfileResponse::Bare(profile) => profile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<Profile>,
}

/// A message as the conversation store exchanges it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConversation {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default)]
    pub messages: Vec<RemoteMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationsResponse {
    #[serde(default)]
    pub conversations: Vec<RemoteConversation>,
}

#[derive(Debug, Serialize)]
pub struct MigrateRequest<'a> {
    pub conversations: &'a [RemoteConversation],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    #[serde(alias = "response")]
    pub reply: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionUrlResponse {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UsageSplit {
    #[serde(default)]
    pub connected: u64,
    #[serde(default)]
    pub anonymous: u64,
}

/// Operator statistics from `/admin/stats`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_conversations: u64,
    pub total_messages: u64,
    pub model_stats: BTreeMap<String, u64>,
    pub daily_stats: Vec<DailyCount>,
    pub usage_split: UsageSplit,
    pub top_users: Vec<Value>,
    pub top_sessions: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminUsersResponse {
    #[serde(default)]
    pub users: Vec<Profile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanRequest<'a> {
    pub user_id: &'a str,
    pub plan: Plan,
}

/// Everything the session coordinator needs from the service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Replace the bearer token attached to subsequent requests.
    fn set_token(&mut self, token: Option<String>);

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    async fn signup(&self, registration: &Registration) -> Result<AuthResponse, ApiError>;

    async fn profile(&self) -> Result<Profile, ApiError>;

    async fn conversations(&self) -> Result<Vec<RemoteConversation>, ApiError>;

    /// Returns whether the service reported the upload as stored.
    async fn migrate_conversations(
        &self,
        conversations: &[RemoteConversation],
    ) -> Result<bool, ApiError>;

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError>;

    /// Returns the hosted checkout URL for upgrading to premium.
    async fn create_checkout_session(&self) -> Result<String, ApiError>;

    /// Returns the billing portal URL for an existing subscription.
    async fn create_portal_session(&self) -> Result<String, ApiError>;
}

#[async_trait]
pub trait AdminBackend: Send + Sync {
    async fn admin_stats(&self) -> Result<AdminStats, ApiError>;

    async fn admin_users(&self) -> Result<Vec<Profile>, ApiError>;

    /// Returns whether the service reported the change as applied.
    async fn change_plan(&self, user_id: &str, plan: Plan) -> Result<bool, ApiError>;
}
