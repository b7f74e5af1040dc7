//! HTTP implementation of the backend traits.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{
    AdminBackend, AdminStats, AdminUsersResponse, ApiError, AuthResponse, ChangePlanRequest,
    ChatBackend, ChatReply, ChatRequest, ConversationsResponse, Credentials, MigrateRequest, Plan,
    Profile, ProfileResponse, Registration, RemoteConversation, SessionUrlResponse,
    SuccessResponse,
};
use crate::core::storage::{Storage, TOKEN_KEY};
use crate::utils::url::{construct_api_url, normalize_base_url};

/// A `reqwest` client bound to one service address and, optionally, one
/// bearer token. No retries, no timeouts: a failed call is reported once.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
            token,
        }
    }

    /// Build a client carrying whatever token is persisted in `storage`.
    pub fn from_storage<S: Storage + ?Sized>(base_url: &str, storage: &S) -> Self {
        let token = match storage.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(err) => {
                debug!(error = %err, "no stored token available");
                None
            }
        };
        Self::new(base_url, token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = construct_api_url(&self.base_url, endpoint);
        let request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(endpoint, status = status.as_u16(), "chat service responded");

        if !status.is_success() {
            return Err(ApiError::from_response_body(status, &body));
        }

        // Some endpoints answer 200 with an empty body; let `()`-like targets
        // and all-default structs decode from `{}` instead of failing.
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::GET, endpoint), endpoint)
            .await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(self.request(Method::POST, endpoint).json(body), endpoint)
            .await
    }

    fn require_token(&self) -> Result<(), ApiError> {
        if self.token.is_some() {
            Ok(())
        } else {
            Err(ApiError::Unauthenticated)
        }
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.post("/login", credentials).await
    }

    async fn signup(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        self.post("/signup", registration).await
    }

    async fn profile(&self) -> Result<Profile, ApiError> {
        self.require_token()?;
        let response: ProfileResponse = self.get("/profile").await?;
        Ok(response.into_profile())
    }

    async fn conversations(&self) -> Result<Vec<RemoteConversation>, ApiError> {
        self.require_token()?;
        let response: ConversationsResponse = self.get("/conversations").await?;
        Ok(response.conversations)
    }

    async fn migrate_conversations(
        &self,
        conversations: &[RemoteConversation],
    ) -> Result<bool, ApiError> {
        self.require_token()?;
        let response: SuccessResponse = self
            .post("/conversations/migrate", &MigrateRequest { conversations })
            .await?;
        if !response.success {
            debug!(message = ?response.message, "migration not confirmed");
        }
        Ok(response.success)
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        self.post("/chat", request).await
    }

    async fn create_checkout_session(&self) -> Result<String, ApiError> {
        self.require_token()?;
        let response: SessionUrlResponse = self
            .post("/create-checkout-session", &serde_json::json!({}))
            .await?;
        Ok(response.url)
    }

    async fn create_portal_session(&self) -> Result<String, ApiError> {
        self.require_token()?;
        let response: SessionUrlResponse = self
            .post("/create-portal-session", &serde_json::json!({}))
            .await?;
        Ok(response.url)
    }
}

#[async_trait]
impl AdminBackend for ApiClient {
    async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        self.require_token()?;
        self.get("/admin/stats").await
    }

    async fn admin_users(&self) -> Result<Vec<Profile>, ApiError> {
        self.require_token()?;
        let response: AdminUsersResponse = self.get("/admin/users").await?;
        Ok(response.users)
    }

    async fn change_plan(&self, user_id: &str, plan: Plan) -> Result<bool, ApiError> {
        self.require_token()?;
        let response: SuccessResponse = self
            .post("/admin/change-plan", &ChangePlanRequest { user_id, plan })
            .await?;
        if !response.success {
            debug!(user_id, message = ?response.message, "plan change not applied");
        }
        Ok(response.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Sender;
    use crate::core::storage::MemoryStorage;
    use crate::utils::test_utils::serve;

    #[test]
    fn bearer_header_is_attached_only_with_a_token() {
        let anonymous = ApiClient::new("https://chat.example.com/", None);
        let request = anonymous
            .request(Method::GET, "/profile")
            .build()
            .expect("request should build");
        assert_eq!(request.url().as_str(), "https://chat.example.com/profile");
        assert!(request.headers().get(AUTHORIZATION).is_none());
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let mut storage = MemoryStorage::default();
        storage.set(TOKEN_KEY, "tok-123").unwrap();
        let authed = ApiClient::from_storage("https://chat.example.com", &storage);
        assert!(authed.has_token());
        let request = authed
            .request(Method::GET, "profile")
            .build()
            .expect("request should build");
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer tok-123"
        );
    }

    #[tokio::test]
    async fn authenticated_calls_fail_fast_without_token() {
        let client = ApiClient::new("http://127.0.0.1:9", None);
        let err = client.profile().await.expect_err("profile needs a token");
        assert!(matches!(err, ApiError::Unauthenticated));
        let err = client
            .create_checkout_session()
            .await
            .expect_err("checkout needs a token");
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn login_posts_credentials_and_returns_token() {
        let (base_url, captured) = serve(vec![(
            "200 OK",
            r#"{"token":"abc","user":{"id":"u1","email":"ada@example.com","firstName":"Ada","lastName":"L","plan":"free"}}"#.to_string(),
        )])
        .await;
        let client = ApiClient::new(&base_url, None);

        let response = client
            .login(&Credentials {
                email: "ada@example.com".to_string(),
                password: "Secret123".to_string(),
            })
            .await
            .expect("login should succeed");

        assert_eq!(response.token, "abc");
        assert_eq!(response.user.map(|user| user.first_name).as_deref(), Some("Ada"));

        let requests = captured.lock().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].request_line.starts_with("POST /login "));
        assert!(requests[0].header("authorization").is_none());
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["password"], "Secret123");
    }

    #[tokio::test]
    async fn chat_and_history_carry_bearer_token() {
        let (base_url, captured) = serve(vec![
            (
                "200 OK",
                r#"{"reply":"Hello there","conversationId":"srv-1"}"#.to_string(),
            ),
            (
                "200 OK",
                r#"{"conversations":[{"_id":"srv-1","title":"Greeting","messages":[{"content":"hi","sender":"user","timestamp":"2024-05-01T10:00:00Z"},{"content":"Hello there","sender":"ai","model":"gpt-4"}]}]}"#.to_string(),
            ),
        ])
        .await;
        let client = ApiClient::new(&base_url, Some("tok".to_string()));

        let reply = client
            .send_chat(&ChatRequest {
                message: "hi".to_string(),
                model: "gpt-4".to_string(),
                conversation_id: None,
            })
            .await
            .expect("chat should succeed");
        assert_eq!(reply.reply, "Hello there");
        assert_eq!(reply.conversation_id.as_deref(), Some("srv-1"));

        let history = client.conversations().await.expect("history should load");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "srv-1");
        assert_eq!(history[0].messages[1].sender, Sender::Ai);

        let requests = captured.lock().await;
        assert!(requests[0].request_line.starts_with("POST /chat "));
        assert!(requests[1].request_line.starts_with("GET /conversations "));
        for request in requests.iter() {
            assert_eq!(request.header("authorization"), Some("Bearer tok"));
        }
    }

    #[tokio::test]
    async fn error_status_surfaces_server_message() {
        let (base_url, _captured) = serve(vec![(
            "401 Unauthorized",
            r#"{"message":"Invalid credentials"}"#.to_string(),
        )])
        .await;
        let client = ApiClient::new(&base_url, None);

        let err = client
            .login(&Credentials {
                email: "ada@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .expect_err("login should be rejected");

        assert!(err.is_unauthorized());
        assert_eq!(err.server_message(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn migration_is_confirmed_only_by_success_true() {
        let (base_url, captured) = serve(vec![
            ("200 OK", r#"{"success":true}"#.to_string()),
            ("200 OK", r#"{"success":false,"message":"quota"}"#.to_string()),
            ("200 OK", String::new()),
        ])
        .await;
        let client = ApiClient::new(&base_url, Some("tok".to_string()));
        let conversations = vec![RemoteConversation {
            id: "1".to_string(),
            title: Some("Hi".to_string()),
            last_message: None,
            messages: Vec::new(),
        }];

        assert!(client.migrate_conversations(&conversations).await.unwrap());
        assert!(!client.migrate_conversations(&conversations).await.unwrap());
        assert!(!client.migrate_conversations(&conversations).await.unwrap());

        let requests = captured.lock().await;
        assert!(requests[0]
            .request_line
            .starts_with("POST /conversations/migrate "));
    }

    #[tokio::test]
    async fn change_plan_reports_success_flag() {
        let (base_url, captured) = serve(vec![
            ("200 OK", r#"{"success":true}"#.to_string()),
            ("200 OK", r#"{"success":false,"message":"no such user"}"#.to_string()),
        ])
        .await;
        let client = ApiClient::new(&base_url, Some("admin-token".to_string()));

        assert!(client.change_plan("u1", Plan::Premium).await.unwrap());
        assert!(!client.change_plan("missing", Plan::Free).await.unwrap());

        let requests = captured.lock().await;
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body, serde_json::json!({"userId": "u1", "plan": "premium"}));
    }
}
