use std::error::Error as StdError;
use std::fmt;

use tracing::{debug, warn};

use super::Session;
use crate::api::{ApiError, AuthResponse, ChatBackend, Credentials, Profile, RemoteConversation};
use crate::core::conversation::Conversation;
use crate::core::storage::{Storage, GUEST_CONVERSATIONS_KEY, TOKEN_KEY};
use crate::core::validation::{validate_sign_in, FieldErrors, SignUpForm};

const GENERIC_AUTH_FAILURE: &str = "Something went wrong. Please try again.";

/// Why a sign-in or sign-up did not produce a session.
#[derive(Debug)]
pub enum AuthError {
    /// The form failed client-side checks and was not submitted.
    Invalid(FieldErrors),
    /// The service turned the request down or could not be reached.
    Rejected(ApiError),
}

impl AuthError {
    /// Banner text for the auth prompt.
    pub fn banner(&self) -> String {
        match self {
            AuthError::Invalid(errors) => errors.to_string(),
            AuthError::Rejected(err) => err
                .server_message()
                .unwrap_or(GENERIC_AUTH_FAILURE)
                .to_string(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.banner())
    }
}

impl StdError for AuthError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AuthError::Invalid(errors) => Some(errors),
            AuthError::Rejected(err) => Some(err),
        }
    }
}

impl From<FieldErrors> for AuthError {
    fn from(errors: FieldErrors) -> Self {
        AuthError::Invalid(errors)
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        AuthError::Rejected(err)
    }
}

impl<B: ChatBackend, S: Storage> Session<B, S> {
    /// Resolve a stored token into a signed-in session.
    ///
    /// Returns whether the session is now authenticated. Any failure leaves
    /// the guest state in place; the token is only forgotten when the service
    /// rejects it.
    pub async fn restore(&mut self) -> bool {
        if self.token.is_none() {
            return false;
        }
        match self.backend.profile().await {
            Ok(profile) => {
                debug!(user = %profile.id, "restored session from stored token");
                self.user = Some(profile);
                self.load_history().await;
                true
            }
            Err(err) => {
                warn!(error = %err, "could not restore session");
                if err.is_unauthorized() {
                    self.forget_token();
                }
                false
            }
        }
    }

    pub async fn sign_in(&mut self, credentials: Credentials) -> Result<&Profile, AuthError> {
        let credentials = Credentials {
            email: credentials.email.trim().to_string(),
            password: credentials.password,
        };
        validate_sign_in(&credentials)?;
        let response = self.backend.login(&credentials).await?;
        self.complete_authentication(response).await
    }

    pub async fn sign_up(&mut self, form: SignUpForm) -> Result<&Profile, AuthError> {
        form.validate()?;
        let registration = form.into_registration();
        let response = self.backend.signup(&registration).await?;
        self.complete_authentication(response).await
    }

    /// Forget the credentials and go back to guest state.
    pub fn sign_out(&mut self) {
        debug!("signing out");
        self.forget_token();
        self.user = None;
        self.load_guest_state();
    }

    /// Re-fetch the signed-in user's profile.
    pub async fn refresh_profile(&mut self) -> Result<&Profile, ApiError> {
        if self.token.is_none() {
            return Err(ApiError::Unauthenticated);
        }
        match self.backend.profile().await {
            Ok(profile) => Ok(&*self.user.insert(profile)),
            Err(err) => {
                if err.is_unauthorized() {
                    self.forget_token();
                    self.user = None;
                    self.load_guest_state();
                }
                Err(err)
            }
        }
    }

    /// Checkout URL for upgrading the signed-in account.
    pub async fn start_subscription(&self) -> Result<String, ApiError> {
        if !self.is_authenticated() {
            return Err(ApiError::Unauthenticated);
        }
        self.backend.create_checkout_session().await
    }

    /// Billing portal URL for the signed-in account.
    pub async fn manage_subscription(&self) -> Result<String, ApiError> {
        if !self.is_authenticated() {
            return Err(ApiError::Unauthenticated);
        }
        self.backend.create_portal_session().await
    }

    async fn complete_authentication(
        &mut self,
        response: AuthResponse,
    ) -> Result<&Profile, AuthError> {
        let AuthResponse { token, user } = response;
        self.remember_token(token);

        let profile = match user {
            Some(profile) => profile,
            None => match self.backend.profile().await {
                Ok(profile) => profile,
                Err(err) => {
                    self.forget_token();
                    return Err(AuthError::Rejected(err));
                }
            },
        };
        debug!(user = %profile.id, plan = %profile.plan, "signed in");

        // Only a guest's own conversations are uploaded; an already signed-in
        // session is holding the account's history.
        let guest_conversations: Vec<RemoteConversation> = if self.user.is_none() {
            self.conversations
                .iter()
                .filter(|conversation| conversation.has_user_messages())
                .map(Conversation::to_remote)
                .collect()
        } else {
            Vec::new()
        };
        self.user = Some(profile);

        if self.options.migrate_guest_conversations && !guest_conversations.is_empty() {
            self.migrate_guest_conversations(&guest_conversations).await;
        }
        self.load_history().await;

        self.user.as_ref().ok_or(AuthError::Rejected(ApiError::Unauthenticated))
    }

    /// Upload guest conversations. Failures are logged and the local snapshot
    /// is kept so a later sign-in can try again.
    async fn migrate_guest_conversations(&mut self, conversations: &[RemoteConversation]) {
        match self.backend.migrate_conversations(conversations).await {
            Ok(false) => warn!("service did not confirm guest conversation migration"),
            Ok(true) => {
                debug!(count = conversations.len(), "migrated guest conversations");
                if let Err(err) = self.storage.remove(GUEST_CONVERSATIONS_KEY) {
                    warn!(error = %err, "could not clear migrated guest conversations");
                }
            }
            Err(err) => warn!(error = %err, "guest conversation migration failed"),
        }
    }

    /// Replace local conversations with the account's history. An empty or
    /// unavailable history leaves the local list as it is.
    async fn load_history(&mut self) {
        match self.backend.conversations().await {
            Ok(remote) if remote.is_empty() => {
                debug!("account has no saved conversations");
            }
            Ok(remote) => {
                self.conversations = remote.into_iter().map(Conversation::from_remote).collect();
                self.active_id = self.conversations.first().map(|c| c.id.clone());
            }
            Err(err) => warn!(error = %err, "could not load conversation history"),
        }
    }

    fn remember_token(&mut self, token: String) {
        if let Err(err) = self.storage.set(TOKEN_KEY, &token) {
            warn!(error = %err, "could not persist token");
        }
        self.backend.set_token(Some(token.clone()));
        self.token = Some(token);
    }

    fn forget_token(&mut self) {
        if let Err(err) = self.storage.remove(TOKEN_KEY) {
            warn!(error = %err, "could not remove stored token");
        }
        self.backend.set_token(None);
        self.token = None;
    }
}
