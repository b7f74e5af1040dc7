//! Operator console: usage statistics and plan management.

use std::error::Error as StdError;
use std::fmt;

use tracing::{debug, warn};

use crate::api::{AdminBackend, AdminStats, ApiError, ChatBackend, Credentials, Plan, Profile};
use crate::core::storage::{Storage, StorageError, TOKEN_KEY};

/// Banner for a rejected operator sign-in that carried no server message.
pub const ADMIN_SIGN_IN_FAILURE: &str = "Invalid credentials";

#[derive(Debug)]
pub enum AdminError {
    SignIn(ApiError),
    /// The token could not be saved or removed.
    Storage(StorageError),
    Stats(ApiError),
    Users(ApiError),
    ChangePlan(ApiError),
    /// The service answered but did not apply the change.
    PlanNotChanged,
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminError::SignIn(err) => {
                f.write_str(err.server_message().unwrap_or(ADMIN_SIGN_IN_FAILURE))
            }
            AdminError::Storage(err) => write!(f, "Failed to store admin credentials: {err}"),
            AdminError::Stats(_) => write!(f, "Failed to fetch statistics"),
            AdminError::Users(_) => write!(f, "Failed to fetch users"),
            AdminError::ChangePlan(_) | AdminError::PlanNotChanged => {
                write!(f, "Failed to update user plan")
            }
        }
    }
}

impl StdError for AdminError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AdminError::SignIn(err)
            | AdminError::Stats(err)
            | AdminError::Users(err)
            | AdminError::ChangePlan(err) => Some(err),
            AdminError::Storage(err) => Some(err),
            AdminError::PlanNotChanged => None,
        }
    }
}

impl From<StorageError> for AdminError {
    fn from(err: StorageError) -> Self {
        AdminError::Storage(err)
    }
}

/// Operator sign-in. The credentials go to the service as entered, with no
/// client-side form rules, and the returned token is stored for later
/// admin calls. Guest conversations are left alone.
pub async fn admin_sign_in<B: ChatBackend, S: Storage + ?Sized>(
    backend: &mut B,
    storage: &mut S,
    credentials: &Credentials,
) -> Result<(), AdminError> {
    let response = backend.login(credentials).await.map_err(|err| {
        warn!(error = %err, "admin sign-in rejected");
        AdminError::SignIn(err)
    })?;
    storage.set(TOKEN_KEY, &response.token)?;
    backend.set_token(Some(response.token));
    debug!("admin signed in");
    Ok(())
}

/// Forget the stored operator token.
pub fn admin_sign_out<S: Storage + ?Sized>(storage: &mut S) -> Result<(), AdminError> {
    storage.remove(TOKEN_KEY)?;
    Ok(())
}

/// Cached admin view over an [`AdminBackend`].
pub struct AdminConsole<B> {
    backend: B,
    stats: Option<AdminStats>,
    users: Vec<Profile>,
}

impl<B: AdminBackend> AdminConsole<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            stats: None,
            users: Vec::new(),
        }
    }

    pub fn stats(&self) -> Option<&AdminStats> {
        self.stats.as_ref()
    }

    pub fn users(&self) -> &[Profile] {
        &self.users
    }

    pub async fn fetch_stats(&mut self) -> Result<&AdminStats, AdminError> {
        let stats = self.backend.admin_stats().await.map_err(|err| {
            warn!(error = %err, "admin statistics request failed");
            AdminError::Stats(err)
        })?;
        Ok(&*self.stats.insert(stats))
    }

    pub async fn fetch_users(&mut self) -> Result<&[Profile], AdminError> {
        self.users = self.backend.admin_users().await.map_err(|err| {
            warn!(error = %err, "admin user list request failed");
            AdminError::Users(err)
        })?;
        Ok(&self.users)
    }

    /// Change a user's plan; the cached user list is updated when the service
    /// confirms.
    pub async fn change_plan(&mut self, user_id: &str, plan: Plan) -> Result<(), AdminError> {
        let applied = self
            .backend
            .change_plan(user_id, plan)
            .await
            .map_err(AdminError::ChangePlan)?;
        if !applied {
            return Err(AdminError::PlanNotChanged);
        }
        debug!(user = user_id, %plan, "plan changed");
        if let Some(user) = self.users.iter_mut().find(|user| user.id == user_id) {
            user.plan = plan;
        }
        Ok(())
    }
}

/// Model usage as `(model, count, percent)` rows, busiest first.
pub fn model_usage_rows(stats: &AdminStats) -> Vec<(String, u64, f64)> {
    let total: u64 = stats.model_stats.values().sum();
    let mut rows: Vec<_> = stats
        .model_stats
        .iter()
        .map(|(model, count)| {
            let percent = if total == 0 {
                0.0
            } else {
                *count as f64 * 100.0 / total as f64
            };
            (model.clone(), *count, percent)
        })
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::core::storage::MemoryStorage;
    use crate::utils::test_utils::serve;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::BTreeMap;

    struct FakeAdmin {
        users: Vec<Profile>,
        apply_changes: bool,
        stats_fail: bool,
    }

    fn user(id: &str, plan: Plan) -> Profile {
        Profile {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            plan,
            created_at: None,
            subscription_end_date: None,
        }
    }

    #[async_trait]
    impl AdminBackend for FakeAdmin {
        async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
            if self.stats_fail {
                return Err(ApiError::Status {
                    status: StatusCode::FORBIDDEN,
                    message: Some("Admin access required".to_string()),
                });
            }
            Ok(AdminStats {
                total_users: self.users.len() as u64,
                ..AdminStats::default()
            })
        }

        async fn admin_users(&self) -> Result<Vec<Profile>, ApiError> {
            Ok(self.users.clone())
        }

        async fn change_plan(&self, _user_id: &str, _plan: Plan) -> Result<bool, ApiError> {
            Ok(self.apply_changes)
        }
    }

    fn console(apply_changes: bool) -> AdminConsole<FakeAdmin> {
        AdminConsole::new(FakeAdmin {
            users: vec![user("a", Plan::Free), user("b", Plan::Free)],
            apply_changes,
            stats_fail: false,
        })
    }

    #[tokio::test]
    async fn confirmed_plan_change_updates_the_list_in_place() {
        let mut console = console(true);
        console.fetch_users().await.unwrap();

        console.change_plan("b", Plan::Premium).await.unwrap();

        let plans: Vec<_> = console.users().iter().map(|u| u.plan).collect();
        assert_eq!(plans, vec![Plan::Free, Plan::Premium]);
    }

    #[tokio::test]
    async fn unconfirmed_plan_change_leaves_the_list_alone() {
        let mut console = console(false);
        console.fetch_users().await.unwrap();

        let err = console
            .change_plan("a", Plan::Premium)
            .await
            .expect_err("change not applied");

        assert_eq!(err.to_string(), "Failed to update user plan");
        assert_eq!(console.users()[0].plan, Plan::Free);
    }

    #[tokio::test]
    async fn stats_failures_use_the_console_message() {
        let mut console = console(true);
        console.backend.stats_fail = true;
        let err = console.fetch_stats().await.expect_err("forbidden");
        assert_eq!(err.to_string(), "Failed to fetch statistics");
        assert!(console.stats().is_none());

        console.backend.stats_fail = false;
        assert_eq!(console.fetch_stats().await.unwrap().total_users, 2);
    }

    fn operator() -> Credentials {
        Credentials {
            email: "root@example.com".to_string(),
            password: "admin".to_string(),
        }
    }

    #[tokio::test]
    async fn admin_sign_in_skips_form_rules_and_stores_the_token() {
        let (base_url, captured) = serve(vec![
            ("200 OK", r#"{"token":"admin-tok"}"#.to_string()),
            ("200 OK", r#"{"totalUsers":3}"#.to_string()),
        ])
        .await;
        let mut client = ApiClient::new(&base_url, None);
        let mut storage = MemoryStorage::new();

        admin_sign_in(&mut client, &mut storage, &operator())
            .await
            .expect("sign-in accepted");

        assert_eq!(
            storage.get(TOKEN_KEY).unwrap().as_deref(),
            Some("admin-tok")
        );
        let mut console = AdminConsole::new(client);
        assert_eq!(console.fetch_stats().await.unwrap().total_users, 3);

        let requests = captured.lock().await;
        assert!(requests[0].request_line.starts_with("POST /login "));
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["password"], "admin");
        assert_eq!(requests[1].header("authorization"), Some("Bearer admin-tok"));

        admin_sign_out(&mut storage).unwrap();
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn admin_sign_in_failure_banner() {
        let (base_url, _captured) = serve(vec![
            ("401 Unauthorized", String::new()),
            ("403 Forbidden", r#"{"message":"Account locked"}"#.to_string()),
        ])
        .await;
        let mut client = ApiClient::new(&base_url, None);
        let mut storage = MemoryStorage::new();

        let err = admin_sign_in(&mut client, &mut storage, &operator())
            .await
            .expect_err("rejected");
        assert_eq!(err.to_string(), "Invalid credentials");

        let err = admin_sign_in(&mut client, &mut storage, &operator())
            .await
            .expect_err("rejected");
        assert_eq!(err.to_string(), "Account locked");
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert!(!client.has_token());
    }

    #[test]
    fn usage_rows_are_sorted_with_percentages() {
        let stats = AdminStats {
            model_stats: BTreeMap::from([
                ("claude".to_string(), 1),
                ("gpt-4".to_string(), 3),
            ]),
            ..AdminStats::default()
        };
        let rows = model_usage_rows(&stats);
        assert_eq!(rows[0].0, "gpt-4");
        assert!((rows[0].2 - 75.0).abs() < f64::EPSILON);
        assert_eq!(rows[1], ("claude".to_string(), 1, 25.0));
        assert!(model_usage_rows(&AdminStats::default()).is_empty());
    }
}
