//! In-memory backend
//!
//! Implements [`Backend`] over process-local tables. Behaves like the hosted
//! service where the portal can observe it: tokens must be valid, grants are
//! unique pairs, sign-up rejects duplicates and short passwords.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthSession, Backend, BackendError, SignUpOutcome};
use crate::model::{
    sort_newest_first, Dashboard, DashboardId, NewDashboard, Permission, Profile, RoleId,
    RoleRecord, User,
};

const MIN_PASSWORD_LEN: usize = 6;

/// Process-local backend
pub struct InMemoryBackend {
    state: RwLock<State>,
}

struct Account {
    user: User,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct State {
    /// email → account
    accounts: HashMap<String, Account>,
    /// access token → user id
    tokens: HashMap<String, String>,
    dashboards: BTreeMap<DashboardId, Dashboard>,
    next_dashboard_id: DashboardId,
    profiles: BTreeMap<String, Profile>,
    roles: BTreeMap<RoleId, RoleRecord>,
    permissions: BTreeSet<Permission>,
    unavailable: bool,
    require_confirmation: bool,
}

impl State {
    fn check(&self) -> Result<(), BackendError> {
        if self.unavailable {
            Err(BackendError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn authorize(&self, token: &str) -> Result<&str, BackendError> {
        self.check()?;
        self.tokens
            .get(token)
            .map(String::as_str)
            .ok_or(BackendError::Unauthorized)
    }

    fn issue_session(&mut self, user: User) -> AuthSession {
        let access_token = format!("mem-{}", Uuid::new_v4());
        self.tokens.insert(access_token.clone(), user.id.clone());
        AuthSession {
            access_token,
            refresh_token: None,
            expires_in: Some(3600),
            user,
        }
    }

    fn insert_profile_if_absent(&mut self, user: &User) {
        self.profiles
            .entry(user.id.clone())
            .or_insert_with(|| Profile {
                id: user.id.clone(),
                email: user.email.clone(),
                role_id: None,
            });
    }

    fn role_id_by_name(&self, name: &str) -> Option<RoleId> {
        self.roles.values().find(|r| r.name == name).map(|r| r.id)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Create a backend with the `admin` (1) and `user` (2) roles
    pub fn new() -> Self {
        let mut state = State {
            next_dashboard_id: 1,
            ..Default::default()
        };
        for (id, name) in [(1, "admin"), (2, "user")] {
            state.roles.insert(
                id,
                RoleRecord {
                    id,
                    name: name.to_string(),
                },
            );
        }

        Self {
            state: RwLock::new(state),
        }
    }

    /// Add a role row and return its id
    pub async fn add_role(&self, name: &str) -> RoleId {
        let mut state = self.state.write().await;
        if let Some(id) = state.role_id_by_name(name) {
            return id;
        }
        let id = state.roles.keys().next_back().copied().unwrap_or(0) + 1;
        state.roles.insert(
            id,
            RoleRecord {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    /// Add a confirmed account.
    ///
    /// With `role` set, a profile row pointing at that role is created
    /// (adding the role if needed); with `None` the user has no profile.
    /// Unlike [`Backend::sign_up`], this models an account created outside
    /// the portal.
    pub async fn add_user(&self, email: &str, password: &str, role: Option<&str>) -> User {
        let role_id = match role {
            Some(name) => Some(self.add_role(name).await),
            None => None,
        };

        let mut state = self.state.write().await;
        let user = User::new(Uuid::new_v4().to_string(), email);
        state.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed: true,
            },
        );
        if role_id.is_some() {
            state.profiles.insert(
                user.id.clone(),
                Profile {
                    id: user.id.clone(),
                    email: user.email.clone(),
                    role_id,
                },
            );
        }
        user
    }

    /// Point a profile at an arbitrary role id, including ids with no role row
    pub async fn set_profile_role(&self, user_id: &str, role_id: Option<RoleId>) {
        let mut state = self.state.write().await;
        let email = state
            .accounts
            .values()
            .find(|a| a.user.id == user_id)
            .and_then(|a| a.user.email.clone());
        state.profiles.insert(
            user_id.to_string(),
            Profile {
                id: user_id.to_string(),
                email,
                role_id,
            },
        );
    }

    /// Add a dashboard with an explicit creation time
    pub async fn add_dashboard(&self, dashboard: NewDashboard, created_at: DateTime<Utc>) -> Dashboard {
        let mut state = self.state.write().await;
        let id = state.next_dashboard_id;
        state.next_dashboard_id += 1;
        let row = Dashboard {
            id,
            name: dashboard.name,
            description: dashboard.description,
            embed_url: dashboard.embed_url,
            created_at,
        };
        state.dashboards.insert(id, row.clone());
        row
    }

    /// Issue a session for an existing user without a password check
    pub async fn session_for(&self, user: &User) -> AuthSession {
        self.state.write().await.issue_session(user.clone())
    }

    /// Make every call fail with [`BackendError::Unavailable`]
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Require email confirmation for new sign-ups
    pub async fn set_require_confirmation(&self, required: bool) {
        self.state.write().await.require_confirmation = required;
    }

    /// Invalidate every issued access token, as when the hosted sessions expire
    pub async fn revoke_tokens(&self) {
        self.state.write().await.tokens.clear();
    }

    /// Snapshot of all permission rows
    pub async fn permissions(&self) -> Vec<Permission> {
        self.state.read().await.permissions.iter().cloned().collect()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let mut state = self.state.write().await;
        state.check()?;

        let user = match state.accounts.get(email) {
            Some(account) if account.password == password => {
                if !account.confirmed {
                    return Err(BackendError::Api {
                        status: 400,
                        message: "Email not confirmed".to_string(),
                    });
                }
                account.user.clone()
            }
            _ => {
                return Err(BackendError::Api {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                })
            }
        };

        Ok(state.issue_session(user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let mut state = self.state.write().await;
        state.check()?;

        if state.accounts.contains_key(email) {
            return Err(BackendError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::Api {
                status: 422,
                message: format!(
                    "Password should be at least {} characters",
                    MIN_PASSWORD_LEN
                ),
            });
        }

        let user = User::new(Uuid::new_v4().to_string(), email);
        let confirmed = !state.require_confirmation;
        state.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed,
            },
        );
        state.insert_profile_if_absent(&user);

        if confirmed {
            Ok(SignUpOutcome::SignedIn(state.issue_session(user)))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired(user))
        }
    }

    async fn sign_out(&self, token: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        state.tokens.remove(token);
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<User, BackendError> {
        let state = self.state.read().await;
        let user_id = state.authorize(token)?;
        state
            .accounts
            .values()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or(BackendError::Unauthorized)
    }

    async fn list_dashboards(&self, token: &str) -> Result<Vec<Dashboard>, BackendError> {
        let state = self.state.read().await;
        state.authorize(token)?;
        let mut rows: Vec<Dashboard> = state.dashboards.values().cloned().collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    async fn dashboards_by_ids(
        &self,
        token: &str,
        ids: &[DashboardId],
    ) -> Result<Vec<Dashboard>, BackendError> {
        let state = self.state.read().await;
        state.authorize(token)?;
        let mut rows: Vec<Dashboard> = ids
            .iter()
            .filter_map(|id| state.dashboards.get(id).cloned())
            .collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    async fn insert_dashboard(
        &self,
        token: &str,
        dashboard: &NewDashboard,
    ) -> Result<Dashboard, BackendError> {
        self.state.read().await.authorize(token)?;
        Ok(self.add_dashboard(dashboard.clone(), Utc::now()).await)
    }

    async fn delete_dashboard(&self, token: &str, id: DashboardId) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        state.dashboards.remove(&id);
        Ok(())
    }

    async fn profile(&self, token: &str, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let state = self.state.read().await;
        state.authorize(token)?;
        Ok(state.profiles.get(user_id).cloned())
    }

    async fn ensure_profile(&self, token: &str, user: &User) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        state.insert_profile_if_absent(user);
        Ok(())
    }

    async fn list_profiles(&self, token: &str) -> Result<Vec<Profile>, BackendError> {
        let state = self.state.read().await;
        state.authorize(token)?;
        Ok(state.profiles.values().cloned().collect())
    }

    async fn role(&self, token: &str, role_id: RoleId) -> Result<Option<RoleRecord>, BackendError> {
        let state = self.state.read().await;
        state.authorize(token)?;
        Ok(state.roles.get(&role_id).cloned())
    }

    async fn permissions_for_user(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Vec<Permission>, BackendError> {
        let state = self.state.read().await;
        state.authorize(token)?;
        Ok(state
            .permissions
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_permissions(&self, token: &str) -> Result<Vec<Permission>, BackendError> {
        let state = self.state.read().await;
        state.authorize(token)?;
        Ok(state.permissions.iter().cloned().collect())
    }

    async fn grant_permission(&self, token: &str, permission: &Permission) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        state.permissions.insert(permission.clone());
        Ok(())
    }

    async fn revoke_permission(&self, token: &str, permission: &Permission) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        state.permissions.remove(permission);
        Ok(())
    }

    async fn revoke_dashboard_permissions(
        &self,
        token: &str,
        dashboard_id: DashboardId,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        state.permissions.retain(|p| p.dashboard_id != dashboard_id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        self.state.read().await.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_and_token_check() {
        let backend = InMemoryBackend::new();
        let user = backend.add_user("ana@example.com", "secret1", Some("user")).await;

        let err = backend.sign_in("ana@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");

        let session = backend.sign_in("ana@example.com", "secret1").await.unwrap();
        assert_eq!(session.user, user);
        assert_eq!(backend.current_user(&session.access_token).await.unwrap(), user);

        backend.sign_out(&session.access_token).await.unwrap();
        assert!(matches!(
            backend.list_dashboards(&session.access_token).await,
            Err(BackendError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_sign_up_rules() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.sign_up("new@example.com", "123").await,
            Err(BackendError::Api { status: 422, .. })
        ));
        assert!(matches!(
            backend.sign_up("new@example.com", "123456").await.unwrap(),
            SignUpOutcome::SignedIn(_)
        ));
        assert!(matches!(
            backend.sign_up("new@example.com", "123456").await,
            Err(BackendError::Api { status: 422, .. })
        ));

        backend.set_require_confirmation(true).await;
        assert!(matches!(
            backend.sign_up("later@example.com", "123456").await.unwrap(),
            SignUpOutcome::ConfirmationRequired(_)
        ));
        let err = backend.sign_in("later@example.com", "123456").await.unwrap_err();
        assert_eq!(err.to_string(), "Email not confirmed");
    }

    #[tokio::test]
    async fn test_sign_up_creates_profile_without_role() {
        let backend = InMemoryBackend::new();
        let admin = backend.add_user("admin@example.com", "secret1", Some("admin")).await;
        let token = backend.session_for(&admin).await.access_token;

        let SignUpOutcome::SignedIn(session) =
            backend.sign_up("newbie@example.com", "secret1").await.unwrap()
        else {
            panic!("expected an active account");
        };

        let profile = backend
            .profile(&token, &session.user.id)
            .await
            .unwrap()
            .expect("sign-up should create a profile");
        assert_eq!(profile.email.as_deref(), Some("newbie@example.com"));
        assert_eq!(profile.role_id, None);
    }

    #[tokio::test]
    async fn test_ensure_profile_keeps_existing_role() {
        let backend = InMemoryBackend::new();
        let admin = backend.add_user("admin@example.com", "secret1", Some("admin")).await;
        let outsider = backend.add_user("outsider@example.com", "secret1", None).await;
        let token = backend.session_for(&admin).await.access_token;

        backend.ensure_profile(&token, &admin).await.unwrap();
        backend.ensure_profile(&token, &outsider).await.unwrap();

        let profiles = backend.list_profiles(&token).await.unwrap();
        assert_eq!(profiles.len(), 2);
        let admin_profile = profiles.iter().find(|p| p.id == admin.id).unwrap();
        assert_eq!(admin_profile.role_id, Some(1));
        let outsider_profile = profiles.iter().find(|p| p.id == outsider.id).unwrap();
        assert_eq!(outsider_profile.role_id, None);
    }

    #[tokio::test]
    async fn test_grant_is_unique() {
        let backend = InMemoryBackend::new();
        let user = backend.add_user("a@example.com", "secret1", Some("admin")).await;
        let session = backend.session_for(&user).await;
        let token = session.access_token.as_str();

        let grant = Permission::new(1, "u9");
        backend.grant_permission(token, &grant).await.unwrap();
        backend.grant_permission(token, &grant).await.unwrap();
        assert_eq!(backend.permissions().await, vec![grant.clone()]);

        backend.revoke_permission(token, &grant).await.unwrap();
        backend.revoke_permission(token, &grant).await.unwrap();
        assert!(backend.permissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let backend = InMemoryBackend::new();
        backend.set_unavailable(true).await;
        assert!(matches!(backend.health_check().await, Err(BackendError::Unavailable)));
        assert!(matches!(
            backend.sign_in("a@b.c", "x").await,
            Err(BackendError::Unavailable)
        ));
    }
}
