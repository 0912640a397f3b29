//! Hosted Backend Integration
//!
//! The portal keeps no data of its own. Authentication, the dashboard
//! records, role lookups and permission grants all live in a hosted
//! Supabase project, reached through the [`Backend`] trait.
//!
//! ## Architecture
//!
//! - **Backend**: async trait describing every call the portal makes
//! - **SupabaseClient**: REST client for GoTrue (auth) and PostgREST (tables)
//! - **TableQuery**: PostgREST query-string builder
//! - **InMemoryBackend**: in-process implementation with the same semantics
//!
//! Every table call takes the caller's access token so that the store's
//! row-level security sees the real user.

mod client;
mod memory;
mod query;

pub use client::{BackendConfig, SupabaseClient, TableNames};
pub use memory::InMemoryBackend;
pub use query::{Order, TableQuery};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Dashboard, DashboardId, NewDashboard, Permission, Profile, RoleId, RoleRecord, User};

/// Tokens and user returned by a successful sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

/// Result of a sign-up request
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account is active and a session was issued
    SignedIn(AuthSession),
    /// The account exists but its email must be confirmed first
    ConfirmationRequired(User),
}

/// Everything the portal asks of the hosted backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    /// Register a new account
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError>;

    /// Invalidate the session behind an access token
    async fn sign_out(&self, token: &str) -> Result<(), BackendError>;

    /// Get the user an access token belongs to
    async fn current_user(&self, token: &str) -> Result<User, BackendError>;

    /// All dashboards, newest first
    async fn list_dashboards(&self, token: &str) -> Result<Vec<Dashboard>, BackendError>;

    /// Dashboards with the given ids, newest first
    async fn dashboards_by_ids(
        &self,
        token: &str,
        ids: &[DashboardId],
    ) -> Result<Vec<Dashboard>, BackendError>;

    /// Insert a dashboard and return the stored row
    async fn insert_dashboard(
        &self,
        token: &str,
        dashboard: &NewDashboard,
    ) -> Result<Dashboard, BackendError>;

    /// Delete a dashboard; deleting a missing id is not an error
    async fn delete_dashboard(&self, token: &str, id: DashboardId) -> Result<(), BackendError>;

    /// The profile row of a user, if any
    async fn profile(&self, token: &str, user_id: &str) -> Result<Option<Profile>, BackendError>;

    /// Create a profile without a role for a user who has none; an existing
    /// profile is left untouched
    async fn ensure_profile(&self, token: &str, user: &User) -> Result<(), BackendError>;

    /// All profile rows
    async fn list_profiles(&self, token: &str) -> Result<Vec<Profile>, BackendError>;

    /// A role row by id, if any
    async fn role(&self, token: &str, role_id: RoleId) -> Result<Option<RoleRecord>, BackendError>;

    /// Permission rows of one user
    async fn permissions_for_user(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Vec<Permission>, BackendError>;

    /// All permission rows
    async fn list_permissions(&self, token: &str) -> Result<Vec<Permission>, BackendError>;

    /// Grant a permission; granting an existing pair is a no-op
    async fn grant_permission(&self, token: &str, permission: &Permission) -> Result<(), BackendError>;

    /// Revoke a permission; revoking a missing pair is a no-op
    async fn revoke_permission(&self, token: &str, permission: &Permission) -> Result<(), BackendError>;

    /// Revoke every permission on one dashboard
    async fn revoke_dashboard_permissions(
        &self,
        token: &str,
        dashboard_id: DashboardId,
    ) -> Result<(), BackendError>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<(), BackendError>;
}

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Session expired or invalid, please sign in again")]
    Unauthorized,

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Refused unfiltered delete on {0}")]
    UnfilteredDelete(String),
}

impl BackendError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() {
            BackendError::Unavailable
        } else {
            BackendError::Request(e)
        }
    }

    /// HTTP status reported by the backend, if the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            BackendError::Unauthorized => Some(401),
            _ => None,
        }
    }
}
