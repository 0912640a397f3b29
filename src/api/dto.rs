//! Data Transfer Objects
//!
//! Form payloads posted by the pages and JSON bodies of `/api/v1`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Dashboard, DashboardId, NewDashboard, Role, User};

// ============================================
// FORMS
// ============================================

/// Login and sign-up form
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsForm {
    /// Trimmed email, or an error message for the form
    pub fn checked(&self) -> Result<(&str, &str), &'static str> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err("Enter a valid email address");
        }
        if self.password.is_empty() {
            return Err("Enter your password");
        }
        Ok((email, self.password.as_str()))
    }
}

/// Admin "new dashboard" form
#[derive(Debug, Deserialize)]
pub struct DashboardForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub embed_url: String,
}

impl From<DashboardForm> for NewDashboard {
    fn from(form: DashboardForm) -> Self {
        NewDashboard::new(form.name, form.embed_url).description(form.description)
    }
}

/// Grant or revoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    Grant,
    Revoke,
}

/// Permissions matrix cell toggle
#[derive(Debug, Deserialize)]
pub struct PermissionForm {
    pub dashboard_id: DashboardId,
    pub user_id: String,
    pub action: PermissionAction,
}

// ============================================
// JSON API
// ============================================

/// `POST /api/v1/auth/login`
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
    pub role: Role,
}

/// `GET /api/v1/me`
#[derive(Debug, Deserialize, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub role: Role,
}

/// A dashboard as exposed by the JSON API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardResponse {
    pub id: DashboardId,
    pub name: String,
    pub description: Option<String>,
    pub embed_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Dashboard> for DashboardResponse {
    fn from(d: Dashboard) -> Self {
        Self {
            id: d.id,
            name: d.name,
            description: d.description,
            embed_url: d.embed_url,
            created_at: d.created_at,
        }
    }
}

/// `GET /api/v1/dashboards`
#[derive(Debug, Deserialize, Serialize)]
pub struct DashboardListResponse {
    pub role: Role,
    pub total: usize,
    pub dashboards: Vec<DashboardResponse>,
}

// ============================================
// HEALTH
// ============================================

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub sessions: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
