//! Core data types for the portal
//!
//! These mirror the rows of the hosted store:
//! - `User`: an account owned by the auth service
//! - `Profile`: the `usuarios` row linking a user to a role
//! - `RoleRecord` / `Role`: the role lookup table and its resolved tier
//! - `Dashboard` / `NewDashboard`: report records managed by admins
//! - `Permission`: a (dashboard, user) visibility grant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a dashboard row
pub type DashboardId = i64;

/// Identifier of a role row
pub type RoleId = i64;

/// An authenticated account, as reported by the auth service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Auth user UUID
    pub id: String,
    /// Email address (may be absent for phone-only accounts)
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
        }
    }

    /// Email if known, otherwise the raw id
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

/// A `usuarios` row: the profile linking a user to a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role_id: Option<RoleId>,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

/// A `user_roles` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
}

/// Resolved permission tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub const ADMIN_NAME: &'static str = "admin";

    /// Map a role name from the lookup table to a tier.
    ///
    /// Only the exact name `admin` grants the admin tier.
    pub fn from_name(name: &str) -> Self {
        if name == Self::ADMIN_NAME {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dashboard record
///
/// Field names follow the store columns (`nome`, `descricao`, `link_power_bi`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: DashboardId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "link_power_bi")]
    pub embed_url: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDashboard {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "link_power_bi")]
    pub embed_url: String,
}

/// Maximum dashboard name length
pub const MAX_NAME_LEN: usize = 200;

impl NewDashboard {
    pub fn new(name: impl Into<String>, embed_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            embed_url: embed_url.into(),
        }
    }

    /// Builder method: set description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Trim fields and check them before insert.
    ///
    /// Blank descriptions become `None`.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong(MAX_NAME_LEN));
        }

        let embed_url = self.embed_url.trim().to_string();
        let parsed = reqwest::Url::parse(&embed_url)
            .map_err(|_| ValidationError::InvalidUrl(embed_url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ValidationError::InvalidUrl(embed_url));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            name,
            description,
            embed_url,
        })
    }
}

/// Dashboard input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Dashboard name cannot be empty")]
    EmptyName,

    #[error("Dashboard name exceeds maximum length of {0} characters")]
    NameTooLong(usize),

    #[error("Report link must be an absolute http(s) URL: {0}")]
    InvalidUrl(String),
}

/// A `user_dashboard_permissions` row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permission {
    pub dashboard_id: DashboardId,
    pub user_id: String,
}

impl Permission {
    pub fn new(dashboard_id: DashboardId, user_id: impl Into<String>) -> Self {
        Self {
            dashboard_id,
            user_id: user_id.into(),
        }
    }
}

/// Newest first, ties broken by descending id, duplicates removed
pub fn sort_newest_first(dashboards: &mut Vec<Dashboard>) {
    dashboards.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    dashboards.dedup_by_key(|d| d.id);
}
