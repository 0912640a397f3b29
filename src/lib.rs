//! # BI Portal
//!
//! A web portal that shows Power BI dashboards to signed-in users of a
//! hosted Supabase project. Admins see every dashboard and manage the
//! records and grants; everyone else sees only what was shared with them.
//!
//! ## Modules
//!
//! - [`backend`]: Supabase auth and table access behind the [`Backend`] trait
//! - [`authz`]: Authorization Resolver and the permissions matrix
//! - [`session`]: Server-side sessions and flash messages
//! - [`api`]: Axum router with pages, JSON API and health probes
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use biportal::{serve, AppState, Config, SessionStore, SupabaseClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     config.validate()?;
//!
//!     let backend = Arc::new(SupabaseClient::new(config.backend.clone())?);
//!     let sessions = Arc::new(SessionStore::new(chrono::Duration::hours(8)));
//!
//!     let state = AppState::new(backend, sessions, config.server.clone());
//!     serve(state, &config.server).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod authz;
pub mod backend;
pub mod config;
pub mod logging;
pub mod model;
pub mod session;

pub use model::{
    Dashboard, DashboardId, NewDashboard, Permission, Profile, Role, RoleId, RoleRecord, User,
    ValidationError,
};

pub use backend::{
    AuthSession, Backend, BackendConfig, BackendError, InMemoryBackend, SignUpOutcome,
    SupabaseClient, TableNames,
};

pub use authz::{AuthorizationResolver, PermissionMatrix, ResolveError, Visibility};

pub use session::{Flash, FlashKind, Session, SessionStore};

pub use api::{build_router, serve, ApiError, AppState, PageError};

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig, SessionConfig};
