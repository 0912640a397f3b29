//! Permission Routes
//!
//! - GET /admin/permissions - User × dashboard grant matrix
//! - POST /admin/permissions - Grant or revoke one cell

use axum::{extract::State, response::Redirect, Form};
use maud::Markup;
use std::sync::Arc;
use tower_cookies::Cookies;

use super::admin::ensure_admin;
use crate::api::dto::{PermissionAction, PermissionForm};
use crate::api::error::{OrRedirect, PageError};
use crate::api::extract::CurrentSession;
use crate::api::state::AppState;
use crate::api::views::{self, Viewer};
use crate::authz::PermissionMatrix;
use crate::model::{Permission, Role};
use crate::session::{set_flash, take_flash, Flash};

/// GET /admin/permissions
pub async fn page(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    cookies: Cookies,
) -> Result<Markup, PageError> {
    ensure_admin(&state, &session).await?;

    let token = session.access_token.as_str();
    let (profiles, dashboards, permissions) = tokio::try_join!(
        state.backend.list_profiles(token),
        state.backend.list_dashboards(token),
        state.backend.list_permissions(token),
    )
    .or_redirect("/admin")?;

    let matrix = PermissionMatrix::build(&profiles, &dashboards, &permissions);
    tracing::debug!(
        users = matrix.rows.len(),
        dashboards = matrix.dashboards.len(),
        grants = matrix.granted_count(),
        "Built permission matrix"
    );

    let viewer = Viewer {
        user: &session.user,
        role: Role::Admin,
    };
    let pending = take_flash(&cookies);
    Ok(views::permissions::render(&viewer, &matrix, pending.as_slice()))
}

/// POST /admin/permissions
pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    cookies: Cookies,
    Form(form): Form<PermissionForm>,
) -> Result<Redirect, PageError> {
    ensure_admin(&state, &session).await?;

    let user_id = form.user_id.trim();
    if user_id.is_empty() {
        return Err(PageError::new("/admin/permissions", "Missing user"));
    }

    let permission = Permission::new(form.dashboard_id, user_id);
    let token = session.access_token.as_str();

    let message = match form.action {
        PermissionAction::Grant => {
            state
                .backend
                .grant_permission(token, &permission)
                .await
                .or_redirect("/admin/permissions")?;
            "Access granted"
        }
        PermissionAction::Revoke => {
            state
                .backend
                .revoke_permission(token, &permission)
                .await
                .or_redirect("/admin/permissions")?;
            "Access revoked"
        }
    };

    tracing::info!(
        admin_id = %session.user.id,
        user_id = %permission.user_id,
        dashboard_id = permission.dashboard_id,
        action = ?form.action,
        "Permission updated"
    );
    set_flash(&cookies, Flash::success(message));
    Ok(Redirect::to("/admin/permissions"))
}
