//! Admin Routes
//!
//! - GET /admin - Dashboard records with a create form
//! - POST /admin/dashboards - Create a dashboard record
//! - POST /admin/dashboards/:id/delete - Delete a dashboard record
//!
//! Every handler re-checks the admin role against the backend.

use axum::{
    extract::{Path, State},
    response::Redirect,
    Form,
};
use maud::Markup;
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::api::dto::DashboardForm;
use crate::api::error::{OrRedirect, PageError};
use crate::api::extract::CurrentSession;
use crate::api::state::AppState;
use crate::api::views::{self, Viewer};
use crate::authz::ResolveError;
use crate::model::{DashboardId, NewDashboard, Role};
use crate::session::{set_flash, take_flash, Flash, Session};

/// GET /admin
pub async fn page(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    cookies: Cookies,
) -> Result<Markup, PageError> {
    ensure_admin(&state, &session).await?;

    let token = session.access_token.as_str();
    let dashboards = state
        .resolver
        .dashboards_for(token, &session.user.id, Role::Admin)
        .await
        .or_redirect("/dashboards")?;

    let viewer = Viewer {
        user: &session.user,
        role: Role::Admin,
    };
    let pending = take_flash(&cookies);
    Ok(views::admin::render(&viewer, &dashboards, pending.as_slice()))
}

/// POST /admin/dashboards
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    cookies: Cookies,
    Form(form): Form<DashboardForm>,
) -> Result<Redirect, PageError> {
    ensure_admin(&state, &session).await?;

    let dashboard = NewDashboard::from(form)
        .validated()
        .map_err(|e| PageError::new("/admin", e.to_string()))?;

    let created = state
        .backend
        .insert_dashboard(&session.access_token, &dashboard)
        .await
        .or_redirect("/admin")?;

    tracing::info!(
        user_id = %session.user.id,
        dashboard_id = created.id,
        name = %created.name,
        "Dashboard created"
    );
    set_flash(&cookies, Flash::success(format!("Dashboard \"{}\" created", created.name)));
    Ok(Redirect::to("/admin"))
}

/// POST /admin/dashboards/:id/delete
///
/// Grants on the dashboard are removed before the record itself.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<DashboardId>,
    cookies: Cookies,
) -> Result<Redirect, PageError> {
    ensure_admin(&state, &session).await?;

    let token = session.access_token.as_str();
    state
        .backend
        .revoke_dashboard_permissions(token, id)
        .await
        .or_redirect("/admin")?;
    state.backend.delete_dashboard(token, id).await.or_redirect("/admin")?;

    tracing::info!(user_id = %session.user.id, dashboard_id = id, "Dashboard deleted");
    set_flash(&cookies, Flash::success("Dashboard deleted"));
    Ok(Redirect::to("/admin"))
}

/// Admin gate shared by the admin and permissions pages
pub(crate) async fn ensure_admin(state: &AppState, session: &Session) -> Result<(), PageError> {
    match state
        .resolver
        .require_admin(&session.access_token, &session.user.id)
        .await
    {
        Ok(()) => Ok(()),
        Err(ResolveError::Forbidden) => Err(PageError::new(
            "/dashboards",
            "Access restricted to administrators",
        )),
        Err(e) => Err::<(), _>(e).or_redirect("/dashboards"),
    }
}
