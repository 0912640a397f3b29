//! Dashboard Routes
//!
//! - GET /dashboards - Dashboards visible to the signed-in user
//! - GET /dashboards/:id - One dashboard with its embedded report

use axum::extract::{Path, State};
use maud::Markup;
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::api::error::{OrRedirect, PageError};
use crate::api::extract::CurrentSession;
use crate::api::state::AppState;
use crate::api::views::{self, Viewer};
use crate::authz::ResolveError;
use crate::backend::BackendError;
use crate::model::{DashboardId, Role};
use crate::session::{take_flash, Flash};

/// GET /dashboards
///
/// A failed lookup renders an empty list with the error, never a partial one.
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    cookies: Cookies,
) -> Result<Markup, PageError> {
    let pending = take_flash(&cookies);

    match state
        .resolver
        .visible_dashboards(&session.access_token, &session.user.id)
        .await
    {
        Ok(visibility) => {
            let viewer = Viewer {
                user: &session.user,
                role: visibility.role,
            };
            Ok(views::dashboards::list(&viewer, &visibility.dashboards, pending.as_slice()))
        }
        Err(e @ ResolveError::Backend(BackendError::Unauthorized)) => {
            Err::<Markup, _>(e).or_redirect("/login")
        }
        Err(e) => {
            tracing::warn!(user_id = %session.user.id, error = %e, "Dashboard resolution failed");
            let viewer = Viewer {
                user: &session.user,
                role: Role::User,
            };
            let mut flashes: Vec<Flash> = pending.into_iter().collect();
            flashes.push(Flash::error(format!("Could not load dashboards: {}", e)));
            Ok(views::dashboards::list(&viewer, &[], &flashes))
        }
    }
}

/// GET /dashboards/:id
pub async fn detail(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<DashboardId>,
    cookies: Cookies,
) -> Result<Markup, PageError> {
    let token = session.access_token.as_str();
    let user_id = session.user.id.as_str();

    let role = state
        .resolver
        .resolve_role(token, user_id)
        .await
        .or_redirect("/dashboards")?;

    let dashboard = state
        .resolver
        .dashboard_for_role(token, user_id, role, id)
        .await
        .or_redirect("/dashboards")?
        .ok_or_else(|| {
            tracing::info!(user_id, dashboard_id = id, "Dashboard not visible");
            PageError::new("/dashboards", "Dashboard not found or not shared with you")
        })?;

    let viewer = Viewer {
        user: &session.user,
        role,
    };
    let pending = take_flash(&cookies);
    Ok(views::dashboards::detail(&viewer, &dashboard, pending.as_slice()))
}
