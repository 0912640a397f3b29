//! Root view switcher
//!
//! - GET / - Send the visitor to the login, admin or user view

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::api::error::OrRedirect;
use crate::api::extract::session_from_cookies;
use crate::api::state::AppState;
use crate::model::Role;

/// GET /
///
/// No session → `/login`; admin → `/admin`; anyone else → `/dashboards`.
pub async fn index(State(state): State<Arc<AppState>>, cookies: Cookies) -> Response {
    let Some(session) = session_from_cookies(&state, &cookies).await else {
        return Redirect::to("/login").into_response();
    };

    let role = state
        .resolver
        .resolve_role(&session.access_token, &session.user.id)
        .await
        .or_redirect("/dashboards");

    match role {
        Ok(Role::Admin) => Redirect::to("/admin").into_response(),
        Ok(Role::User) => Redirect::to("/dashboards").into_response(),
        Err(e) => e.into_response(),
    }
}
