//! Session housekeeping middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tower_cookies::Cookies;

use super::state::AppState;
use crate::session::SESSION_COOKIE;

/// Response marker set when the backend rejected the session's access token
#[derive(Debug, Clone, Copy)]
pub struct SessionRejected;

/// Drop the stored session once a handler reports its token as rejected
pub async fn forget_rejected_sessions(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if response.extensions().get::<SessionRejected>().is_some() {
        if let Some(cookie) = cookies.get(SESSION_COOKIE) {
            if let Some(session) = state.sessions.remove(cookie.value()).await {
                tracing::info!(user_id = %session.user.id, "Dropped session with rejected token");
            }
        }
    }

    response
}
