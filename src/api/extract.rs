//! Request extractors
//!
//! - [`CurrentSession`]: the browser session behind the session cookie
//! - [`ApiCaller`]: a JSON API caller, by bearer token or session cookie

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tower_cookies::Cookies;

use super::error::{ApiError, PageError};
use super::state::AppState;
use crate::model::User;
use crate::session::{Session, SESSION_COOKIE};

/// Look up the session named by the request's cookie
pub async fn session_from_cookies(state: &AppState, cookies: &Cookies) -> Option<Session> {
    let cookie = cookies.get(SESSION_COOKIE)?;
    state.sessions.get(cookie.value()).await
}

/// Signed-in browser session; anonymous visitors are sent to `/login`
pub struct CurrentSession(pub Session);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentSession {
    type Rejection = PageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|_| PageError::login_required())?;

        session_from_cookies(state, &cookies)
            .await
            .map(CurrentSession)
            .ok_or_else(PageError::login_required)
    }
}

/// Authenticated JSON API caller
pub struct ApiCaller {
    pub user: User,
    pub access_token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ApiCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(&parts.headers) {
            let user = state.backend.current_user(token).await?;
            return Ok(ApiCaller {
                user,
                access_token: token.to_string(),
            });
        }

        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::Internal(msg.to_string()))?;

        session_from_cookies(state, &cookies)
            .await
            .map(|session| ApiCaller {
                user: session.user,
                access_token: session.access_token,
            })
            .ok_or_else(|| {
                ApiError::Unauthorized("Sign in or send a bearer token".to_string())
            })
    }
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  xyz "));
        assert_eq!(bearer_token(&headers), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
