//! Authentication Routes
//!
//! - GET /login - Sign-in and sign-up forms
//! - POST /login - Sign in
//! - POST /signup - Create an account
//! - POST /logout - Sign out

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::api::dto::CredentialsForm;
use crate::api::error::PageError;
use crate::api::extract::session_from_cookies;
use crate::api::state::AppState;
use crate::api::views;
use crate::backend::{AuthSession, SignUpOutcome};
use crate::session::{clear_session_cookie, session_cookie, set_flash, take_flash, Flash};

/// GET /login
pub async fn login_page(State(state): State<Arc<AppState>>, cookies: Cookies) -> Response {
    if session_from_cookies(&state, &cookies).await.is_some() {
        return Redirect::to("/").into_response();
    }

    let flash = take_flash(&cookies);
    views::login::render(flash.as_slice()).into_response()
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Form(form): Form<CredentialsForm>,
) -> Result<Redirect, PageError> {
    let (email, password) = form.checked().map_err(|msg| PageError::new("/login", msg))?;

    let auth = state.backend.sign_in(email, password).await.map_err(|e| {
        tracing::info!(email, error = %e, "Sign-in rejected");
        PageError::new("/login", format!("Login failed: {}", e))
    })?;

    open_session(&state, &cookies, auth).await;
    Ok(Redirect::to("/"))
}

/// POST /signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Form(form): Form<CredentialsForm>,
) -> Result<Redirect, PageError> {
    let (email, password) = form.checked().map_err(|msg| PageError::new("/login", msg))?;

    let outcome = state.backend.sign_up(email, password).await.map_err(|e| {
        tracing::info!(email, error = %e, "Sign-up rejected");
        PageError::new("/login", format!("Sign-up failed: {}", e))
    })?;

    match outcome {
        SignUpOutcome::SignedIn(auth) => {
            tracing::info!(user_id = %auth.user.id, "Account created");
            open_session(&state, &cookies, auth).await;
            Ok(Redirect::to("/"))
        }
        SignUpOutcome::ConfirmationRequired(user) => {
            tracing::info!(user_id = %user.id, "Account created, awaiting email confirmation");
            set_flash(
                &cookies,
                Flash::success("Account created. Check your email to confirm it, then sign in."),
            );
            Ok(Redirect::to("/login"))
        }
    }
}

/// POST /logout
///
/// The local session is always dropped; a backend failure is only reported.
pub async fn logout(State(state): State<Arc<AppState>>, cookies: Cookies) -> Redirect {
    let session = match cookies.get(crate::session::SESSION_COOKIE) {
        Some(cookie) => state.sessions.remove(cookie.value()).await,
        None => None,
    };
    cookies.remove(clear_session_cookie());

    let flash = match session {
        Some(session) => match state.backend.sign_out(&session.access_token).await {
            Ok(()) => Flash::success("Signed out"),
            Err(e) => {
                tracing::warn!(user_id = %session.user.id, error = %e, "Backend sign-out failed");
                Flash::error(format!("Signed out locally, but the server reported: {}", e))
            }
        },
        None => Flash::success("Signed out"),
    };

    set_flash(&cookies, flash);
    Redirect::to("/login")
}

/// Accounts created by sign-up or outside the portal get a profile without a
/// role on first sign-in, so that admins can grant them dashboards
async fn open_session(state: &AppState, cookies: &Cookies, auth: AuthSession) {
    if let Err(e) = state
        .backend
        .ensure_profile(&auth.access_token, &auth.user)
        .await
    {
        tracing::warn!(user_id = %auth.user.id, error = %e, "Could not create user profile");
    }

    let session = state.sessions.create(auth.user, auth.access_token).await;
    cookies.add(session_cookie(&session.id, state.config.cookie_secure));
}
