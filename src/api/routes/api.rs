//! JSON API Routes
//!
//! - POST /api/v1/auth/login - Exchange credentials for an access token
//! - GET /api/v1/me - Current user and role
//! - GET /api/v1/dashboards - Dashboards visible to the caller

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{
    DashboardListResponse, DashboardResponse, LoginRequest, LoginResponse, MeResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiCaller;
use crate::api::state::AppState;

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let auth = state.backend.sign_in(email, &request.password).await?;
    if let Err(e) = state
        .backend
        .ensure_profile(&auth.access_token, &auth.user)
        .await
    {
        tracing::warn!(user_id = %auth.user.id, error = %e, "Could not create user profile");
    }

    let role = state
        .resolver
        .resolve_role(&auth.access_token, &auth.user.id)
        .await?;

    tracing::info!(user_id = %auth.user.id, role = %role, "API sign-in");

    Ok(Json(LoginResponse {
        access_token: auth.access_token,
        expires_in: auth.expires_in,
        user: auth.user,
        role,
    }))
}

/// GET /api/v1/me
pub async fn me(State(state): State<Arc<AppState>>, caller: ApiCaller) -> ApiResult<Json<MeResponse>> {
    let role = state
        .resolver
        .resolve_role(&caller.access_token, &caller.user.id)
        .await?;

    Ok(Json(MeResponse {
        user: caller.user,
        role,
    }))
}

/// GET /api/v1/dashboards
pub async fn dashboards(
    State(state): State<Arc<AppState>>,
    caller: ApiCaller,
) -> ApiResult<Json<DashboardListResponse>> {
    let visibility = state
        .resolver
        .visible_dashboards(&caller.access_token, &caller.user.id)
        .await?;

    let dashboards: Vec<DashboardResponse> = visibility
        .dashboards
        .into_iter()
        .map(DashboardResponse::from)
        .collect();

    Ok(Json(DashboardListResponse {
        role: visibility.role,
        total: dashboards.len(),
        dashboards,
    }))
}
