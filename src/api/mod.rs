//! BI Portal HTTP layer
//!
//! Server-rendered pages plus a small JSON API, built with Axum.
//!
//! # Pages
//!
//! - `GET /` - Send the visitor to login, admin or dashboards
//! - `GET /login`, `POST /login` - Sign in
//! - `POST /signup` - Create an account
//! - `POST /logout` - Sign out
//! - `GET /dashboards` - Dashboards visible to the user
//! - `GET /dashboards/:id` - One embedded dashboard
//! - `GET /admin` - Dashboard records (admins only)
//! - `POST /admin/dashboards` - Create a dashboard record
//! - `POST /admin/dashboards/:id/delete` - Delete a dashboard record
//! - `GET /admin/permissions`, `POST /admin/permissions` - Grant matrix
//!
//! # JSON API
//!
//! - `POST /api/v1/auth/login` - Exchange credentials for a token
//! - `GET /api/v1/me` - Current user and role
//! - `GET /api/v1/dashboards` - Visible dashboards
//!
//! # Health
//!
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status

pub mod dto;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod views;

pub use error::{ApiError, ApiResult, PageError};
pub use state::AppState;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let page_routes = Router::new()
        .route("/", get(routes::root::index))
        .route("/login", get(routes::auth::login_page).post(routes::auth::login))
        .route("/signup", post(routes::auth::signup))
        .route("/logout", post(routes::auth::logout))
        .route("/dashboards", get(routes::dashboards::list))
        .route("/dashboards/:id", get(routes::dashboards::detail))
        .route("/admin", get(routes::admin::page))
        .route("/admin/dashboards", post(routes::admin::create))
        .route("/admin/dashboards/:id/delete", post(routes::admin::delete))
        .route(
            "/admin/permissions",
            get(routes::permissions::page).post(routes::permissions::update),
        );

    let api_routes = Router::new()
        .route("/auth/login", post(routes::api::login))
        .route("/me", get(routes::api::me))
        .route("/dashboards", get(routes::api::dashboards))
        .layer(cors_layer(&state.config));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .merge(page_routes)
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(axum::middleware::from_fn_with_state(
            shared_state.clone(),
            middleware::forget_rejected_sessions,
        ))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// CORS for the JSON API; no configured origins means same-origin only
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Start the HTTP server
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("BI Portal listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("BI Portal shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
