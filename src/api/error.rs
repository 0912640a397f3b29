//! API Error Types
//!
//! Two shapes of failure leave the HTTP layer:
//! - [`ApiError`]: JSON body for `/api/v1` callers
//! - [`PageError`]: redirect plus a flash message for browser pages

use axum::{
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

use super::middleware::SessionRejected;
use crate::authz::ResolveError;
use crate::backend::BackendError;
use crate::session::{clear_session_cookie, Flash};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// No valid session or token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signed in, but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Hosted backend error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Forbidden => {
                ApiError::Forbidden("Access restricted to administrators".to_string())
            }
            ResolveError::Backend(inner) => ApiError::Backend(inner),
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Backend(BackendError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            ApiError::Backend(BackendError::Unavailable) => {
                (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE")
            }
            ApiError::Backend(BackendError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, "BACKEND_TIMEOUT")
            }
            ApiError::Backend(BackendError::Api { status, .. }) if (400..500).contains(status) => {
                // Client-side errors reported by the backend keep their status
                let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST);
                (status, "BACKEND_REJECTED")
            }
            ApiError::Backend(BackendError::UnfilteredDelete(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            ApiError::Backend(_) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// A failed page action: redirect somewhere safe and show a message
#[derive(Debug)]
pub struct PageError {
    pub redirect_to: String,
    pub flash: Flash,
    /// Drop the session cookie as well (the backend rejected the token)
    pub clear_session: bool,
}

impl PageError {
    pub fn new(redirect_to: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            redirect_to: redirect_to.into(),
            flash: Flash::error(message),
            clear_session: false,
        }
    }

    /// Send the visitor to the login form
    pub fn login_required() -> Self {
        Self::new("/login", "Please sign in to continue")
    }

    fn session_expired() -> Self {
        Self {
            clear_session: true,
            ..Self::new("/login", BackendError::Unauthorized.to_string())
        }
    }

    fn from_failure(redirect_to: &str, error: &dyn Display, unauthorized: bool) -> Self {
        if unauthorized {
            tracing::info!("Backend rejected the session token");
            return Self::session_expired();
        }
        tracing::warn!(redirect_to, error = %error, "Page action failed");
        Self::new(redirect_to, error.to_string())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let mut response = Redirect::to(&self.redirect_to).into_response();

        let mut cookies = vec![self.flash.cookie()];
        if self.clear_session {
            response.extensions_mut().insert(SessionRejected);
            let mut removal = clear_session_cookie();
            removal.make_removal();
            cookies.push(removal);
        }

        for cookie in cookies {
            if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }

        response
    }
}

/// Turn backend and resolution failures into [`PageError`]s
pub trait OrRedirect<T> {
    fn or_redirect(self, redirect_to: &str) -> Result<T, PageError>;
}

impl<T> OrRedirect<T> for Result<T, BackendError> {
    fn or_redirect(self, redirect_to: &str) -> Result<T, PageError> {
        self.map_err(|e| {
            let unauthorized = matches!(e, BackendError::Unauthorized);
            PageError::from_failure(redirect_to, &e, unauthorized)
        })
    }
}

impl<T> OrRedirect<T> for Result<T, ResolveError> {
    fn or_redirect(self, redirect_to: &str) -> Result<T, PageError> {
        self.map_err(|e| {
            let unauthorized = matches!(e, ResolveError::Backend(BackendError::Unauthorized));
            PageError::from_failure(redirect_to, &e, unauthorized)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Backend(BackendError::Unauthorized), StatusCode::UNAUTHORIZED),
            (ApiError::Backend(BackendError::Unavailable), StatusCode::SERVICE_UNAVAILABLE),
            (
                ApiError::Backend(BackendError::Api {
                    status: 400,
                    message: "Invalid login credentials".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Backend(BackendError::Api {
                    status: 500,
                    message: "boom".into(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::from(ResolveError::Forbidden), StatusCode::FORBIDDEN),
            (
                ApiError::Backend(BackendError::UnfilteredDelete("dashboards".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_page_error_redirects_with_flash() {
        let response = PageError::new("/admin", "Dashboard name cannot be empty").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/admin");

        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].to_str().unwrap().starts_with("biportal_flash=error:"));
    }

    #[test]
    fn test_unauthorized_clears_session() {
        let result: Result<(), BackendError> = Err(BackendError::Unauthorized);
        let error = result.or_redirect("/admin").unwrap_err();
        assert_eq!(error.redirect_to, "/login");
        assert!(error.clear_session);

        let response = error.into_response();
        let cookies: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("biportal_session=")));
        assert!(response.extensions().get::<SessionRejected>().is_some());
    }
}
