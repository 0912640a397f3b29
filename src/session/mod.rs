//! Sessions
//!
//! Explicit per-user session objects replace any process-wide "current
//! user": handlers receive the [`Session`] for the request and pass it on.

mod flash;
mod store;

pub use flash::{set_flash, take_flash, Flash, FlashKind, FLASH_COOKIE};
pub use store::{Session, SessionId, SessionStore};

use tower_cookies::Cookie;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "biportal_session";

/// Cookie carrying a session id
pub fn session_cookie(id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(tower_cookies::cookie::SameSite::Lax)
        .build()
}

/// Cookie that clears the session id
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
