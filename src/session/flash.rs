//! Transient messages
//!
//! A flash is written to a cookie by the request that produced it and
//! consumed by the next page render, which shows it as a toast that
//! dismisses itself.

use tower_cookies::{Cookie, Cookies};

/// Name of the flash cookie
pub const FLASH_COOKIE: &str = "biportal_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        }
    }
}

/// A one-shot user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// How long the toast stays on screen
    pub fn dismiss_after_ms(&self) -> u64 {
        match self.kind {
            FlashKind::Success => 3000,
            FlashKind::Error => 5000,
        }
    }

    /// Cookie-safe encoding: `<kind>:<percent-encoded message>`
    pub fn encode(&self) -> String {
        format!("{}:{}", self.kind.as_str(), urlencoding::encode(&self.message))
    }

    pub fn decode(value: &str) -> Option<Self> {
        let (kind, message) = value.split_once(':')?;
        let kind = match kind {
            "success" => FlashKind::Success,
            "error" => FlashKind::Error,
            _ => return None,
        };
        let message = urlencoding::decode(message).ok()?.into_owned();
        Some(Self { kind, message })
    }

    pub fn cookie(&self) -> Cookie<'static> {
        Cookie::build((FLASH_COOKIE, self.encode()))
            .path("/")
            .http_only(true)
            .build()
    }
}

/// Queue a flash for the next page
pub fn set_flash(cookies: &Cookies, flash: Flash) {
    cookies.add(flash.cookie());
}

/// Take the pending flash, if any
pub fn take_flash(cookies: &Cookies) -> Option<Flash> {
    let cookie = cookies.get(FLASH_COOKIE)?;
    let flash = Flash::decode(cookie.value());
    cookies.remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());
    flash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let flash = Flash::error("Invalid login credentials; try again");
        let encoded = flash.encode();
        assert!(!encoded.contains(' '));
        assert!(!encoded.contains(';'));
        assert_eq!(Flash::decode(&encoded), Some(flash));

        assert_eq!(Flash::decode("weird:x"), None);
        assert_eq!(Flash::decode("no-separator"), None);
    }

    #[test]
    fn test_dismiss_timing() {
        assert_eq!(Flash::success("ok").dismiss_after_ms(), 3000);
        assert_eq!(Flash::error("no").dismiss_after_ms(), 5000);
    }
}
