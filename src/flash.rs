use axum::http::{HeaderMap, HeaderValue};

use crate::{
    guard::AccessDenied,
    models::{Notification, Role},
    session::find_cookie,
};

/// Cookie carrying a pending denial notice across the redirect to the login page.
pub const FLASH_COOKIE: &str = "edu_flash";

/// Seconds a flash cookie survives if no view consumes it.
pub const FLASH_MAX_AGE: u64 = 60;

/// Short-lived cookie naming the role a denied navigation required. Holding only the role tag
/// keeps the value ASCII; the message is rebuilt from it on the next render. Anonymous visitors
/// get their notice without a stored session.
pub fn set_cookie(denied: &AccessDenied) -> Option<HeaderValue> {
    let cookie = format!(
        "{FLASH_COOKIE}={}; Path=/; Max-Age={FLASH_MAX_AGE}; HttpOnly; SameSite=Lax",
        denied.required
    );
    HeaderValue::from_str(&cookie).ok()
}

/// Expires the flash cookie once its notice has been shown.
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("edu_flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// The role recorded by a pending flash cookie. Unparseable values are ignored.
pub fn read(headers: &HeaderMap) -> Option<Role> {
    find_cookie(headers, FLASH_COOKIE).and_then(|value| value.parse().ok())
}

/// Rebuilds the denial notice for `required`.
pub fn notice(required: Role) -> Notification {
    Notification::error(AccessDenied { required }.to_string())
}
