//! The refresh-credential cookie.

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::Duration;

pub const REFRESH_COOKIE: &str = "refresh_token";

/// Scoped to the auth endpoints so the credential never rides along on
/// ordinary API calls.
pub const REFRESH_COOKIE_PATH: &str = "/auth";

const CLEAR: &str = "refresh_token=; HttpOnly; SameSite=Strict; Path=/auth; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT";
const CLEAR_SECURE: &str =
    "refresh_token=; HttpOnly; Secure; SameSite=Strict; Path=/auth; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

pub fn set_refresh_cookie(token: &str, max_age: Duration, secure: bool) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    let value = format!(
        "{REFRESH_COOKIE}={token}; HttpOnly{secure}; SameSite=Strict; Path={REFRESH_COOKIE_PATH}; Max-Age={}",
        max_age.num_seconds().max(0)
    );
    HeaderValue::from_str(&value).ok()
}

pub fn clear_refresh_cookie(secure: bool) -> HeaderValue {
    HeaderValue::from_static(if secure { CLEAR_SECURE } else { CLEAR })
}

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
