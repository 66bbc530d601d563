//! Session token transport: bearer header or HTTP-only cookie.

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use keyshare_core::AppError;
use tower_sessions::cookie::time::{Duration, OffsetDateTime};
use tower_sessions::cookie::{Cookie, SameSite};

/// Cookie carrying the signed session token.
pub const SESSION_COOKIE_NAME: &str = "keyshare_session";

/// Returns the token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// Returns the session token, preferring the bearer header over the cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

/// Builds the `Set-Cookie` value for a freshly issued session.
pub fn session_cookie(
    token: &str,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> Result<HeaderValue, AppError> {
    let expires = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()).map_err(|error| {
        AppError::Internal(format!("invalid session expiry timestamp: {error}"))
    })?;

    let cookie = Cookie::build((SESSION_COOKIE_NAME, token.to_owned()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .expires(expires)
        .build();

    encode_cookie(&cookie)
}

/// Builds the `Set-Cookie` value that removes the session cookie.
pub fn cleared_session_cookie(secure: bool) -> Result<HeaderValue, AppError> {
    let cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build();

    encode_cookie(&cookie)
}

fn encode_cookie(cookie: &Cookie<'_>) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|error| AppError::Internal(format!("failed to encode session cookie: {error}")))
}
