use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use keyshare_core::AppError;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::auth::{bearer_token, session_token};
use crate::error::ApiResult;
use crate::state::AppState;

/// Verifies the caller's session token and exposes its claims to handlers.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = session_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let claims = state.session_issuer.verify(&token).await?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Guards administration routes with the configured static token.
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("admin token required".to_owned()))?;

    if !admin_token_matches(&state.admin_token_digest, &presented) {
        return Err(AppError::Unauthorized("invalid admin token".to_owned()).into());
    }

    Ok(next.run(request).await)
}

/// Digest of the administration token kept in [`AppState`].
#[must_use]
pub fn admin_token_digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

fn admin_token_matches(expected_digest: &[u8; 32], presented: &str) -> bool {
    let presented_digest = admin_token_digest(presented);

    expected_digest[..].ct_eq(&presented_digest[..]).into()
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if is_state_changing_method(request.method()) {
        let headers = request.headers();

        if let Some(fetch_site) = headers.get("sec-fetch-site")
            && fetch_site == HeaderValue::from_static("cross-site")
        {
            return Err(AppError::Unauthorized("cross-site request blocked".to_owned()).into());
        }

        if !is_allowed_origin(headers, &state.frontend_url) {
            return Err(AppError::Unauthorized("origin validation failed".to_owned()).into());
        }
    }

    Ok(next.run(request).await)
}

/// Returns whether the request's `Origin` or `Referer` points at the frontend.
pub fn is_allowed_origin(headers: &HeaderMap, allowed_origin: &str) -> bool {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    origin == allowed_origin || referer.starts_with(allowed_origin)
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
