use axum::Json;
use axum::extract::{Extension, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use keyshare_application::IssuedSession;
use keyshare_core::SessionClaims;

use crate::dto::SessionResponse;
use crate::error::ApiResult;
use crate::state::AppState;

use super::session_cookie::{cleared_session_cookie, session_cookie};

/// Sets the session cookie for a newly issued token and describes it.
pub fn issued_session_response(state: &AppState, issued: &IssuedSession) -> ApiResult<Response> {
    let cookie = session_cookie(&issued.token, issued.expires_at, state.cookie_secure)?;

    let mut body = SessionResponse::from_claims(&issued.claims);
    body.expires_at = Some(issued.expires_at.to_rfc3339());

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

pub async fn logout_handler(State(state): State<AppState>) -> ApiResult<Response> {
    let cookie = cleared_session_cookie(state.cookie_secure)?;

    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

pub async fn me_handler(Extension(claims): Extension<SessionClaims>) -> Json<SessionResponse> {
    Json(SessionResponse::from_claims(&claims))
}
