use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use keyshare_core::{RelationId, SessionClaims};

use crate::auth::{extract_request_context, issued_session_response};
use crate::dto::{AssumeRelationRequest, RelationOverviewResponse, RelationResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_guest_relations_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<Vec<RelationResponse>>> {
    let relations = state
        .guest_access
        .relations_as_guest(&claims)
        .await?
        .iter()
        .map(RelationResponse::from)
        .collect();

    Ok(Json(relations))
}

pub async fn list_parent_relations_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<Vec<RelationResponse>>> {
    let relations = state
        .guest_access
        .relations_as_parent(&claims)
        .await?
        .iter()
        .map(RelationResponse::from)
        .collect();

    Ok(Json(relations))
}

pub async fn relation_overview_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<RelationOverviewResponse>> {
    let overview = state.guest_access.overview(&claims).await?;
    Ok(Json(overview.into()))
}

/// Swaps the caller's session for a delegated one on the parent account.
pub async fn assume_relation_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    headers: HeaderMap,
    Json(payload): Json<AssumeRelationRequest>,
) -> ApiResult<Response> {
    let relation_id = RelationId::parse(&payload.relation_id)?;

    let issued = state
        .guest_access
        .assume_relation(&claims, relation_id, extract_request_context(&headers))
        .await?;

    issued_session_response(&state, &issued)
}

/// Returns a guest to a session on their own account.
pub async fn release_relation_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let issued = state
        .guest_access
        .release_relation(&claims, extract_request_context(&headers))
        .await?;

    issued_session_response(&state, &issued)
}

pub async fn revoke_relation_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(relation_id): Path<String>,
) -> ApiResult<Json<RelationResponse>> {
    let relation_id = RelationId::parse(&relation_id)?;
    let revoked = state
        .guest_access
        .revoke_relation(&claims, relation_id)
        .await?;

    Ok(Json(RelationResponse::from(&revoked)))
}
