use axum::Json;
use axum::extract::{Path, State};
use keyshare_core::UserId;

use crate::dto::{DeactivationResponse, LoginAuditResponse, RelationResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Switches off every active grant and parent relation of an account.
pub async fn deactivate_user_grants_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<DeactivationResponse>> {
    let user_id = UserId::parse(&user_id)?;
    let report = state.grant_lifecycle.deactivate_for_user(user_id).await?;

    Ok(Json(report.into()))
}

pub async fn list_user_relations_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<RelationResponse>>> {
    let user_id = UserId::parse(&user_id)?;
    let relations = state
        .guest_access
        .relations_for_parent(user_id)
        .await?
        .iter()
        .map(RelationResponse::from)
        .collect();

    Ok(Json(relations))
}

pub async fn list_user_logins_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<LoginAuditResponse>>> {
    let user_id = UserId::parse(&user_id)?;
    let logins = state
        .guest_access
        .login_history(user_id)
        .await?
        .into_iter()
        .map(LoginAuditResponse::from)
        .collect();

    Ok(Json(logins))
}
