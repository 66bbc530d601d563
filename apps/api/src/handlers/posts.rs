use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use keyshare_application::PostEntry;
use keyshare_core::{PostId, SessionClaims};

use crate::dto::{PostBodyRequest, PostResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_posts_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let posts = state
        .post_service
        .list_posts(&claims)
        .await?
        .into_iter()
        .map(PostResponse::from)
        .collect();

    Ok(Json(posts))
}

/// Writes a post on the session's account, attributed to its surrogate.
pub async fn create_post_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(payload): Json<PostBodyRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let post = state
        .post_service
        .create_post(&claims, &payload.body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PostResponse::from(PostEntry {
            post,
            attribution: None,
        })),
    ))
}

pub async fn update_post_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(post_id): Path<String>,
    Json(payload): Json<PostBodyRequest>,
) -> ApiResult<Json<PostResponse>> {
    let post_id = PostId::parse(&post_id)?;
    let post = state
        .post_service
        .update_post(&claims, post_id, &payload.body)
        .await?;

    Ok(Json(PostResponse::from(PostEntry {
        post,
        attribution: None,
    })))
}

pub async fn remove_post_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(post_id): Path<String>,
) -> ApiResult<StatusCode> {
    let post_id = PostId::parse(&post_id)?;
    state.post_service.remove_post(&claims, post_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
