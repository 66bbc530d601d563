use keyshare_application::BeginShareInput;

use super::*;

pub async fn initialize_share_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(payload): Json<InitializeShareRequest>,
) -> ApiResult<(StatusCode, Json<ShareInvitationResponse>)> {
    let policy = payload.policy()?;

    let invitation = state
        .grant_lifecycle
        .begin_share(
            &claims,
            BeginShareInput {
                policy,
                recipient_email: payload.recipient_email,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ShareInvitationResponse {
            grant: GrantSummaryResponse::from(&invitation.grant),
            token: invitation.token,
            redemption_url: invitation.redemption_url,
        }),
    ))
}

/// Checks a redemption link without consuming it.
pub async fn redemption_check_handler(
    State(state): State<AppState>,
    Path(grant_id): Path<String>,
    Query(query): Query<RedemptionQuery>,
) -> ApiResult<Json<GrantSummaryResponse>> {
    let grant_id = GrantId::parse(&grant_id)?;
    let grant = state
        .grant_lifecycle
        .redeem(grant_id, query.token.as_str())
        .await?;

    Ok(Json(GrantSummaryResponse::from(&grant)))
}
