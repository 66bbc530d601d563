use webauthn_rs::prelude::{Passkey, PasskeyAuthentication, PublicKeyCredential};

use super::*;
use crate::auth::load_passkeys;

const SESSION_GRANT_APPROVAL_STATE_KEY: &str = "grant_approval_state";

type ApprovalState = (GrantId, UserId, UserId, Vec<Passkey>, PasskeyAuthentication);

/// Starts the holder's passkey assertion that approves a guest for a grant.
pub async fn begin_create_account_with_grant_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    session: Session,
    Json(payload): Json<BeginGrantApprovalRequest>,
) -> ApiResult<Json<BeginGrantApprovalResponse>> {
    let holder_id = claims.require_primary_holder()?;
    let grant_id = GrantId::parse(&payload.grant_id)?;
    let guest_id = UserId::parse(&payload.guest_id)?;

    let grant = state
        .grant_lifecycle
        .owned_active_grant(grant_id, holder_id)
        .await?;
    state.account_service.find_account(guest_id).await?;

    let passkeys = load_passkeys(&state, holder_id).await?;
    if passkeys.is_empty() {
        return Err(
            AppError::Unauthorized("no passkeys enrolled for account".to_owned()).into(),
        );
    }

    let (request_challenge_response, auth_state) = state
        .webauthn
        .start_passkey_authentication(&passkeys)
        .map_err(|error| {
            AppError::Internal(format!("failed to start grant approval: {error}"))
        })?;

    let approval: ApprovalState = (grant_id, guest_id, holder_id, passkeys, auth_state);
    session
        .insert(SESSION_GRANT_APPROVAL_STATE_KEY, approval)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist approval state: {error}")))?;

    let options = serde_json::to_value(request_challenge_response).map_err(|error| {
        AppError::Internal(format!("failed to encode approval challenge: {error}"))
    })?;

    Ok(Json(BeginGrantApprovalResponse {
        options,
        grant: GrantSummaryResponse::from(&grant),
        guest_id: guest_id.to_string(),
    }))
}

/// Verifies the holder's assertion and turns the grant into a guest relation.
pub async fn finish_create_account_with_grant_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    session: Session,
    Json(payload): Json<PublicKeyCredential>,
) -> ApiResult<(StatusCode, Json<RelationResponse>)> {
    let (grant_id, guest_id, holder_id, mut passkeys, auth_state): ApprovalState = session
        .get(SESSION_GRANT_APPROVAL_STATE_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read approval state: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("missing approval state".to_owned()))?;

    session
        .remove_value(SESSION_GRANT_APPROVAL_STATE_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear approval state: {error}")))?;

    if claims.require_primary_holder()? != holder_id {
        return Err(AppError::Forbidden(
            "approval was started by another account".to_owned(),
        )
        .into());
    }

    let auth_result = state
        .webauthn
        .finish_passkey_authentication(&payload, &auth_state)
        .map_err(|error| {
            AppError::Unauthorized(format!("grant approval verification failed: {error}"))
        })?;

    passkeys.iter_mut().for_each(|passkey| {
        passkey.update_credential(&auth_result);
    });

    let serialized_passkeys = passkeys
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<String>, _>>()
        .map_err(|error| AppError::Internal(format!("failed to serialize passkeys: {error}")))?;

    state
        .passkey_repository
        .replace_for_user(holder_id, serialized_passkeys.as_slice())
        .await?;

    let relation = state
        .grant_lifecycle
        .finalize(grant_id, holder_id, guest_id)
        .await?;

    Ok((StatusCode::CREATED, Json(RelationResponse::from(&relation))))
}
