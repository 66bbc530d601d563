use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use keyshare_core::{AppError, UserId};
use tower_sessions::Session;
use webauthn_rs::prelude::{
    Passkey, PasskeyAuthentication, PasskeyRegistration, PublicKeyCredential,
    RegisterPublicKeyCredential,
};

use crate::dto::PasskeyStartRequest;
use crate::error::ApiResult;
use crate::state::AppState;

use super::request_context::extract_request_context;
use super::session::issued_session_response;
use super::session_cookie::session_token;
use super::{SESSION_WEBAUTHN_AUTH_STATE_KEY, SESSION_WEBAUTHN_REG_STATE_KEY};

/// Loads and decodes every passkey enrolled for an account.
pub async fn load_passkeys(state: &AppState, user_id: UserId) -> Result<Vec<Passkey>, AppError> {
    let passkey_json_values = state.passkey_repository.list_for_user(user_id).await?;

    passkey_json_values
        .into_iter()
        .map(|passkey_json| {
            serde_json::from_str::<Passkey>(&passkey_json)
                .map_err(|error| AppError::Internal(format!("failed to decode passkey: {error}")))
        })
        .collect()
}

pub async fn webauthn_registration_start_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
    Json(payload): Json<PasskeyStartRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let ensured = state
        .account_service
        .ensure_account(payload.email.as_str())
        .await?;
    let account = ensured.account;

    let stored_passkeys = load_passkeys(&state, account.id).await?;
    if !stored_passkeys.is_empty() {
        require_own_primary_session(&state, &headers, account.id).await?;
    }

    let exclude_credentials = (!stored_passkeys.is_empty()).then(|| {
        stored_passkeys
            .iter()
            .map(|passkey| passkey.cred_id().clone())
            .collect()
    });

    let (creation_challenge_response, reg_state) = state
        .webauthn
        .start_passkey_registration(
            account.id.as_uuid(),
            &account.email,
            &account.email,
            exclude_credentials,
        )
        .map_err(|error| {
            AppError::Internal(format!("failed to start passkey registration: {error}"))
        })?;

    session
        .insert(SESSION_WEBAUTHN_REG_STATE_KEY, (account.id, reg_state))
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist registration state: {error}"))
        })?;

    Ok(Json(
        serde_json::to_value(creation_challenge_response).map_err(|error| {
            AppError::Internal(format!("failed to encode registration challenge: {error}"))
        })?,
    ))
}

pub async fn webauthn_registration_finish_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
    Json(payload): Json<RegisterPublicKeyCredential>,
) -> ApiResult<Response> {
    let (user_id, reg_state): (UserId, PasskeyRegistration) = session
        .get(SESSION_WEBAUTHN_REG_STATE_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read registration state: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("missing registration state".to_owned()))?;

    session
        .remove_value(SESSION_WEBAUTHN_REG_STATE_KEY)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to clear registration state: {error}"))
        })?;

    let passkey = state
        .webauthn
        .finish_passkey_registration(&payload, &reg_state)
        .map_err(|error| {
            AppError::Unauthorized(format!("passkey registration verification failed: {error}"))
        })?;

    let passkey_json = serde_json::to_string(&passkey)
        .map_err(|error| AppError::Internal(format!("failed to serialize passkey: {error}")))?;

    state
        .passkey_repository
        .insert_for_user(user_id, passkey_json.as_str())
        .await?;

    let issued = state
        .account_service
        .start_session(user_id, extract_request_context(&headers))
        .await?;

    issued_session_response(&state, &issued)
}

pub async fn webauthn_login_start_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<PasskeyStartRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let account = state
        .account_service
        .find_by_email(payload.email.as_str())
        .await?
        .ok_or_else(no_passkeys_enrolled)?;

    let passkeys = load_passkeys(&state, account.id).await?;
    if passkeys.is_empty() {
        return Err(no_passkeys_enrolled().into());
    }

    let (request_challenge_response, auth_state) = state
        .webauthn
        .start_passkey_authentication(&passkeys)
        .map_err(|error| AppError::Internal(format!("failed to start passkey login: {error}")))?;

    session
        .insert(
            SESSION_WEBAUTHN_AUTH_STATE_KEY,
            (account.id, passkeys, auth_state),
        )
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist auth state: {error}")))?;

    Ok(Json(
        serde_json::to_value(request_challenge_response).map_err(|error| {
            AppError::Internal(format!(
                "failed to encode authentication challenge: {error}"
            ))
        })?,
    ))
}

pub async fn webauthn_login_finish_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
    Json(payload): Json<PublicKeyCredential>,
) -> ApiResult<Response> {
    let (user_id, mut passkeys, auth_state): (UserId, Vec<Passkey>, PasskeyAuthentication) =
        session
            .get(SESSION_WEBAUTHN_AUTH_STATE_KEY)
            .await
            .map_err(|error| AppError::Internal(format!("failed to read auth state: {error}")))?
            .ok_or_else(|| AppError::Unauthorized("missing authentication state".to_owned()))?;

    session
        .remove_value(SESSION_WEBAUTHN_AUTH_STATE_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear auth state: {error}")))?;

    let auth_result = state
        .webauthn
        .finish_passkey_authentication(&payload, &auth_state)
        .map_err(|error| {
            AppError::Unauthorized(format!(
                "passkey authentication verification failed: {error}"
            ))
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
        .replace_for_user(user_id, serialized_passkeys.as_slice())
        .await?;

    let issued = state
        .account_service
        .start_session(user_id, extract_request_context(&headers))
        .await?;

    issued_session_response(&state, &issued)
}

// Adding a passkey to an enrolled account needs that account's own session.
async fn require_own_primary_session(
    state: &AppState,
    headers: &HeaderMap,
    user_id: UserId,
) -> Result<(), AppError> {
    let already_registered =
        || AppError::Conflict("account is already registered; sign in to add a passkey".to_owned());

    let token = session_token(headers).ok_or_else(already_registered)?;
    let claims = state
        .session_issuer
        .verify(&token)
        .await
        .map_err(|_| already_registered())?;

    if !claims.is_primary_holder() || claims.subject() != user_id {
        return Err(already_registered());
    }

    Ok(())
}

fn no_passkeys_enrolled() -> AppError {
    AppError::Unauthorized("no passkeys enrolled for account".to_owned())
}
