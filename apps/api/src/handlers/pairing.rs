use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use keyshare_application::{PairingParticipant, PairingRegistry};
use keyshare_core::{AppError, GrantId, SessionClaims};
use keyshare_domain::{ClientMetadata, Envelope, PairingCode, PairingRole, ProtocolPayload};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::extract_request_context;
use crate::error::ApiResult;
use crate::middleware::is_allowed_origin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PairingQuery {
    pub token: String,
}

/// Upgrades to the pairing socket for a grant.
///
/// The redemption token and the caller's session are both checked before
/// the upgrade, so failures surface as plain HTTP errors. The grant owner
/// joins as holder; any other account joins as guest.
pub async fn pairing_socket_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(grant_id): Path<String>,
    Query(query): Query<PairingQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    if headers.contains_key(header::ORIGIN) && !is_allowed_origin(&headers, &state.frontend_url) {
        return Err(AppError::Forbidden("websocket origin is not allowed".to_owned()).into());
    }

    let grant_id = GrantId::parse(&grant_id)?;
    let account_id = claims.require_primary_holder().map_err(|_| {
        AppError::Forbidden("guest sessions cannot join a pairing".to_owned())
    })?;

    let grant = state
        .grant_lifecycle
        .redeem(grant_id, query.token.as_str())
        .await?;
    let account = state.account_service.find_account(account_id).await?;

    let role = if grant.owner_id() == account_id {
        PairingRole::Holder
    } else {
        PairingRole::Guest
    };

    let context = extract_request_context(&headers);
    let participant = PairingParticipant {
        role,
        metadata: ClientMetadata {
            user_id: account_id,
            email: Some(account.email),
            ip_address: context.ip_address,
            user_agent: context.user_agent,
        },
    };

    let registry = state.pairing_registry.clone();
    Ok(ws.on_upgrade(move |socket| run_pairing_socket(socket, registry, grant_id, participant)))
}

async fn run_pairing_socket(
    socket: WebSocket,
    registry: PairingRegistry,
    grant_id: GrantId,
    participant: PairingParticipant,
) {
    let (mut sink, mut stream) = socket.split();
    let user_id = participant.metadata.user_id;
    let role = participant.role;

    let connection = match registry.join(grant_id, participant).await {
        Ok(connection) => connection,
        Err(error) => {
            info!(grant_id = %grant_id, role = role.as_str(), %error, "pairing connection rejected");
            let rejection = Envelope::protocol(
                user_id,
                ProtocolPayload::new(PairingCode::PairingRejected, rejection_message(&error)),
            );
            if let Some(text) = encode_envelope(&rejection) {
                let _ = sink.send(Message::Text(text.into())).await;
            }
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    debug!(grant_id = %grant_id, role = role.as_str(), "pairing socket open");
    let (inbound, mut outbound) = connection.split();

    let mut writer = tokio::spawn(async move {
        while let Some(envelope) = outbound.recv().await {
            let Some(text) = encode_envelope(&envelope) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }

        let _ = sink.send(Message::Close(None)).await;
    });

    let mut reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    if !inbound.forward(text.as_str().to_owned()).await {
                        break;
                    }
                }
                Message::Close(_) => break,
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
            }
        }

        inbound.leave().await;
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    debug!(grant_id = %grant_id, role = role.as_str(), "pairing socket closed");
}

fn encode_envelope(envelope: &Envelope) -> Option<String> {
    serde_json::to_string(envelope)
        .map_err(|error| warn!(%error, "failed to encode pairing envelope"))
        .ok()
}

fn rejection_message(error: &AppError) -> &'static str {
    match error {
        AppError::Conflict(_) => "pairing already has a connection for this role",
        _ => "pairing is not available",
    }
}

#[cfg(test)]
mod tests {
    use keyshare_core::AppError;

    use super::rejection_message;

    #[test]
    fn rejections_do_not_leak_internal_details() {
        assert_eq!(
            rejection_message(&AppError::Internal("pool timed out".to_owned())),
            "pairing is not available"
        );
        assert_eq!(
            rejection_message(&AppError::Conflict("pairing already has a holder connection".to_owned())),
            "pairing already has a connection for this role"
        );
    }
}
