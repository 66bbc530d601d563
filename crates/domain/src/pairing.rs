//! Wire types for the realtime pairing protocol.
//!
//! The transport [`Envelope`] and the application [`ProtocolPayload`] are
//! separate types; an envelope carries either a protocol payload or raw
//! client text, never a payload re-encoded as a string.

use keyshare_core::UserId;
use serde::{Deserialize, Serialize};

/// Side of a pairing a connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingRole {
    /// Owner of the grant being activated.
    Holder,
    /// Person receiving delegated access.
    Guest,
}

impl PairingRole {
    /// Returns the stable role label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Holder => "holder",
            Self::Guest => "guest",
        }
    }
}

/// Protocol event codes exchanged during pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PairingCode {
    /// The connection was admitted.
    ConnectedSession,
    /// Holder and guest are both connected.
    AllPartiesPresent,
    /// Tells the holder it is the primary account holder.
    IsPrimaryAccountHolder,
    /// Contact metadata for the counterpart.
    ClientInformation,
    /// Either side refuses the pairing.
    DenyGrant,
    /// Guest asks the holder for approval.
    ConfirmGrant,
    /// Approval prompt forwarded to the holder.
    InitializeGrantConfirm,
    /// Holder approves activation.
    FinalizeGrantConfirm,
    /// The guest relation was created.
    AccessGrantSuccess,
    /// Activation failed.
    AccessGrantFailed,
    /// The counterpart disconnected.
    PartyDisconnected,
    /// The connection could not join the pairing.
    PairingRejected,
    /// The pairing sat idle for too long.
    PairingTimedOut,
    /// A control action was sent out of turn or by the wrong side.
    ProtocolViolation,
}

impl PairingCode {
    /// Returns the code name as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectedSession => "ConnectedSession",
            Self::AllPartiesPresent => "AllPartiesPresent",
            Self::IsPrimaryAccountHolder => "IsPrimaryAccountHolder",
            Self::ClientInformation => "ClientInformation",
            Self::DenyGrant => "DenyGrant",
            Self::ConfirmGrant => "ConfirmGrant",
            Self::InitializeGrantConfirm => "InitializeGrantConfirm",
            Self::FinalizeGrantConfirm => "FinalizeGrantConfirm",
            Self::AccessGrantSuccess => "AccessGrantSuccess",
            Self::AccessGrantFailed => "AccessGrantFailed",
            Self::PartyDisconnected => "PartyDisconnected",
            Self::PairingRejected => "PairingRejected",
            Self::PairingTimedOut => "PairingTimedOut",
            Self::ProtocolViolation => "ProtocolViolation",
        }
    }
}

/// Control actions a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingAction {
    /// Refuse the pairing.
    Deny,
    /// Guest requests approval.
    Confirm,
    /// Holder approves activation.
    Finalize,
}

impl PairingAction {
    /// Recognizes a control action in raw client text.
    ///
    /// Accepts either the bare code name or a JSON object with a `code`
    /// field. Anything else is ordinary chat content.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let code = serde_json::from_str::<ClientControl>(trimmed)
            .map(|control| control.code)
            .ok()
            .or_else(|| serde_json::from_value(serde_json::Value::String(trimmed.to_owned())).ok())?;

        match code {
            PairingCode::DenyGrant => Some(Self::Deny),
            PairingCode::ConfirmGrant => Some(Self::Confirm),
            PairingCode::FinalizeGrantConfirm => Some(Self::Finalize),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ClientControl {
    code: PairingCode,
}

/// Contact metadata describing a connected party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    /// Account of the connected party.
    pub user_id: UserId,
    /// Account email, when known.
    pub email: Option<String>,
    /// Remote address reported by the proxy.
    pub ip_address: Option<String>,
    /// Browser user agent.
    pub user_agent: Option<String>,
}

/// Application-level protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolPayload {
    /// Event code.
    pub code: PairingCode,
    /// Human-readable detail.
    pub message: String,
    /// Counterpart metadata for [`PairingCode::ClientInformation`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientMetadata>,
}

impl ProtocolPayload {
    /// Creates a payload without client metadata.
    #[must_use]
    pub fn new(code: PairingCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            client: None,
        }
    }

    /// Creates a [`PairingCode::ClientInformation`] payload.
    #[must_use]
    pub fn client_information(client: ClientMetadata) -> Self {
        Self {
            code: PairingCode::ClientInformation,
            message: "counterpart joined the pairing".to_owned(),
            client: Some(client),
        }
    }
}

/// Contents of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopePayload {
    /// Protocol event.
    Protocol(ProtocolPayload),
    /// Raw client text relayed to the other party.
    Text(String),
}

/// Transport envelope sent to a pairing connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Sending account, or `None` for coordinator events.
    pub sender_id: Option<UserId>,
    /// Receiving account, or `None` for broadcasts.
    pub recipient_id: Option<UserId>,
    /// Message contents.
    pub payload: EnvelopePayload,
}

impl Envelope {
    /// Creates a coordinator event addressed to one account.
    #[must_use]
    pub fn protocol(recipient_id: UserId, payload: ProtocolPayload) -> Self {
        Self {
            sender_id: None,
            recipient_id: Some(recipient_id),
            payload: EnvelopePayload::Protocol(payload),
        }
    }

    /// Creates relayed client text.
    #[must_use]
    pub fn relay(sender_id: UserId, text: impl Into<String>) -> Self {
        Self {
            sender_id: Some(sender_id),
            recipient_id: None,
            payload: EnvelopePayload::Text(text.into()),
        }
    }

    /// Returns the protocol code, when the envelope carries one.
    #[must_use]
    pub fn code(&self) -> Option<PairingCode> {
        match &self.payload {
            EnvelopePayload::Protocol(payload) => Some(payload.code),
            EnvelopePayload::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use keyshare_core::UserId;

    use super::{ClientMetadata, Envelope, PairingAction, PairingCode, ProtocolPayload};

    #[test]
    fn actions_parse_from_bare_codes_and_json() {
        assert_eq!(PairingAction::parse("ConfirmGrant"), Some(PairingAction::Confirm));
        assert_eq!(PairingAction::parse("  DenyGrant\n"), Some(PairingAction::Deny));
        assert_eq!(
            PairingAction::parse(r#"{"code":"FinalizeGrantConfirm","message":""}"#),
            Some(PairingAction::Finalize)
        );
        assert_eq!(PairingAction::parse("AccessGrantSuccess"), None);
        assert_eq!(PairingAction::parse("hello there"), None);
    }

    #[test]
    fn protocol_envelope_nests_payload_as_an_object() {
        let recipient = UserId::new();
        let envelope = Envelope::protocol(
            recipient,
            ProtocolPayload::new(PairingCode::ConnectedSession, "connected"),
        );

        let encoded = serde_json::to_value(&envelope).unwrap_or_default();

        assert_eq!(encoded["senderId"], serde_json::Value::Null);
        assert_eq!(encoded["recipientId"], recipient.to_string());
        assert_eq!(encoded["payload"]["code"], "ConnectedSession");
        assert_eq!(encoded["payload"]["message"], "connected");
    }

    #[test]
    fn client_information_carries_metadata() {
        let user_id = UserId::new();
        let payload = ProtocolPayload::client_information(ClientMetadata {
            user_id,
            email: Some("guest@example.com".to_owned()),
            ip_address: None,
            user_agent: Some("test-agent".to_owned()),
        });

        let encoded = serde_json::to_value(&payload).unwrap_or_default();

        assert_eq!(encoded["code"], PairingCode::ClientInformation.as_str());
        assert_eq!(encoded["client"]["email"], "guest@example.com");
        assert_eq!(encoded["client"]["userId"], user_id.to_string());
    }

    #[test]
    fn relayed_text_serializes_as_plain_string() {
        let sender = UserId::new();
        let envelope = Envelope::relay(sender, "hi");

        let encoded = serde_json::to_value(&envelope).unwrap_or_default();

        assert_eq!(encoded["payload"], "hi");
        assert_eq!(encoded["senderId"], sender.to_string());
        assert_eq!(envelope.code(), None);
    }
}
