use keyshare_core::SessionClaims;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload that starts a passkey ceremony.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "passkey-start-request.ts")]
pub struct PasskeyStartRequest {
    pub email: String,
}

/// Claims of the caller's current session.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "session-response.ts")]
pub struct SessionResponse {
    /// Account the session acts upon.
    pub subject: String,
    /// Account of the person actually signed in.
    pub surrogate: String,
    /// Guest relation backing a delegated session.
    pub relation_id: Option<String>,
    pub is_primary_holder: bool,
    /// Present when the session was just issued.
    pub expires_at: Option<String>,
}

impl SessionResponse {
    pub fn from_claims(claims: &SessionClaims) -> Self {
        Self {
            subject: claims.subject().to_string(),
            surrogate: claims.surrogate().to_string(),
            relation_id: claims.grant().map(|relation_id| relation_id.to_string()),
            is_primary_holder: claims.is_primary_holder(),
            expires_at: None,
        }
    }
}
