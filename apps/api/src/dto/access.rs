use keyshare_core::AppResult;
use keyshare_domain::{AccessGrant, ExpiryPolicy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Expiry policy in its flag-and-allowance wire form.
#[derive(Debug, Clone, Copy, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "grant-policy-response.ts")]
pub struct GrantPolicyResponse {
    pub expire_by_time: bool,
    pub minutes_allowed: Option<u32>,
    pub expire_by_logins: bool,
    pub logins_allowed: Option<u32>,
}

impl From<ExpiryPolicy> for GrantPolicyResponse {
    fn from(policy: ExpiryPolicy) -> Self {
        Self {
            expire_by_time: policy.expire_by_time(),
            minutes_allowed: policy.minutes_allowed(),
            expire_by_logins: policy.expire_by_logins(),
            logins_allowed: policy.logins_allowed(),
        }
    }
}

/// Incoming payload for sharing the caller's account.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "initialize-share-request.ts")]
pub struct InitializeShareRequest {
    #[serde(default)]
    pub expire_by_time: bool,
    pub minutes_allowed: Option<i64>,
    #[serde(default)]
    pub expire_by_logins: bool,
    pub logins_allowed: Option<i64>,
    pub recipient_email: Option<String>,
}

impl InitializeShareRequest {
    pub fn policy(&self) -> AppResult<ExpiryPolicy> {
        ExpiryPolicy::from_parts(
            self.expire_by_time,
            self.minutes_allowed,
            self.expire_by_logins,
            self.logins_allowed,
        )
    }
}

/// A new grant with its one-time redemption token.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "share-invitation-response.ts")]
pub struct ShareInvitationResponse {
    pub grant: GrantSummaryResponse,
    pub token: String,
    pub redemption_url: String,
}

/// Public view of a grant; never includes the token hash.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "grant-summary-response.ts")]
pub struct GrantSummaryResponse {
    pub grant_id: String,
    pub owner_id: String,
    pub created_at: String,
    pub expires_at: String,
    pub policy: GrantPolicyResponse,
}

impl From<&AccessGrant> for GrantSummaryResponse {
    fn from(grant: &AccessGrant) -> Self {
        Self {
            grant_id: grant.id().to_string(),
            owner_id: grant.owner_id().to_string(),
            created_at: grant.created_at().to_rfc3339(),
            expires_at: grant.expires_at().to_rfc3339(),
            policy: grant.policy().into(),
        }
    }
}

/// Query string carrying a redemption token.
#[derive(Debug, Deserialize)]
pub struct RedemptionQuery {
    pub token: String,
}

/// Holder approval of a specific guest for a grant.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "begin-grant-approval-request.ts")]
pub struct BeginGrantApprovalRequest {
    pub grant_id: String,
    pub guest_id: String,
}

/// Passkey challenge for approving a grant, plus the grant being approved.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "begin-grant-approval-response.ts")]
pub struct BeginGrantApprovalResponse {
    #[ts(type = "unknown")]
    pub options: serde_json::Value,
    pub grant: GrantSummaryResponse,
    pub guest_id: String,
}
