use keyshare_application::{DeactivationReport, LoginAuditRecord};
use serde::Serialize;
use ts_rs::TS;

/// Counts of rows switched off by an administrator pass.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "deactivation-response.ts")]
pub struct DeactivationResponse {
    pub grants: u64,
    pub relations: u64,
}

impl From<DeactivationReport> for DeactivationResponse {
    fn from(report: DeactivationReport) -> Self {
        Self {
            grants: report.grants,
            relations: report.relations,
        }
    }
}

/// API representation of one audited login.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "login-audit-response.ts")]
pub struct LoginAuditResponse {
    pub id: i64,
    pub account_id: String,
    pub surrogate_id: String,
    pub relation_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl From<LoginAuditRecord> for LoginAuditResponse {
    fn from(record: LoginAuditRecord) -> Self {
        Self {
            id: record.id,
            account_id: record.account_id.to_string(),
            surrogate_id: record.surrogate_id.to_string(),
            relation_id: record.relation_id.map(|relation_id| relation_id.to_string()),
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}
