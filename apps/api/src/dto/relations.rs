use keyshare_application::RelationOverview;
use keyshare_domain::GuestRelation;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::GrantPolicyResponse;

/// API representation of a guest relation.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "relation-response.ts")]
pub struct RelationResponse {
    pub relation_id: String,
    pub parent_id: String,
    pub guest_id: String,
    pub grant_id: String,
    pub is_active: bool,
    pub policy: GrantPolicyResponse,
    pub time_allowance_ends_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&GuestRelation> for RelationResponse {
    fn from(relation: &GuestRelation) -> Self {
        Self {
            relation_id: relation.id().to_string(),
            parent_id: relation.parent_id().to_string(),
            guest_id: relation.guest_id().to_string(),
            grant_id: relation.grant_id().to_string(),
            is_active: relation.is_active(),
            policy: relation.policy().into(),
            time_allowance_ends_at: relation
                .time_allowance_ends_at()
                .map(|ends_at| ends_at.to_rfc3339()),
            created_at: relation.created_at().to_rfc3339(),
            updated_at: relation.updated_at().to_rfc3339(),
        }
    }
}

/// Whether the caller has relations on either side.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "relation-overview-response.ts")]
pub struct RelationOverviewResponse {
    pub has_guest_grants: bool,
    pub has_parent_grants: bool,
}

impl From<RelationOverview> for RelationOverviewResponse {
    fn from(overview: RelationOverview) -> Self {
        Self {
            has_guest_grants: overview.has_guest_grants,
            has_parent_grants: overview.has_parent_grants,
        }
    }
}

/// Incoming payload for starting a guest session.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "assume-relation-request.ts")]
pub struct AssumeRelationRequest {
    pub relation_id: String,
}
