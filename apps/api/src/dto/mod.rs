mod access;
mod admin;
mod auth;
mod common;
mod posts;
mod relations;

pub use access::{
    BeginGrantApprovalRequest, BeginGrantApprovalResponse, GrantPolicyResponse,
    GrantSummaryResponse, InitializeShareRequest, RedemptionQuery, ShareInvitationResponse,
};
pub use admin::{DeactivationResponse, LoginAuditResponse};
pub use auth::{PasskeyStartRequest, SessionResponse};
pub use common::{HealthDependencyStatus, HealthResponse};
pub use posts::{PostBodyRequest, PostResponse};
pub use relations::{AssumeRelationRequest, RelationOverviewResponse, RelationResponse};
