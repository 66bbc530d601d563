use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use keyshare_core::{AppError, GrantId, SessionClaims, UserId};
use tower_sessions::Session;

use crate::dto::{
    BeginGrantApprovalRequest, BeginGrantApprovalResponse, GrantSummaryResponse,
    InitializeShareRequest, RedemptionQuery, RelationResponse, ShareInvitationResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod approval;
mod share;

pub use approval::{
    begin_create_account_with_grant_handler, finish_create_account_with_grant_handler,
};
pub use share::{initialize_share_handler, redemption_check_handler};
