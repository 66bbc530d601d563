use keyshare_application::PostEntry;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for writing or editing a post.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "post-body-request.ts")]
pub struct PostBodyRequest {
    pub body: String,
}

/// API representation of a post.
///
/// The surrogate fields are only filled in for the account holder.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "post-response.ts")]
pub struct PostResponse {
    pub post_id: String,
    pub account_id: String,
    pub body: String,
    pub created_by_surrogate: Option<String>,
    pub updated_by_surrogate: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PostEntry> for PostResponse {
    fn from(entry: PostEntry) -> Self {
        let (created_by_surrogate, updated_by_surrogate) = entry
            .attribution
            .map(|attribution| (Some(attribution.created_by), Some(attribution.updated_by)))
            .unwrap_or_default();

        Self {
            post_id: entry.post.id().to_string(),
            account_id: entry.post.account_id().to_string(),
            body: entry.post.body().to_owned(),
            created_by_surrogate,
            updated_by_surrogate,
            created_at: entry.post.created_at().to_rfc3339(),
            updated_at: entry.post.updated_at().to_rfc3339(),
        }
    }
}
