use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyshare_core::{AppResult, UserId};
use keyshare_domain::EmailAddress;

/// Account record returned by directory queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Canonical email address.
    pub email: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

/// Repository port for account lookups.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds an account by identifier.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Finds an account by email (case-insensitive).
    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<UserRecord>>;

    /// Creates an account, returning `Conflict` when the email is taken.
    async fn create_user(&self, email: &EmailAddress) -> AppResult<UserRecord>;
}
