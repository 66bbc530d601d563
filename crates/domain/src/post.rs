//! Posts written on an account, attributed to the person holding the session.

use chrono::{DateTime, Utc};
use keyshare_core::{AppError, AppResult, PostId, SessionClaims, UserId};

/// Longest post body accepted, in characters.
pub const MAX_POST_BODY_CHARS: usize = 4000;

/// Persisted representation of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPost {
    /// Post identifier.
    pub id: PostId,
    /// Account the post was written on.
    pub account_id: UserId,
    /// Credential holder who wrote the post.
    pub created_by_surrogate: UserId,
    /// Credential holder behind the latest edit.
    pub updated_by_surrogate: UserId,
    /// Post text.
    pub body: String,
    /// Whether the post is still shown.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Post on an account.
///
/// The account is always the session subject. The surrogate columns record
/// who actually wrote or last edited the text, so a holder can tell their own
/// posts from those a guest wrote on their behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    id: PostId,
    account_id: UserId,
    created_by_surrogate: UserId,
    updated_by_surrogate: UserId,
    body: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Post {
    /// Writes a new post on the session's account.
    pub fn write(
        claims: &SessionClaims,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let post = Self {
            id: PostId::new(),
            account_id: claims.subject(),
            created_by_surrogate: claims.surrogate(),
            updated_by_surrogate: claims.surrogate(),
            body: normalize_body(body.into()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        post.validate()?;
        Ok(post)
    }

    /// Checks every post invariant.
    pub fn validate(&self) -> AppResult<()> {
        if self.body.is_empty() {
            return Err(AppError::Validation("post body must not be empty".to_owned()));
        }

        if self.body.chars().count() > MAX_POST_BODY_CHARS {
            return Err(AppError::Validation(format!(
                "post body must not exceed {MAX_POST_BODY_CHARS} characters"
            )));
        }

        if self.updated_at < self.created_at {
            return Err(AppError::Validation(
                "post cannot be updated before it was created".to_owned(),
            ));
        }

        Ok(())
    }

    /// Returns the post identifier.
    #[must_use]
    pub fn id(&self) -> PostId {
        self.id
    }

    /// Returns the account the post belongs to.
    #[must_use]
    pub fn account_id(&self) -> UserId {
        self.account_id
    }

    /// Returns who wrote the post.
    #[must_use]
    pub fn created_by_surrogate(&self) -> UserId {
        self.created_by_surrogate
    }

    /// Returns who made the latest edit.
    #[must_use]
    pub fn updated_by_surrogate(&self) -> UserId {
        self.updated_by_surrogate
    }

    /// Returns the post text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns whether the post is shown.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the session acts on the account this post belongs to.
    #[must_use]
    pub fn is_visible_to(&self, claims: &SessionClaims) -> bool {
        self.is_active && self.account_id == claims.subject()
    }

    /// Replaces the text, attributing the edit to the session's surrogate.
    pub fn revised(
        mut self,
        claims: &SessionClaims,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        if !self.is_visible_to(claims) {
            return Err(AppError::NotFound("post not found".to_owned()));
        }

        self.body = normalize_body(body.into());
        self.updated_by_surrogate = claims.surrogate();
        self.updated_at = now;

        self.validate()?;
        Ok(self)
    }

    /// Hides the post, attributing the removal to the session's surrogate.
    #[must_use]
    pub fn removed(mut self, claims: &SessionClaims, now: DateTime<Utc>) -> Self {
        self.is_active = false;
        self.updated_by_surrogate = claims.surrogate();
        self.updated_at = now;
        self
    }
}

impl TryFrom<StoredPost> for Post {
    type Error = AppError;

    fn try_from(stored: StoredPost) -> AppResult<Self> {
        let post = Self {
            id: stored.id,
            account_id: stored.account_id,
            created_by_surrogate: stored.created_by_surrogate,
            updated_by_surrogate: stored.updated_by_surrogate,
            body: stored.body,
            is_active: stored.is_active,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        };

        post.validate()?;
        Ok(post)
    }
}

fn normalize_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.len() == body.len() {
        body
    } else {
        trimmed.to_owned()
    }
}
