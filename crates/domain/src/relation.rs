//! Standing guest relations created from claimed grants.

use chrono::{DateTime, Duration, Utc};
use keyshare_core::{AppError, AppResult, GrantId, RelationId, UserId};

use crate::{AccessGrant, ExpiryPolicy};

/// Persisted representation of a guest relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGuestRelation {
    /// Relation identifier.
    pub id: RelationId,
    /// Account whose access is shared.
    pub parent_id: UserId,
    /// Account that receives access.
    pub guest_id: UserId,
    /// Grant the relation was created from.
    pub grant_id: GrantId,
    /// Expiry policy copied from the grant.
    pub policy: ExpiryPolicy,
    /// Whether the guest can still assume the parent account.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Standing permission for a guest to act on a parent account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestRelation {
    id: RelationId,
    parent_id: UserId,
    guest_id: UserId,
    grant_id: GrantId,
    policy: ExpiryPolicy,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GuestRelation {
    /// Creates an active relation from a grant, copying its expiry policy.
    pub fn from_grant(grant: &AccessGrant, guest_id: UserId, now: DateTime<Utc>) -> AppResult<Self> {
        let relation = Self {
            id: RelationId::new(),
            parent_id: grant.owner_id(),
            guest_id,
            grant_id: grant.id(),
            policy: grant.policy(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        relation.validate()?;
        Ok(relation)
    }

    /// Checks every relation invariant.
    pub fn validate(&self) -> AppResult<()> {
        self.policy.validate()?;

        if self.parent_id == self.guest_id {
            return Err(AppError::Validation(
                "guest and parent must be different accounts".to_owned(),
            ));
        }

        Ok(())
    }

    /// Returns the relation identifier.
    #[must_use]
    pub fn id(&self) -> RelationId {
        self.id
    }

    /// Returns the account whose access is shared.
    #[must_use]
    pub fn parent_id(&self) -> UserId {
        self.parent_id
    }

    /// Returns the account that receives access.
    #[must_use]
    pub fn guest_id(&self) -> UserId {
        self.guest_id
    }

    /// Returns the originating grant.
    #[must_use]
    pub fn grant_id(&self) -> GrantId {
        self.grant_id
    }

    /// Returns the copied expiry policy.
    #[must_use]
    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Returns whether the relation is active.
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

    /// Returns whether the relation links the given parent and guest.
    #[must_use]
    pub fn links(&self, parent_id: UserId, guest_id: UserId) -> bool {
        self.parent_id == parent_id && self.guest_id == guest_id
    }

    /// Returns when time-bounded access runs out.
    #[must_use]
    pub fn time_allowance_ends_at(&self) -> Option<DateTime<Utc>> {
        self.policy
            .minutes_allowed()
            .map(|minutes| self.created_at + Duration::minutes(i64::from(minutes)))
    }

    /// Returns whether time-bounded access has run out.
    #[must_use]
    pub fn is_time_exhausted(&self, now: DateTime<Utc>) -> bool {
        self.time_allowance_ends_at()
            .is_some_and(|ends_at| now >= ends_at)
    }

    /// Returns whether login-bounded access has been used up.
    #[must_use]
    pub fn is_login_exhausted(&self, guest_logins: i64) -> bool {
        self.policy
            .logins_allowed()
            .is_some_and(|allowed| guest_logins >= i64::from(allowed))
    }

    /// Returns the relation marked inactive.
    #[must_use]
    pub fn deactivated(mut self, now: DateTime<Utc>) -> Self {
        self.is_active = false;
        self.updated_at = now;
        self
    }
}

impl TryFrom<StoredGuestRelation> for GuestRelation {
    type Error = AppError;

    fn try_from(stored: StoredGuestRelation) -> AppResult<Self> {
        let relation = Self {
            id: stored.id,
            parent_id: stored.parent_id,
            guest_id: stored.guest_id,
            grant_id: stored.grant_id,
            policy: stored.policy,
            is_active: stored.is_active,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        };

        relation.validate()?;
        Ok(relation)
    }
}
