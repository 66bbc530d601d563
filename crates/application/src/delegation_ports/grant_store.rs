use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyshare_core::{AppResult, GrantId, RelationId, UserId};
use keyshare_domain::{AccessGrant, GuestRelation};

/// Counts of rows switched off by a deactivation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeactivationReport {
    /// Grants set inactive.
    pub grants: u64,
    /// Relations set inactive.
    pub relations: u64,
}

impl DeactivationReport {
    /// Returns whether nothing was deactivated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants == 0 && self.relations == 0
    }
}

/// Persistence port for access grants and guest relations.
///
/// Every mutation validates grant and relation invariants before anything
/// is written and fails with `Validation` otherwise.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Finds a grant by identifier.
    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>>;

    /// Stores a new grant.
    async fn create_grant(&self, grant: &AccessGrant) -> AppResult<()>;

    /// Replaces a stored grant.
    async fn update_grant(&self, grant: &AccessGrant) -> AppResult<()>;

    /// Finds a relation by identifier.
    async fn find_relation(&self, relation_id: RelationId) -> AppResult<Option<GuestRelation>>;

    /// Replaces a stored relation.
    async fn update_relation(&self, relation: &GuestRelation) -> AppResult<()>;

    /// Lists every relation where the account is the guest.
    async fn relations_by_guest(&self, guest_id: UserId) -> AppResult<Vec<GuestRelation>>;

    /// Lists every relation where the account is the parent.
    async fn relations_by_parent(&self, parent_id: UserId) -> AppResult<Vec<GuestRelation>>;

    /// Finds the active relation linking a parent and guest.
    async fn find_active_relation(
        &self,
        parent_id: UserId,
        guest_id: UserId,
    ) -> AppResult<Option<GuestRelation>>;

    /// Atomically stores a claimed grant together with its new relation.
    ///
    /// Fails with `NotFound` when the stored grant is missing or no longer
    /// active, and with `Conflict` when the pair already has an active
    /// relation. Nothing is written on failure.
    async fn claim_grant(&self, claimed: &AccessGrant, relation: &GuestRelation) -> AppResult<()>;

    /// Deactivates every active grant and parent relation of an account.
    async fn deactivate_for_owner(
        &self,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<DeactivationReport>;

    /// Deactivates grants past their redemption window and time-bounded
    /// relations past their allowance.
    async fn deactivate_lapsed(&self, now: DateTime<Utc>) -> AppResult<DeactivationReport>;
}
