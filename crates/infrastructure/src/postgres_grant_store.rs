//! PostgreSQL-backed grant store.
//!
//! Grants and relations keep their expiry policy as the flag/companion
//! column pairs `expire_by_time`/`minutes_allowed` and
//! `expire_by_logins`/`logins_allowed`. A partial unique index keeps at most
//! one active relation per parent and guest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyshare_application::{DeactivationReport, GrantStore};
use keyshare_core::{AppError, AppResult, GrantId, RelationId, UserId};
use keyshare_domain::{
    AccessGrant, ExpiryPolicy, GuestRelation, StoredAccessGrant, StoredGuestRelation,
};
use sqlx::PgPool;

mod claim;
mod deactivation;
mod grants;
mod relations;

/// PostgreSQL implementation of the grant store port.
#[derive(Clone)]
pub struct PostgresGrantStore {
    pool: PgPool,
}

impl PostgresGrantStore {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccessGrantRow {
    id: uuid::Uuid,
    owner_id: uuid::Uuid,
    token_hash: String,
    ttl_seconds: i64,
    expire_by_time: bool,
    minutes_allowed: Option<i64>,
    expire_by_logins: bool,
    logins_allowed: Option<i64>,
    is_active: bool,
    claimed_by: Option<uuid::Uuid>,
    relation_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccessGrantRow> for AccessGrant {
    type Error = AppError;

    fn try_from(row: AccessGrantRow) -> AppResult<Self> {
        AccessGrant::try_from(StoredAccessGrant {
            id: GrantId::from_uuid(row.id),
            owner_id: UserId::from_uuid(row.owner_id),
            token_hash: row.token_hash,
            ttl_seconds: row.ttl_seconds,
            policy: ExpiryPolicy::from_parts(
                row.expire_by_time,
                row.minutes_allowed,
                row.expire_by_logins,
                row.logins_allowed,
            )?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            claimed_by: row.claimed_by.map(UserId::from_uuid),
            relation_id: row.relation_id.map(RelationId::from_uuid),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GuestRelationRow {
    id: uuid::Uuid,
    parent_id: uuid::Uuid,
    guest_id: uuid::Uuid,
    grant_id: uuid::Uuid,
    expire_by_time: bool,
    minutes_allowed: Option<i64>,
    expire_by_logins: bool,
    logins_allowed: Option<i64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GuestRelationRow> for GuestRelation {
    type Error = AppError;

    fn try_from(row: GuestRelationRow) -> AppResult<Self> {
        GuestRelation::try_from(StoredGuestRelation {
            id: RelationId::from_uuid(row.id),
            parent_id: UserId::from_uuid(row.parent_id),
            guest_id: UserId::from_uuid(row.guest_id),
            grant_id: GrantId::from_uuid(row.grant_id),
            policy: ExpiryPolicy::from_parts(
                row.expire_by_time,
                row.minutes_allowed,
                row.expire_by_logins,
                row.logins_allowed,
            )?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Policy columns in bind order.
struct PolicyColumns {
    expire_by_time: bool,
    minutes_allowed: Option<i64>,
    expire_by_logins: bool,
    logins_allowed: Option<i64>,
}

impl From<ExpiryPolicy> for PolicyColumns {
    fn from(policy: ExpiryPolicy) -> Self {
        Self {
            expire_by_time: policy.expire_by_time(),
            minutes_allowed: policy.minutes_allowed().map(i64::from),
            expire_by_logins: policy.expire_by_logins(),
            logins_allowed: policy.logins_allowed().map(i64::from),
        }
    }
}

const GRANT_COLUMNS: &str = "id, owner_id, token_hash, ttl_seconds, expire_by_time, \
     minutes_allowed, expire_by_logins, logins_allowed, is_active, claimed_by, relation_id, \
     created_at, updated_at";

const RELATION_COLUMNS: &str = "id, parent_id, guest_id, grant_id, expire_by_time, \
     minutes_allowed, expire_by_logins, logins_allowed, is_active, created_at, updated_at";

fn relations_from_rows(rows: Vec<GuestRelationRow>) -> AppResult<Vec<GuestRelation>> {
    rows.into_iter().map(GuestRelation::try_from).collect()
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(database_error) if database_error.code().as_deref() == Some("23505")
    )
}

fn pair_conflict_or_internal(error: sqlx::Error, operation: &str) -> AppError {
    if is_unique_violation(&error) {
        return AppError::Conflict("guest already has access to this account".to_owned());
    }

    AppError::Internal(format!("failed to {operation}: {error}"))
}

#[async_trait]
impl GrantStore for PostgresGrantStore {
    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        self.find_grant_impl(grant_id).await
    }

    async fn create_grant(&self, grant: &AccessGrant) -> AppResult<()> {
        self.create_grant_impl(grant).await
    }

    async fn update_grant(&self, grant: &AccessGrant) -> AppResult<()> {
        self.update_grant_impl(grant).await
    }

    async fn find_relation(&self, relation_id: RelationId) -> AppResult<Option<GuestRelation>> {
        self.find_relation_impl(relation_id).await
    }

    async fn update_relation(&self, relation: &GuestRelation) -> AppResult<()> {
        self.update_relation_impl(relation).await
    }

    async fn relations_by_guest(&self, guest_id: UserId) -> AppResult<Vec<GuestRelation>> {
        self.relations_by_guest_impl(guest_id).await
    }

    async fn relations_by_parent(&self, parent_id: UserId) -> AppResult<Vec<GuestRelation>> {
        self.relations_by_parent_impl(parent_id).await
    }

    async fn find_active_relation(
        &self,
        parent_id: UserId,
        guest_id: UserId,
    ) -> AppResult<Option<GuestRelation>> {
        self.find_active_relation_impl(parent_id, guest_id).await
    }

    async fn claim_grant(&self, claimed: &AccessGrant, relation: &GuestRelation) -> AppResult<()> {
        self.claim_grant_impl(claimed, relation).await
    }

    async fn deactivate_for_owner(
        &self,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<DeactivationReport> {
        self.deactivate_for_owner_impl(owner_id, now).await
    }

    async fn deactivate_lapsed(&self, now: DateTime<Utc>) -> AppResult<DeactivationReport> {
        self.deactivate_lapsed_impl(now).await
    }
}

#[cfg(test)]
mod tests;
