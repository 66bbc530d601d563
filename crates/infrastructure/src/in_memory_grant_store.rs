//! In-memory grant store for tests and single-process development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyshare_application::{DeactivationReport, GrantStore};
use keyshare_core::{AppError, AppResult, GrantId, RelationId, UserId};
use keyshare_domain::{AccessGrant, GuestRelation};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct GrantTables {
    grants: HashMap<GrantId, AccessGrant>,
    relations: HashMap<RelationId, GuestRelation>,
}

impl GrantTables {
    fn has_active_pair(&self, parent_id: UserId, guest_id: UserId, except: RelationId) -> bool {
        self.relations.values().any(|relation| {
            relation.id() != except && relation.is_active() && relation.links(parent_id, guest_id)
        })
    }
}

/// In-memory grant store. Both tables sit behind one lock, so a claim is
/// atomic with respect to every other operation.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    tables: RwLock<GrantTables>,
}

impl InMemoryGrantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        Ok(self.tables.read().await.grants.get(&grant_id).cloned())
    }

    async fn create_grant(&self, grant: &AccessGrant) -> AppResult<()> {
        grant.validate()?;
        let mut tables = self.tables.write().await;

        if tables.grants.contains_key(&grant.id()) {
            return Err(AppError::Conflict(format!(
                "access grant '{}' already exists",
                grant.id()
            )));
        }

        tables.grants.insert(grant.id(), grant.clone());
        Ok(())
    }

    async fn update_grant(&self, grant: &AccessGrant) -> AppResult<()> {
        grant.validate()?;
        let mut tables = self.tables.write().await;

        let Some(stored) = tables.grants.get_mut(&grant.id()) else {
            return Err(AppError::NotFound("access grant not found".to_owned()));
        };

        *stored = grant.clone();
        Ok(())
    }

    async fn find_relation(&self, relation_id: RelationId) -> AppResult<Option<GuestRelation>> {
        Ok(self.tables.read().await.relations.get(&relation_id).cloned())
    }

    async fn update_relation(&self, relation: &GuestRelation) -> AppResult<()> {
        relation.validate()?;
        let mut tables = self.tables.write().await;

        if !tables.relations.contains_key(&relation.id()) {
            return Err(AppError::NotFound("guest relation not found".to_owned()));
        }

        if relation.is_active()
            && tables.has_active_pair(relation.parent_id(), relation.guest_id(), relation.id())
        {
            return Err(AppError::Conflict(
                "guest already has access to this account".to_owned(),
            ));
        }

        tables.relations.insert(relation.id(), relation.clone());
        Ok(())
    }

    async fn relations_by_guest(&self, guest_id: UserId) -> AppResult<Vec<GuestRelation>> {
        let tables = self.tables.read().await;
        let mut relations: Vec<GuestRelation> = tables
            .relations
            .values()
            .filter(|relation| relation.guest_id() == guest_id)
            .cloned()
            .collect();
        relations.sort_by_key(GuestRelation::created_at);
        Ok(relations)
    }

    async fn relations_by_parent(&self, parent_id: UserId) -> AppResult<Vec<GuestRelation>> {
        let tables = self.tables.read().await;
        let mut relations: Vec<GuestRelation> = tables
            .relations
            .values()
            .filter(|relation| relation.parent_id() == parent_id)
            .cloned()
            .collect();
        relations.sort_by_key(GuestRelation::created_at);
        Ok(relations)
    }

    async fn find_active_relation(
        &self,
        parent_id: UserId,
        guest_id: UserId,
    ) -> AppResult<Option<GuestRelation>> {
        Ok(self
            .tables
            .read()
            .await
            .relations
            .values()
            .find(|relation| relation.is_active() && relation.links(parent_id, guest_id))
            .cloned())
    }

    async fn claim_grant(&self, claimed: &AccessGrant, relation: &GuestRelation) -> AppResult<()> {
        claimed.validate()?;
        relation.validate()?;

        if claimed.claimed_by() != Some(relation.guest_id())
            || claimed.relation_id() != Some(relation.id())
            || relation.grant_id() != claimed.id()
        {
            return Err(AppError::Validation(
                "claimed grant and relation do not match".to_owned(),
            ));
        }

        let mut tables = self.tables.write().await;

        if !tables
            .grants
            .get(&claimed.id())
            .is_some_and(AccessGrant::is_active)
        {
            return Err(AppError::NotFound("access grant not found".to_owned()));
        }

        if tables.has_active_pair(relation.parent_id(), relation.guest_id(), relation.id()) {
            return Err(AppError::Conflict(
                "guest already has access to this account".to_owned(),
            ));
        }

        tables.grants.insert(claimed.id(), claimed.clone());
        tables.relations.insert(relation.id(), relation.clone());
        Ok(())
    }

    async fn deactivate_for_owner(
        &self,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<DeactivationReport> {
        let mut tables = self.tables.write().await;
        let mut report = DeactivationReport::default();

        for grant in tables.grants.values_mut() {
            if grant.owner_id() == owner_id && grant.is_active() {
                *grant = grant.clone().deactivated(now);
                report.grants += 1;
            }
        }

        for relation in tables.relations.values_mut() {
            if relation.parent_id() == owner_id && relation.is_active() {
                *relation = relation.clone().deactivated(now);
                report.relations += 1;
            }
        }

        Ok(report)
    }

    async fn deactivate_lapsed(&self, now: DateTime<Utc>) -> AppResult<DeactivationReport> {
        let mut tables = self.tables.write().await;
        let mut report = DeactivationReport::default();

        for grant in tables.grants.values_mut() {
            if grant.is_active() && grant.is_expired(now) {
                *grant = grant.clone().deactivated(now);
                report.grants += 1;
            }
        }

        for relation in tables.relations.values_mut() {
            if relation.is_active() && relation.is_time_exhausted(now) {
                *relation = relation.clone().deactivated(now);
                report.relations += 1;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests;
