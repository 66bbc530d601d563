//! Guest-side use of standing relations: listing, assuming and releasing
//! delegated sessions, and revocation by the parent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use keyshare_core::{AppError, AppResult, RelationId, SessionClaims, UserId};
use keyshare_domain::GuestRelation;
use tracing::info;

use crate::{
    Clock, DelegatedSessionIssuer, GrantStore, IssuedSession, LoginAuditRecord,
    LoginAuditRepository, LoginContext, NewLoginAudit,
};

/// Whether the caller takes part in any active relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationOverview {
    /// Caller is the guest of at least one active relation.
    pub has_guest_grants: bool,
    /// Caller is the parent of at least one active relation.
    pub has_parent_grants: bool,
}

/// Application service for guest relations after activation.
#[derive(Clone)]
pub struct GuestAccessService {
    grant_store: Arc<dyn GrantStore>,
    login_audit: Arc<dyn LoginAuditRepository>,
    session_issuer: DelegatedSessionIssuer,
    clock: Arc<dyn Clock>,
}

impl GuestAccessService {
    /// Creates a new guest access service.
    #[must_use]
    pub fn new(
        grant_store: Arc<dyn GrantStore>,
        login_audit: Arc<dyn LoginAuditRepository>,
        session_issuer: DelegatedSessionIssuer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            grant_store,
            login_audit,
            session_issuer,
            clock,
        }
    }

    /// Lists active relations where the credential holder is the guest.
    pub async fn relations_as_guest(&self, claims: &SessionClaims) -> AppResult<Vec<GuestRelation>> {
        let mut relations = self
            .grant_store
            .relations_by_guest(claims.surrogate())
            .await?;
        relations.retain(GuestRelation::is_active);
        Ok(relations)
    }

    /// Lists active relations on the caller's own account.
    pub async fn relations_as_parent(
        &self,
        claims: &SessionClaims,
    ) -> AppResult<Vec<GuestRelation>> {
        let parent_id = claims.require_primary_holder()?;
        let mut relations = self.grant_store.relations_by_parent(parent_id).await?;
        relations.retain(GuestRelation::is_active);
        Ok(relations)
    }

    /// Reports whether the caller has guest or parent relations.
    pub async fn overview(&self, claims: &SessionClaims) -> AppResult<RelationOverview> {
        let has_guest_grants = !self.relations_as_guest(claims).await?.is_empty();
        let has_parent_grants = if claims.is_primary_holder() {
            !self.relations_as_parent(claims).await?.is_empty()
        } else {
            false
        };

        Ok(RelationOverview {
            has_guest_grants,
            has_parent_grants,
        })
    }

    /// Starts a delegated session on the parent account of a relation.
    ///
    /// A relation whose time or login allowance has run out is switched off
    /// and `Expired` is returned instead of a session.
    pub async fn assume_relation(
        &self,
        claims: &SessionClaims,
        relation_id: RelationId,
        context: LoginContext,
    ) -> AppResult<IssuedSession> {
        let guest_id = claims.require_primary_holder().map_err(|_| {
            AppError::Forbidden("end the current guest session first".to_owned())
        })?;

        let relation = self
            .grant_store
            .find_relation(relation_id)
            .await?
            .filter(GuestRelation::is_active)
            .ok_or_else(|| AppError::NotFound("guest relation not found".to_owned()))?;

        if relation.guest_id() != guest_id {
            return Err(AppError::Forbidden(
                "guest relation belongs to another account".to_owned(),
            ));
        }

        let now = self.clock.now();
        if relation.is_time_exhausted(now) {
            return Err(self.switch_off_exhausted(relation, now).await);
        }

        let entry = NewLoginAudit {
            account_id: relation.parent_id(),
            surrogate_id: guest_id,
            relation_id: Some(relation_id),
            context,
        };
        let reserved = self
            .login_audit
            .reserve_relation_login(entry, relation.policy().logins_allowed(), now)
            .await?;
        if !reserved {
            return Err(self.switch_off_exhausted(relation, now).await);
        }

        let session = self
            .session_issuer
            .issue(relation.parent_id(), guest_id, Some(relation_id))
            .await?;

        info!(
            relation_id = %relation_id,
            parent_id = %relation.parent_id(),
            guest_id = %guest_id,
            "guest session started"
        );

        Ok(session)
    }

    async fn switch_off_exhausted(&self, relation: GuestRelation, now: DateTime<Utc>) -> AppError {
        let relation_id = relation.id();
        if let Err(error) = self
            .grant_store
            .update_relation(&relation.deactivated(now))
            .await
        {
            return error;
        }

        info!(relation_id = %relation_id, "guest relation allowance exhausted");
        AppError::Expired("guest access allowance has been used up".to_owned())
    }

    /// Ends a delegated session and returns the guest to their own account.
    pub async fn release_relation(
        &self,
        claims: &SessionClaims,
        context: LoginContext,
    ) -> AppResult<IssuedSession> {
        if claims.is_primary_holder() {
            return Err(AppError::Forbidden(
                "session is not a guest session".to_owned(),
            ));
        }

        let surrogate = claims.surrogate();
        let session = self.session_issuer.issue(surrogate, surrogate, None).await?;

        self.login_audit
            .record_login(
                NewLoginAudit::for_claims(&session.claims, context),
                self.clock.now(),
            )
            .await?;

        Ok(session)
    }

    /// Lets a parent switch off one of their relations.
    pub async fn revoke_relation(
        &self,
        claims: &SessionClaims,
        relation_id: RelationId,
    ) -> AppResult<GuestRelation> {
        let parent_id = claims.require_primary_holder()?;

        let relation = self
            .grant_store
            .find_relation(relation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("guest relation not found".to_owned()))?;

        if relation.parent_id() != parent_id {
            return Err(AppError::Forbidden(
                "only the parent account can revoke guest access".to_owned(),
            ));
        }

        let revoked = relation.deactivated(self.clock.now());
        self.grant_store.update_relation(&revoked).await?;

        info!(relation_id = %relation_id, parent_id = %parent_id, "guest relation revoked");

        Ok(revoked)
    }

    /// Lists every relation of an account as parent, active or not.
    pub async fn relations_for_parent(&self, parent_id: UserId) -> AppResult<Vec<GuestRelation>> {
        self.grant_store.relations_by_parent(parent_id).await
    }

    /// Lists login audit entries involving an account.
    pub async fn login_history(&self, user_id: UserId) -> AppResult<Vec<LoginAuditRecord>> {
        self.login_audit.list_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests;
