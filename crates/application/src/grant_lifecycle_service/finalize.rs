use keyshare_domain::AccessGrant;
use tracing::info;

use super::*;

impl GrantLifecycleService {
    /// Loads an active, unexpired grant owned by `owner_id`.
    pub async fn owned_active_grant(
        &self,
        grant_id: GrantId,
        owner_id: UserId,
    ) -> AppResult<AccessGrant> {
        let grant = self
            .grant_store
            .find_grant(grant_id)
            .await?
            .filter(AccessGrant::is_active)
            .ok_or_else(grant_not_found)?;

        if grant.is_expired(self.clock.now()) {
            return Err(grant_expired());
        }

        if grant.owner_id() != owner_id {
            return Err(AppError::Forbidden(
                "only the grant owner can approve it".to_owned(),
            ));
        }

        Ok(grant)
    }

    /// Turns a grant into a guest relation.
    ///
    /// All checks run again here; the claim itself is a single atomic store
    /// operation, so concurrent calls for one grant produce one relation.
    pub async fn finalize(
        &self,
        grant_id: GrantId,
        parent_id: UserId,
        guest_id: UserId,
    ) -> AppResult<GuestRelation> {
        let grant = self.owned_active_grant(grant_id, parent_id).await?;

        if guest_id == parent_id {
            return Err(AppError::Validation(
                "guest and parent must be different accounts".to_owned(),
            ));
        }

        if self.user_directory.find_user(guest_id).await?.is_none() {
            return Err(AppError::NotFound("guest account not found".to_owned()));
        }

        if self
            .grant_store
            .find_active_relation(parent_id, guest_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "guest already has access to this account".to_owned(),
            ));
        }

        let now = self.clock.now();
        let relation = GuestRelation::from_grant(&grant, guest_id, now)?;
        let claimed = grant.claimed(guest_id, relation.id(), now);

        self.grant_store.claim_grant(&claimed, &relation).await?;

        info!(
            grant_id = %grant_id,
            relation_id = %relation.id(),
            parent_id = %parent_id,
            guest_id = %guest_id,
            "access grant finalized"
        );

        Ok(relation)
    }
}
