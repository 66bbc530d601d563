use keyshare_domain::AccessGrant;

use super::*;

impl GrantLifecycleService {
    /// Checks a grant id and token without changing anything.
    ///
    /// Missing grants, inactive grants and wrong tokens all produce the same
    /// `NotFound` error. A correct token presented after the redemption
    /// window produces `Expired`.
    pub async fn redeem(&self, grant_id: GrantId, token: &str) -> AppResult<AccessGrant> {
        let grant = self
            .grant_store
            .find_grant(grant_id)
            .await?
            .filter(AccessGrant::is_active);

        let Some(grant) = grant else {
            // Spend the same hashing effort as a real comparison.
            let _ = self.secret_hasher.hash_secret(token);
            return Err(grant_not_found());
        };

        if !self.secret_hasher.verify_secret(token, grant.token_hash())? {
            return Err(grant_not_found());
        }

        if grant.is_expired(self.clock.now()) {
            return Err(grant_expired());
        }

        Ok(grant)
    }
}
