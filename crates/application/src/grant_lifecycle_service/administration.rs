use tracing::info;

use super::*;
use crate::DeactivationReport;

impl GrantLifecycleService {
    /// Switches off every active grant and parent relation of an account.
    pub async fn deactivate_for_user(&self, user_id: UserId) -> AppResult<DeactivationReport> {
        if self.user_directory.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound("account not found".to_owned()));
        }

        let report = self
            .grant_store
            .deactivate_for_owner(user_id, self.clock.now())
            .await?;

        info!(
            user_id = %user_id,
            grants = report.grants,
            relations = report.relations,
            "deactivated shared access for account"
        );

        Ok(report)
    }

    /// Switches off grants past their redemption window and relations past
    /// their time allowance.
    pub async fn deactivate_lapsed(&self) -> AppResult<DeactivationReport> {
        self.grant_store.deactivate_lapsed(self.clock.now()).await
    }
}
