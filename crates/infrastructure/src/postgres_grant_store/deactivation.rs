use super::*;

impl PostgresGrantStore {
    pub(super) async fn deactivate_for_owner_impl(
        &self,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<DeactivationReport> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin deactivation transaction: {error}"))
        })?;

        let grants = sqlx::query(
            r#"
            UPDATE access_grants
            SET is_active = FALSE, updated_at = $2
            WHERE owner_id = $1 AND is_active
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(now)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to deactivate grants: {error}")))?
        .rows_affected();

        let relations = sqlx::query(
            r#"
            UPDATE guest_relations
            SET is_active = FALSE, updated_at = $2
            WHERE parent_id = $1 AND is_active
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(now)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to deactivate relations: {error}")))?
        .rows_affected();

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit deactivation transaction: {error}"))
        })?;

        Ok(DeactivationReport { grants, relations })
    }

    pub(super) async fn deactivate_lapsed_impl(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<DeactivationReport> {
        let grants = sqlx::query(
            r#"
            UPDATE access_grants
            SET is_active = FALSE, updated_at = $1
            WHERE is_active
              AND created_at + ttl_seconds * INTERVAL '1 second' < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to sweep lapsed grants: {error}")))?
        .rows_affected();

        let relations = sqlx::query(
            r#"
            UPDATE guest_relations
            SET is_active = FALSE, updated_at = $1
            WHERE is_active
              AND expire_by_time
              AND created_at + minutes_allowed * INTERVAL '1 minute' <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to sweep lapsed relations: {error}"))
        })?
        .rows_affected();

        Ok(DeactivationReport { grants, relations })
    }
}
