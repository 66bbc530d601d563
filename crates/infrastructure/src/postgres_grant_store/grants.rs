use super::*;

impl PostgresGrantStore {
    pub(super) async fn find_grant_impl(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        let row = sqlx::query_as::<_, AccessGrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants WHERE id = $1"
        ))
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find access grant: {error}")))?;

        row.map(AccessGrant::try_from).transpose()
    }

    pub(super) async fn create_grant_impl(&self, grant: &AccessGrant) -> AppResult<()> {
        grant.validate()?;
        let policy = PolicyColumns::from(grant.policy());

        sqlx::query(
            r#"
            INSERT INTO access_grants (
                id, owner_id, token_hash, ttl_seconds,
                expire_by_time, minutes_allowed, expire_by_logins, logins_allowed,
                is_active, claimed_by, relation_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(grant.id().as_uuid())
        .bind(grant.owner_id().as_uuid())
        .bind(grant.token_hash())
        .bind(grant.ttl_seconds())
        .bind(policy.expire_by_time)
        .bind(policy.minutes_allowed)
        .bind(policy.expire_by_logins)
        .bind(policy.logins_allowed)
        .bind(grant.is_active())
        .bind(grant.claimed_by().map(|user_id| user_id.as_uuid()))
        .bind(grant.relation_id().map(|relation_id| relation_id.as_uuid()))
        .bind(grant.created_at())
        .bind(grant.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                AppError::Conflict(format!("access grant '{}' already exists", grant.id()))
            } else {
                AppError::Internal(format!("failed to create access grant: {error}"))
            }
        })?;

        Ok(())
    }

    pub(super) async fn update_grant_impl(&self, grant: &AccessGrant) -> AppResult<()> {
        grant.validate()?;
        let policy = PolicyColumns::from(grant.policy());

        let result = sqlx::query(
            r#"
            UPDATE access_grants
            SET token_hash = $2,
                ttl_seconds = $3,
                expire_by_time = $4,
                minutes_allowed = $5,
                expire_by_logins = $6,
                logins_allowed = $7,
                is_active = $8,
                claimed_by = $9,
                relation_id = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(grant.id().as_uuid())
        .bind(grant.token_hash())
        .bind(grant.ttl_seconds())
        .bind(policy.expire_by_time)
        .bind(policy.minutes_allowed)
        .bind(policy.expire_by_logins)
        .bind(policy.logins_allowed)
        .bind(grant.is_active())
        .bind(grant.claimed_by().map(|user_id| user_id.as_uuid()))
        .bind(grant.relation_id().map(|relation_id| relation_id.as_uuid()))
        .bind(grant.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update access grant: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("access grant not found".to_owned()));
        }

        Ok(())
    }
}
