use super::*;

impl PostgresGrantStore {
    /// Claims a grant and inserts its relation in one transaction.
    ///
    /// The grant row is locked first, so concurrent claims of one grant
    /// serialize on it; the conditional update and the partial unique index
    /// on active pairs reject whichever claim loses.
    pub(super) async fn claim_grant_impl(
        &self,
        claimed: &AccessGrant,
        relation: &GuestRelation,
    ) -> AppResult<()> {
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

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin claim transaction: {error}"))
        })?;

        let is_active = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT is_active
            FROM access_grants
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(claimed.id().as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock access grant: {error}")))?;

        if is_active != Some(true) {
            return Err(AppError::NotFound("access grant not found".to_owned()));
        }

        let updated = sqlx::query(
            r#"
            UPDATE access_grants
            SET is_active = FALSE,
                claimed_by = $2,
                relation_id = $3,
                updated_at = $4
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(claimed.id().as_uuid())
        .bind(relation.guest_id().as_uuid())
        .bind(relation.id().as_uuid())
        .bind(claimed.updated_at())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to claim access grant: {error}")))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("access grant not found".to_owned()));
        }

        let policy = PolicyColumns::from(relation.policy());
        sqlx::query(
            r#"
            INSERT INTO guest_relations (
                id, parent_id, guest_id, grant_id,
                expire_by_time, minutes_allowed, expire_by_logins, logins_allowed,
                is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(relation.id().as_uuid())
        .bind(relation.parent_id().as_uuid())
        .bind(relation.guest_id().as_uuid())
        .bind(relation.grant_id().as_uuid())
        .bind(policy.expire_by_time)
        .bind(policy.minutes_allowed)
        .bind(policy.expire_by_logins)
        .bind(policy.logins_allowed)
        .bind(relation.is_active())
        .bind(relation.created_at())
        .bind(relation.updated_at())
        .execute(&mut *transaction)
        .await
        .map_err(|error| pair_conflict_or_internal(error, "create guest relation"))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit claim transaction: {error}"))
        })
    }
}
