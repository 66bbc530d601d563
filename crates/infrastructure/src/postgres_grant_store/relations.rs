use super::*;

impl PostgresGrantStore {
    pub(super) async fn find_relation_impl(
        &self,
        relation_id: RelationId,
    ) -> AppResult<Option<GuestRelation>> {
        let row = sqlx::query_as::<_, GuestRelationRow>(&format!(
            "SELECT {RELATION_COLUMNS} FROM guest_relations WHERE id = $1"
        ))
        .bind(relation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find guest relation: {error}")))?;

        row.map(GuestRelation::try_from).transpose()
    }

    pub(super) async fn update_relation_impl(&self, relation: &GuestRelation) -> AppResult<()> {
        relation.validate()?;
        let policy = PolicyColumns::from(relation.policy());

        let result = sqlx::query(
            r#"
            UPDATE guest_relations
            SET expire_by_time = $2,
                minutes_allowed = $3,
                expire_by_logins = $4,
                logins_allowed = $5,
                is_active = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(relation.id().as_uuid())
        .bind(policy.expire_by_time)
        .bind(policy.minutes_allowed)
        .bind(policy.expire_by_logins)
        .bind(policy.logins_allowed)
        .bind(relation.is_active())
        .bind(relation.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| pair_conflict_or_internal(error, "update guest relation"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("guest relation not found".to_owned()));
        }

        Ok(())
    }

    pub(super) async fn relations_by_guest_impl(
        &self,
        guest_id: UserId,
    ) -> AppResult<Vec<GuestRelation>> {
        let rows = sqlx::query_as::<_, GuestRelationRow>(&format!(
            "SELECT {RELATION_COLUMNS} FROM guest_relations \
             WHERE guest_id = $1 ORDER BY created_at ASC"
        ))
        .bind(guest_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list guest relations by guest: {error}"))
        })?;

        relations_from_rows(rows)
    }

    pub(super) async fn relations_by_parent_impl(
        &self,
        parent_id: UserId,
    ) -> AppResult<Vec<GuestRelation>> {
        let rows = sqlx::query_as::<_, GuestRelationRow>(&format!(
            "SELECT {RELATION_COLUMNS} FROM guest_relations \
             WHERE parent_id = $1 ORDER BY created_at ASC"
        ))
        .bind(parent_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list guest relations by parent: {error}"))
        })?;

        relations_from_rows(rows)
    }

    pub(super) async fn find_active_relation_impl(
        &self,
        parent_id: UserId,
        guest_id: UserId,
    ) -> AppResult<Option<GuestRelation>> {
        let row = sqlx::query_as::<_, GuestRelationRow>(&format!(
            "SELECT {RELATION_COLUMNS} FROM guest_relations \
             WHERE parent_id = $1 AND guest_id = $2 AND is_active \
             LIMIT 1"
        ))
        .bind(parent_id.as_uuid())
        .bind(guest_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find active guest relation: {error}"))
        })?;

        row.map(GuestRelation::try_from).transpose()
    }
}
