//! PostgreSQL-backed login audit trail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyshare_application::{LoginAuditRecord, LoginAuditRepository, NewLoginAudit};
use keyshare_core::{AppError, AppResult, RelationId, UserId};
use sqlx::PgPool;

/// PostgreSQL implementation of the login audit port.
#[derive(Clone)]
pub struct PostgresLoginAuditRepository {
    pool: PgPool,
}

impl PostgresLoginAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LoginAuditRow {
    id: i64,
    account_id: uuid::Uuid,
    surrogate_id: uuid::Uuid,
    relation_id: Option<uuid::Uuid>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<LoginAuditRow> for LoginAuditRecord {
    fn from(row: LoginAuditRow) -> Self {
        Self {
            id: row.id,
            account_id: UserId::from_uuid(row.account_id),
            surrogate_id: UserId::from_uuid(row.surrogate_id),
            relation_id: row.relation_id.map(RelationId::from_uuid),
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl LoginAuditRepository for PostgresLoginAuditRepository {
    async fn record_login(&self, entry: NewLoginAudit, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_audit (
                account_id, surrogate_id, relation_id, ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.account_id.as_uuid())
        .bind(entry.surrogate_id.as_uuid())
        .bind(entry.relation_id.map(|relation_id| relation_id.as_uuid()))
        .bind(entry.context.ip_address)
        .bind(entry.context.user_agent)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record login: {error}")))?;

        Ok(())
    }

    async fn count_relation_logins(&self, relation_id: RelationId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM login_audit
            WHERE relation_id = $1
            "#,
        )
        .bind(relation_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count relation logins: {error}")))
    }

    async fn reserve_relation_login(
        &self,
        entry: NewLoginAudit,
        logins_allowed: Option<u32>,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let relation_id = entry.relation_id.ok_or_else(|| {
            AppError::Validation("relation login requires a relation".to_owned())
        })?;

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin login reservation: {error}"))
        })?;

        // Reservations for one relation serialize on its row.
        let is_active = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT is_active
            FROM guest_relations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(relation_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock guest relation: {error}")))?;

        if is_active != Some(true) {
            return Err(AppError::NotFound("guest relation not found".to_owned()));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO login_audit (
                account_id, surrogate_id, relation_id, ip_address, user_agent, created_at
            )
            SELECT $1, $2, $3, $4, $5, $6
            WHERE $7::BIGINT IS NULL
               OR (SELECT COUNT(*) FROM login_audit WHERE relation_id = $3) < $7::BIGINT
            "#,
        )
        .bind(entry.account_id.as_uuid())
        .bind(entry.surrogate_id.as_uuid())
        .bind(relation_id.as_uuid())
        .bind(entry.context.ip_address)
        .bind(entry.context.user_agent)
        .bind(at)
        .bind(logins_allowed.map(i64::from))
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to reserve relation login: {error}")))?
        .rows_affected();

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit login reservation: {error}"))
        })?;

        Ok(inserted == 1)
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<LoginAuditRecord>> {
        let rows = sqlx::query_as::<_, LoginAuditRow>(
            r#"
            SELECT id, account_id, surrogate_id, relation_id, ip_address, user_agent, created_at
            FROM login_audit
            WHERE account_id = $1 OR surrogate_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list logins: {error}")))?;

        Ok(rows.into_iter().map(LoginAuditRecord::from).collect())
    }
}
