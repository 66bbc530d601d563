use keyshare_core::{AppError, AppResult, UserId};
use sqlx::PgPool;

/// PostgreSQL-backed passkey credential persistence.
#[derive(Clone)]
pub struct PostgresPasskeyRepository {
    pool: PgPool,
}

impl PostgresPasskeyRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists all passkey credential payloads for an account.
    pub async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT credential_json::text
            FROM passkey_credentials
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list passkeys: {error}")))
    }

    /// Persists a passkey credential payload for an account.
    pub async fn insert_for_user(&self, user_id: UserId, credential_json: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO passkey_credentials (user_id, credential_json)
            VALUES ($1, $2::jsonb)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(credential_json)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert passkey: {error}")))?;

        Ok(())
    }

    /// Replaces all passkeys for an account with the supplied payloads.
    ///
    /// Used after authentication to persist updated signature counters.
    pub async fn replace_for_user(&self, user_id: UserId, passkeys_json: &[String]) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query(
            r#"
            DELETE FROM passkey_credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete passkeys: {error}")))?;

        for credential_json in passkeys_json {
            sqlx::query(
                r#"
                INSERT INTO passkey_credentials (user_id, credential_json)
                VALUES ($1, $2::jsonb)
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(credential_json)
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to upsert passkey: {error}")))?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }
}
