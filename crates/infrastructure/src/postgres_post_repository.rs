//! PostgreSQL-backed account posts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyshare_application::PostRepository;
use keyshare_core::{AppError, AppResult, PostId, UserId};
use keyshare_domain::{Post, StoredPost};
use sqlx::PgPool;

/// PostgreSQL implementation of the post port.
#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: uuid::Uuid,
    account_id: uuid::Uuid,
    created_by_surrogate: uuid::Uuid,
    updated_by_surrogate: uuid::Uuid,
    body: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = AppError;

    fn try_from(row: PostRow) -> AppResult<Self> {
        Post::try_from(StoredPost {
            id: PostId::from_uuid(row.id),
            account_id: UserId::from_uuid(row.account_id),
            created_by_surrogate: UserId::from_uuid(row.created_by_surrogate),
            updated_by_surrogate: UserId::from_uuid(row.updated_by_surrogate),
            body: row.body,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create_post(&self, post: &Post) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (
                id, account_id, created_by_surrogate, updated_by_surrogate,
                body, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(post.id().as_uuid())
        .bind(post.account_id().as_uuid())
        .bind(post.created_by_surrogate().as_uuid())
        .bind(post.updated_by_surrogate().as_uuid())
        .bind(post.body())
        .bind(post.is_active())
        .bind(post.created_at())
        .bind(post.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create post: {error}")))?;

        Ok(())
    }

    async fn update_post(&self, post: &Post) -> AppResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE posts
            SET body = $2,
                updated_by_surrogate = $3,
                is_active = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(post.id().as_uuid())
        .bind(post.body())
        .bind(post.updated_by_surrogate().as_uuid())
        .bind(post.is_active())
        .bind(post.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update post: {error}")))?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("post not found".to_owned()));
        }

        Ok(())
    }

    async fn find_post(&self, post_id: PostId) -> AppResult<Option<Post>> {
        sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, account_id, created_by_surrogate, updated_by_surrogate,
                   body, is_active, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(post_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find post: {error}")))?
        .map(Post::try_from)
        .transpose()
    }

    async fn list_for_account(&self, account_id: UserId, limit: u32) -> AppResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, account_id, created_by_surrogate, updated_by_surrogate,
                   body, is_active, created_at, updated_at
            FROM posts
            WHERE account_id = $1 AND is_active
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list posts: {error}")))?;

        rows.into_iter().map(Post::try_from).collect()
    }
}

#[cfg(test)]
mod tests;
