//! In-memory post store for tests and single-process development.

use async_trait::async_trait;
use keyshare_application::PostRepository;
use keyshare_core::{AppError, AppResult, PostId, UserId};
use keyshare_domain::Post;
use tokio::sync::RwLock;

/// In-memory post store.
#[derive(Debug, Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<Vec<Post>>,
}

impl InMemoryPostRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn create_post(&self, post: &Post) -> AppResult<()> {
        post.validate()?;
        let mut posts = self.posts.write().await;

        if posts.iter().any(|stored| stored.id() == post.id()) {
            return Err(AppError::Conflict("post already exists".to_owned()));
        }

        posts.push(post.clone());
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> AppResult<()> {
        post.validate()?;
        let mut posts = self.posts.write().await;
        let stored = posts
            .iter_mut()
            .find(|stored| stored.id() == post.id())
            .ok_or_else(|| AppError::NotFound("post not found".to_owned()))?;
        *stored = post.clone();
        Ok(())
    }

    async fn find_post(&self, post_id: PostId) -> AppResult<Option<Post>> {
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .find(|post| post.id() == post_id)
            .cloned())
    }

    async fn list_for_account(&self, account_id: UserId, limit: u32) -> AppResult<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .read()
            .await
            .iter()
            .rev()
            .filter(|post| post.is_active() && post.account_id() == account_id)
            .cloned()
            .collect();
        posts.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        posts.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(posts)
    }
}
