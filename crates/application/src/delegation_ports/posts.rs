use async_trait::async_trait;
use keyshare_core::{AppResult, PostId, UserId};
use keyshare_domain::Post;

/// Repository port for account posts.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Stores a new post.
    async fn create_post(&self, post: &Post) -> AppResult<()>;

    /// Replaces an existing post, returning `NotFound` when it is absent.
    async fn update_post(&self, post: &Post) -> AppResult<()>;

    /// Finds a post by identifier, active or not.
    async fn find_post(&self, post_id: PostId) -> AppResult<Option<Post>>;

    /// Lists active posts on an account, newest first.
    async fn list_for_account(&self, account_id: UserId, limit: u32) -> AppResult<Vec<Post>>;
}
