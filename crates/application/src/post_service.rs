//! Posts on an account, written by its holder or by a guest acting for them.

use std::collections::HashMap;
use std::sync::Arc;

use keyshare_core::{AppError, AppResult, PostId, SessionClaims, UserId};
use keyshare_domain::Post;
use tracing::info;

use crate::{Clock, PostRepository, UserDirectory};

/// Number of posts returned by a listing.
pub const DEFAULT_POST_PAGE_SIZE: u32 = 20;

/// Who wrote and last edited a post, by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAttribution {
    /// Email of the credential holder who wrote the post.
    pub created_by: String,
    /// Email of the credential holder behind the latest edit.
    pub updated_by: String,
}

/// Post as shown to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEntry {
    /// The post itself.
    pub post: Post,
    /// Surrogate attribution, only resolved for the account holder.
    pub attribution: Option<PostAttribution>,
}

/// Application service for account posts.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    user_directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
}

impl PostService {
    /// Creates a new post service.
    #[must_use]
    pub fn new(
        posts: Arc<dyn PostRepository>,
        user_directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            posts,
            user_directory,
            clock,
        }
    }

    /// Writes a post on the session's account.
    pub async fn create_post(&self, claims: &SessionClaims, body: &str) -> AppResult<Post> {
        let post = Post::write(claims, body, self.clock.now())?;
        self.posts.create_post(&post).await?;

        info!(
            post_id = %post.id(),
            account_id = %post.account_id(),
            surrogate_id = %claims.surrogate(),
            "post created"
        );

        Ok(post)
    }

    /// Lists the newest posts on the session's account.
    ///
    /// Only the primary holder sees which credential holder wrote each post.
    pub async fn list_posts(&self, claims: &SessionClaims) -> AppResult<Vec<PostEntry>> {
        let posts = self
            .posts
            .list_for_account(claims.subject(), DEFAULT_POST_PAGE_SIZE)
            .await?;

        if !claims.is_primary_holder() {
            return Ok(posts
                .into_iter()
                .map(|post| PostEntry {
                    post,
                    attribution: None,
                })
                .collect());
        }

        let mut emails = HashMap::new();
        let mut entries = Vec::with_capacity(posts.len());
        for post in posts {
            let attribution = PostAttribution {
                created_by: self.email_for(post.created_by_surrogate(), &mut emails).await?,
                updated_by: self.email_for(post.updated_by_surrogate(), &mut emails).await?,
            };
            entries.push(PostEntry {
                post,
                attribution: Some(attribution),
            });
        }

        Ok(entries)
    }

    /// Replaces the text of a post on the session's account.
    pub async fn update_post(
        &self,
        claims: &SessionClaims,
        post_id: PostId,
        body: &str,
    ) -> AppResult<Post> {
        let post = self.visible_post(claims, post_id).await?;
        let revised = post.revised(claims, body, self.clock.now())?;
        self.posts.update_post(&revised).await?;

        info!(post_id = %post_id, surrogate_id = %claims.surrogate(), "post updated");

        Ok(revised)
    }

    /// Hides a post. Guests may only remove posts they wrote.
    pub async fn remove_post(&self, claims: &SessionClaims, post_id: PostId) -> AppResult<Post> {
        let post = self.visible_post(claims, post_id).await?;

        if !claims.is_primary_holder() && post.created_by_surrogate() != claims.surrogate() {
            return Err(AppError::Forbidden(
                "guests can only remove their own posts".to_owned(),
            ));
        }

        let removed = post.removed(claims, self.clock.now());
        self.posts.update_post(&removed).await?;

        info!(post_id = %post_id, surrogate_id = %claims.surrogate(), "post removed");

        Ok(removed)
    }

    async fn visible_post(&self, claims: &SessionClaims, post_id: PostId) -> AppResult<Post> {
        self.posts
            .find_post(post_id)
            .await?
            .filter(|post| post.is_visible_to(claims))
            .ok_or_else(|| AppError::NotFound("post not found".to_owned()))
    }

    async fn email_for(
        &self,
        user_id: UserId,
        emails: &mut HashMap<UserId, String>,
    ) -> AppResult<String> {
        if let Some(email) = emails.get(&user_id) {
            return Ok(email.clone());
        }

        // Accounts are never deleted, but fall back to the id rather than fail the listing.
        let email = self
            .user_directory
            .find_user(user_id)
            .await?
            .map_or_else(|| user_id.to_string(), |user| user.email);
        emails.insert(user_id, email.clone());
        Ok(email)
    }
}
