use chrono::{Duration, Utc};
use keyshare_application::{PostRepository, UserDirectory};
use keyshare_core::{AppError, RelationId, SessionClaims, UserId};
use keyshare_domain::{EmailAddress, Post};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::PostgresPostRepository;
use crate::PostgresUserDirectory;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for post tests: {error}");
    }

    Some(pool)
}

async fn account(pool: &PgPool, label: &str) -> UserId {
    let email = EmailAddress::new(format!("{label}-{}@example.com", UserId::new()))
        .unwrap_or_else(|_| unreachable!());
    PostgresUserDirectory::new(pool.clone())
        .create_user(&email)
        .await
        .unwrap_or_else(|_| unreachable!())
        .id
}

#[tokio::test]
async fn guest_edits_keep_the_original_author() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let parent = account(&pool, "parent").await;
    let guest = account(&pool, "guest").await;
    let repository = PostgresPostRepository::new(pool);
    let now = Utc::now();

    let post = Post::write(&SessionClaims::for_self(parent), "shopping list", now)
        .unwrap_or_else(|_| unreachable!());
    assert!(repository.create_post(&post).await.is_ok());

    let revised = post.clone()
        .revised(
            &SessionClaims::delegated(parent, guest, RelationId::new()),
            "shopping list, milk added",
            now + Duration::seconds(30),
        )
        .unwrap_or_else(|_| unreachable!());
    assert!(repository.update_post(&revised).await.is_ok());

    let stored = repository.find_post(post.id()).await;
    assert!(matches!(
        stored,
        Ok(Some(ref stored))
            if stored.created_by_surrogate() == parent
                && stored.updated_by_surrogate() == guest
                && stored.body() == "shopping list, milk added"
    ));
}

#[tokio::test]
async fn listing_skips_removed_posts_and_other_accounts() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let holder = account(&pool, "holder").await;
    let stranger = account(&pool, "stranger").await;
    let repository = PostgresPostRepository::new(pool);
    let claims = SessionClaims::for_self(holder);
    let now = Utc::now();

    let older = Post::write(&claims, "older", now).unwrap_or_else(|_| unreachable!());
    let newer = Post::write(&claims, "newer", now + Duration::seconds(1))
        .unwrap_or_else(|_| unreachable!());
    let removed = Post::write(&claims, "removed", now).unwrap_or_else(|_| unreachable!());
    let foreign = Post::write(&SessionClaims::for_self(stranger), "foreign", now)
        .unwrap_or_else(|_| unreachable!());
    for post in [&older, &newer, &removed, &foreign] {
        assert!(repository.create_post(post).await.is_ok());
    }
    assert!(
        repository
            .update_post(&removed.clone().removed(&claims, now + Duration::seconds(2)))
            .await
            .is_ok()
    );

    let listed = repository
        .list_for_account(holder, 20)
        .await
        .unwrap_or_else(|_| unreachable!());
    let bodies: Vec<&str> = listed.iter().map(Post::body).collect();

    assert_eq!(bodies, vec!["newer", "older"]);
}

#[tokio::test]
async fn updating_a_missing_post_is_not_found() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let holder = account(&pool, "holder").await;
    let post = Post::write(&SessionClaims::for_self(holder), "never stored", Utc::now())
        .unwrap_or_else(|_| unreachable!());

    let result = PostgresPostRepository::new(pool).update_post(&post).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}
