use chrono::{Duration, Utc};
use keyshare_application::{GrantStore, UserDirectory};
use keyshare_core::{AppError, UserId};
use keyshare_domain::{AccessGrant, EmailAddress, ExpiryPolicy, GuestRelation};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::PostgresGrantStore;
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
        panic!("failed to run migrations for postgres grant store tests: {error}");
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

fn grant_for(owner: UserId, policy: ExpiryPolicy) -> AccessGrant {
    AccessGrant::issue(owner, "$argon2id$v=19$hash", 900, policy, Utc::now())
        .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn grant_round_trips_with_policy_columns() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresGrantStore::new(pool.clone());
    let owner = account(&pool, "owner").await;
    let grant = grant_for(owner, ExpiryPolicy::ByTime { minutes_allowed: 45 });

    assert!(store.create_grant(&grant).await.is_ok());
    let loaded = store.find_grant(grant.id()).await;

    assert!(matches!(
        loaded,
        Ok(Some(ref loaded)) if loaded.policy() == grant.policy()
            && loaded.owner_id() == owner
            && loaded.is_active()
    ));
}

#[tokio::test]
async fn claim_is_exclusive_per_grant_and_pair() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresGrantStore::new(pool.clone());
    let owner = account(&pool, "owner").await;
    let guest = account(&pool, "guest").await;
    let first = grant_for(owner, ExpiryPolicy::Unbounded);
    let second = grant_for(owner, ExpiryPolicy::Unbounded);
    assert!(store.create_grant(&first).await.is_ok());
    assert!(store.create_grant(&second).await.is_ok());

    let now = Utc::now();
    let relation =
        GuestRelation::from_grant(&first, guest, now).unwrap_or_else(|_| unreachable!());
    let claimed = first.clone().claimed(guest, relation.id(), now);
    assert!(store.claim_grant(&claimed, &relation).await.is_ok());

    let replay = store.claim_grant(&claimed, &relation).await;
    assert!(matches!(replay, Err(AppError::NotFound(_))));

    let duplicate =
        GuestRelation::from_grant(&second, guest, now).unwrap_or_else(|_| unreachable!());
    let second_claimed = second.clone().claimed(guest, duplicate.id(), now);
    let conflict = store.claim_grant(&second_claimed, &duplicate).await;
    assert!(matches!(conflict, Err(AppError::Conflict(_))));

    let still_active = store.find_grant(second.id()).await;
    assert!(matches!(still_active, Ok(Some(ref grant)) if grant.is_active()));
}

#[tokio::test]
async fn sweep_deactivates_lapsed_rows() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresGrantStore::new(pool.clone());
    let owner = account(&pool, "owner").await;
    let guest = account(&pool, "guest").await;
    let created_at = Utc::now() - Duration::minutes(40);
    let timed = AccessGrant::issue(
        owner,
        "$argon2id$v=19$hash",
        900,
        ExpiryPolicy::ByTime { minutes_allowed: 30 },
        created_at,
    )
    .unwrap_or_else(|_| unreachable!());
    assert!(store.create_grant(&timed).await.is_ok());

    let relation = GuestRelation::from_grant(&timed, guest, created_at)
        .unwrap_or_else(|_| unreachable!());
    let claimed = timed.clone().claimed(guest, relation.id(), created_at);
    assert!(store.claim_grant(&claimed, &relation).await.is_ok());

    let report = store.deactivate_lapsed(Utc::now()).await;
    assert!(matches!(report, Ok(report) if report.relations >= 1));

    let relation = store.find_relation(relation.id()).await;
    assert!(matches!(relation, Ok(Some(ref relation)) if !relation.is_active()));
}

#[tokio::test]
async fn deactivate_for_owner_spares_other_accounts() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresGrantStore::new(pool.clone());
    let owner = account(&pool, "owner").await;
    let other = account(&pool, "other").await;
    let owned = grant_for(owner, ExpiryPolicy::Unbounded);
    let foreign = grant_for(other, ExpiryPolicy::Unbounded);
    assert!(store.create_grant(&owned).await.is_ok());
    assert!(store.create_grant(&foreign).await.is_ok());

    let report = store.deactivate_for_owner(owner, Utc::now()).await;

    assert!(matches!(report, Ok(report) if report.grants == 1 && report.relations == 0));
    assert!(matches!(
        store.find_grant(foreign.id()).await,
        Ok(Some(ref grant)) if grant.is_active()
    ));
}
