use std::sync::Arc;

use chrono::Utc;
use keyshare_application::{
    BeginShareInput, GrantLifecycleService, GrantStore, SystemClock, UserDirectory,
};
use keyshare_core::{AppError, SessionClaims, UserId};
use keyshare_domain::{AccessGrant, EmailAddress, ExpiryPolicy, GuestRelation};

use super::InMemoryGrantStore;
use crate::{Argon2SecretHasher, ConsoleEmailService, InMemoryUserDirectory};

struct Setup {
    store: Arc<InMemoryGrantStore>,
    lifecycle: GrantLifecycleService,
    owner: UserId,
    guest: UserId,
}

async fn setup() -> Setup {
    let store = Arc::new(InMemoryGrantStore::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    let owner = users
        .create_user(&EmailAddress::new("holder@example.com").unwrap_or_else(|_| unreachable!()))
        .await
        .unwrap_or_else(|_| unreachable!())
        .id;
    let guest = users
        .create_user(&EmailAddress::new("guest@example.com").unwrap_or_else(|_| unreachable!()))
        .await
        .unwrap_or_else(|_| unreachable!())
        .id;

    let lifecycle = GrantLifecycleService::new(
        store.clone(),
        users,
        Arc::new(Argon2SecretHasher::new()),
        Arc::new(ConsoleEmailService::new()),
        Arc::new(SystemClock),
        "http://localhost:3000".to_owned(),
        900,
    );

    Setup {
        store,
        lifecycle,
        owner,
        guest,
    }
}

async fn share(setup: &Setup) -> AccessGrant {
    setup
        .lifecycle
        .begin_share(
            &SessionClaims::for_self(setup.owner),
            BeginShareInput {
                policy: ExpiryPolicy::ByLogins { logins_allowed: 5 },
                recipient_email: None,
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!())
        .grant
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_finalize_of_one_grant_has_one_winner() {
    let setup = setup().await;
    let grant = share(&setup).await;

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let lifecycle = setup.lifecycle.clone();
            let (owner, guest, grant_id) = (setup.owner, setup.guest, grant.id());
            tokio::spawn(async move { lifecycle.finalize(grant_id, owner, guest).await })
        })
        .collect();

    let mut successes = 0;
    for attempt in attempts {
        match attempt.await {
            Ok(Ok(_)) => successes += 1,
            Ok(Err(AppError::NotFound(_) | AppError::Conflict(_))) => {}
            other => panic!("unexpected finalize outcome: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    let relations = setup.store.relations_by_parent(setup.owner).await;
    assert!(matches!(relations, Ok(ref list) if list.len() == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_finalize_of_two_grants_keeps_one_active_pair() {
    let setup = setup().await;
    let first = share(&setup).await;
    let second = share(&setup).await;

    let attempts: Vec<_> = [first.id(), second.id()]
        .into_iter()
        .map(|grant_id| {
            let lifecycle = setup.lifecycle.clone();
            let (owner, guest) = (setup.owner, setup.guest);
            tokio::spawn(async move { lifecycle.finalize(grant_id, owner, guest).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for attempt in attempts {
        outcomes.push(attempt.await.unwrap_or_else(|_| unreachable!()));
    }

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|outcome| matches!(outcome, Err(AppError::Conflict(_))))
    );
}

#[tokio::test]
async fn claim_requires_active_grant() {
    let setup = setup().await;
    let grant = share(&setup).await;
    let now = Utc::now();
    let relation =
        GuestRelation::from_grant(&grant, setup.guest, now).unwrap_or_else(|_| unreachable!());
    let claimed = grant.clone().claimed(setup.guest, relation.id(), now);

    let deactivated = setup.store.update_grant(&grant.deactivated(now)).await;
    assert!(deactivated.is_ok());

    let result = setup.store.claim_grant(&claimed, &relation).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(matches!(
        setup.store.find_relation(relation.id()).await,
        Ok(None)
    ));
}

#[tokio::test]
async fn reactivating_duplicate_pair_is_rejected() {
    let setup = setup().await;
    let first = share(&setup).await;
    let relation = setup
        .lifecycle
        .finalize(first.id(), setup.owner, setup.guest)
        .await
        .unwrap_or_else(|_| unreachable!());

    let now = Utc::now();
    let revoked = relation.deactivated(now);
    assert!(setup.store.update_relation(&revoked).await.is_ok());

    let second = share(&setup).await;
    let replacement = setup
        .lifecycle
        .finalize(second.id(), setup.owner, setup.guest)
        .await;
    assert!(replacement.is_ok());

    let stale = setup.store.find_relation(revoked.id()).await;
    let Ok(Some(stale)) = stale else {
        panic!("revoked relation should still be stored");
    };
    assert!(!stale.is_active());
}

#[tokio::test]
async fn deactivate_for_owner_counts_switched_off_rows() {
    let setup = setup().await;
    let claimed = share(&setup).await;
    let _pending = share(&setup).await;
    let _ = setup
        .lifecycle
        .finalize(claimed.id(), setup.owner, setup.guest)
        .await;

    let report = setup.store.deactivate_for_owner(setup.owner, Utc::now()).await;
    let again = setup.store.deactivate_for_owner(setup.owner, Utc::now()).await;

    assert!(matches!(report, Ok(report) if report.grants == 1 && report.relations == 1));
    assert!(matches!(again, Ok(report) if report.is_empty()));
}
