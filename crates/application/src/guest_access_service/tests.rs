use chrono::Duration;
use keyshare_core::{AppError, RelationId, SessionClaims, UserId};
use keyshare_domain::{ExpiryPolicy, GuestRelation};

use crate::test_support::Harness;
use crate::{BeginShareInput, GrantStore, LoginAuditRepository, LoginContext};

async fn paired(harness: &Harness, policy: ExpiryPolicy) -> (UserId, UserId, GuestRelation) {
    let parent = harness.users.add("parent@example.com");
    let guest = harness.users.add("guest@example.com");
    let invitation = harness
        .lifecycle
        .begin_share(
            &SessionClaims::for_self(parent),
            BeginShareInput {
                policy,
                recipient_email: None,
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    let relation = harness
        .lifecycle
        .finalize(invitation.grant.id(), parent, guest)
        .await
        .unwrap_or_else(|_| unreachable!());
    (parent, guest, relation)
}

fn context() -> LoginContext {
    LoginContext {
        ip_address: Some("203.0.113.7".to_owned()),
        user_agent: Some("test-agent".to_owned()),
    }
}

#[tokio::test]
async fn relations_are_listed_from_both_sides() {
    let harness = Harness::new();
    let (parent, guest, relation) = paired(&harness, ExpiryPolicy::Unbounded).await;

    let as_guest = harness
        .guest_access
        .relations_as_guest(&SessionClaims::for_self(guest))
        .await;
    let as_parent = harness
        .guest_access
        .relations_as_parent(&SessionClaims::for_self(parent))
        .await;
    let overview = harness
        .guest_access
        .overview(&SessionClaims::for_self(guest))
        .await;

    assert!(matches!(as_guest, Ok(ref list) if list.len() == 1 && list[0].id() == relation.id()));
    assert!(matches!(as_parent, Ok(ref list) if list.len() == 1));
    assert!(matches!(
        overview,
        Ok(overview) if overview.has_guest_grants && !overview.has_parent_grants
    ));
}

#[tokio::test]
async fn guest_session_lists_relations_of_the_credential_holder() {
    let harness = Harness::new();
    let (parent, guest, relation) = paired(&harness, ExpiryPolicy::Unbounded).await;
    let claims = SessionClaims::delegated(parent, guest, relation.id());

    let as_guest = harness.guest_access.relations_as_guest(&claims).await;
    let as_parent = harness.guest_access.relations_as_parent(&claims).await;

    assert!(matches!(as_guest, Ok(ref list) if list.len() == 1));
    assert!(matches!(as_parent, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn assume_then_release_round_trip() {
    let harness = Harness::new();
    let (parent, guest, relation) = paired(&harness, ExpiryPolicy::Unbounded).await;

    let assumed = harness
        .guest_access
        .assume_relation(&SessionClaims::for_self(guest), relation.id(), context())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(assumed.claims.subject(), parent);
    assert_eq!(assumed.claims.surrogate(), guest);
    assert_eq!(assumed.claims.grant(), Some(relation.id()));

    let released = harness
        .guest_access
        .release_relation(&assumed.claims, context())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(released.claims.is_primary_holder());
    assert_eq!(released.claims.subject(), guest);

    let history = harness
        .guest_access
        .login_history(parent)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].relation_id, Some(relation.id()));
    assert_eq!(history[0].ip_address.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn assume_is_refused_from_guest_session_or_for_other_guest() {
    let harness = Harness::new();
    let (parent, guest, relation) = paired(&harness, ExpiryPolicy::Unbounded).await;
    let stranger = harness.users.add("stranger@example.com");

    let nested = harness
        .guest_access
        .assume_relation(
            &SessionClaims::delegated(parent, guest, relation.id()),
            relation.id(),
            context(),
        )
        .await;
    let foreign = harness
        .guest_access
        .assume_relation(&SessionClaims::for_self(stranger), relation.id(), context())
        .await;
    let unknown = harness
        .guest_access
        .assume_relation(&SessionClaims::for_self(guest), RelationId::new(), context())
        .await;

    assert!(matches!(nested, Err(AppError::Forbidden(_))));
    assert!(matches!(foreign, Err(AppError::Forbidden(_))));
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn login_allowance_is_enforced() {
    let harness = Harness::new();
    let (_, guest, relation) =
        paired(&harness, ExpiryPolicy::ByLogins { logins_allowed: 2 }).await;
    let claims = SessionClaims::for_self(guest);

    for _ in 0..2 {
        let assumed = harness
            .guest_access
            .assume_relation(&claims, relation.id(), context())
            .await;
        assert!(assumed.is_ok());
    }

    let third = harness
        .guest_access
        .assume_relation(&claims, relation.id(), context())
        .await;
    assert!(matches!(third, Err(AppError::Expired(_))));
    let logins = harness.audit.count_relation_logins(relation.id()).await;
    assert!(matches!(logins, Ok(2)));

    let stored = harness
        .store
        .find_relation(relation.id())
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert!(!stored.is_active());
}

#[tokio::test]
async fn concurrent_assumes_share_a_single_login_slot() {
    let harness = Harness::new();
    let (_, guest, relation) =
        paired(&harness, ExpiryPolicy::ByLogins { logins_allowed: 1 }).await;
    let claims = SessionClaims::for_self(guest);

    let (first, second, third) = tokio::join!(
        harness
            .guest_access
            .assume_relation(&claims, relation.id(), context()),
        harness
            .guest_access
            .assume_relation(&claims, relation.id(), context()),
        harness
            .guest_access
            .assume_relation(&claims, relation.id(), context()),
    );

    let started = [&first, &second, &third]
        .iter()
        .filter(|result| result.is_ok())
        .count();
    assert_eq!(started, 1);
    assert!(
        [first, second, third]
            .into_iter()
            .filter_map(Result::err)
            .all(|error| matches!(error, AppError::Expired(_) | AppError::NotFound(_)))
    );

    let logins = harness.audit.count_relation_logins(relation.id()).await;
    assert!(matches!(logins, Ok(1)));
}

#[tokio::test]
async fn time_allowance_is_enforced() {
    let harness = Harness::new();
    let (_, guest, relation) =
        paired(&harness, ExpiryPolicy::ByTime { minutes_allowed: 30 }).await;

    harness.clock.advance(Duration::minutes(30));
    let result = harness
        .guest_access
        .assume_relation(&SessionClaims::for_self(guest), relation.id(), context())
        .await;

    assert!(matches!(result, Err(AppError::Expired(_))));
}

#[tokio::test]
async fn release_requires_guest_session() {
    let harness = Harness::new();
    let user = harness.users.add("holder@example.com");

    let result = harness
        .guest_access
        .release_relation(&SessionClaims::for_self(user), context())
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn only_parent_may_revoke() {
    let harness = Harness::new();
    let (parent, guest, relation) = paired(&harness, ExpiryPolicy::Unbounded).await;

    let by_guest = harness
        .guest_access
        .revoke_relation(&SessionClaims::for_self(guest), relation.id())
        .await;
    assert!(matches!(by_guest, Err(AppError::Forbidden(_))));

    let by_parent = harness
        .guest_access
        .revoke_relation(&SessionClaims::for_self(parent), relation.id())
        .await;
    assert!(matches!(by_parent, Ok(ref revoked) if !revoked.is_active()));

    let assume = harness
        .guest_access
        .assume_relation(&SessionClaims::for_self(guest), relation.id(), context())
        .await;
    assert!(matches!(assume, Err(AppError::NotFound(_))));

    let all = harness.guest_access.relations_for_parent(parent).await;
    assert!(matches!(all, Ok(list) if list.len() == 1));
}
