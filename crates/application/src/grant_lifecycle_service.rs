//! Grant lifecycle: creation, redemption and promotion into a guest relation.
//!
//! Grant tokens are 256-bit random values handed out once and stored only as
//! salted hashes. A grant moves from active to inactive exactly once, either
//! when a guest claims it or when an administrator pass switches it off.

use std::sync::Arc;

use async_trait::async_trait;
use keyshare_core::{AppError, AppResult, GrantId, UserId};
use keyshare_domain::GuestRelation;

use crate::{Clock, EmailService, GrantStore, SecretHasher, UserDirectory};

mod administration;
mod finalize;
mod redeem;
mod share;
mod token_crypto;

pub use share::{BeginShareInput, ShareInvitation};

/// Port through which the pairing coordinator activates a grant.
#[async_trait]
pub trait GrantFinalizer: Send + Sync {
    /// Claims the grant for the guest and creates the guest relation.
    async fn finalize_grant(
        &self,
        grant_id: GrantId,
        parent_id: UserId,
        guest_id: UserId,
    ) -> AppResult<GuestRelation>;
}

/// Application service owning every grant state transition.
#[derive(Clone)]
pub struct GrantLifecycleService {
    grant_store: Arc<dyn GrantStore>,
    user_directory: Arc<dyn UserDirectory>,
    secret_hasher: Arc<dyn SecretHasher>,
    email_service: Arc<dyn EmailService>,
    clock: Arc<dyn Clock>,
    frontend_url: String,
    grant_ttl_seconds: i64,
}

impl GrantLifecycleService {
    /// Creates a new grant lifecycle service.
    #[must_use]
    pub fn new(
        grant_store: Arc<dyn GrantStore>,
        user_directory: Arc<dyn UserDirectory>,
        secret_hasher: Arc<dyn SecretHasher>,
        email_service: Arc<dyn EmailService>,
        clock: Arc<dyn Clock>,
        frontend_url: String,
        grant_ttl_seconds: i64,
    ) -> Self {
        Self {
            grant_store,
            user_directory,
            secret_hasher,
            email_service,
            clock,
            frontend_url,
            grant_ttl_seconds,
        }
    }
}

#[async_trait]
impl GrantFinalizer for GrantLifecycleService {
    async fn finalize_grant(
        &self,
        grant_id: GrantId,
        parent_id: UserId,
        guest_id: UserId,
    ) -> AppResult<GuestRelation> {
        self.finalize(grant_id, parent_id, guest_id).await
    }
}

/// Error returned for missing, inactive and wrong-token grants alike.
fn grant_not_found() -> AppError {
    AppError::NotFound("access grant not found".to_owned())
}

fn grant_expired() -> AppError {
    AppError::Expired("access grant has expired".to_owned())
}
