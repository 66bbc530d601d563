use std::sync::Arc;

use keyshare_application::{
    AccountService, DelegatedSessionIssuer, GrantLifecycleService, GuestAccessService,
    PairingRegistry, PostService,
};
use keyshare_infrastructure::PostgresPasskeyRepository;
use sqlx::PgPool;
use webauthn_rs::Webauthn;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub session_issuer: DelegatedSessionIssuer,
    pub grant_lifecycle: GrantLifecycleService,
    pub guest_access: GuestAccessService,
    pub pairing_registry: PairingRegistry,
    pub post_service: PostService,
    pub passkey_repository: PostgresPasskeyRepository,
    pub webauthn: Arc<Webauthn>,
    pub postgres_pool: PgPool,
    pub frontend_url: String,
    pub cookie_secure: bool,
    pub admin_token_digest: [u8; 32],
}
