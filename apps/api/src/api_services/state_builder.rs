use std::sync::Arc;

use chrono::Duration;
use keyshare_application::{
    AccountService, Clock, DelegatedSessionIssuer, GrantLifecycleService, GuestAccessService,
    PairingConfig, PairingRegistry, PostService, SystemClock,
};
use keyshare_core::AppError;
use keyshare_infrastructure::{Argon2SecretHasher, JwtSessionSigner};
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::middleware::admin_token_digest;
use crate::state::AppState;

use super::email::build_email_service;

mod repositories;
mod webauthn;

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let repositories = repositories::build_repository_set(&pool);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let email_service = build_email_service(&config.email_provider)?;
    let webauthn = webauthn::build_webauthn(&config.webauthn_rp_id, &config.webauthn_rp_origin)?;

    let session_issuer = DelegatedSessionIssuer::new(
        Arc::new(JwtSessionSigner::new(&config.session_secret)?),
        repositories.grant_store.clone(),
        repositories.user_directory.clone(),
        clock.clone(),
        Duration::minutes(config.session_lifespan_minutes),
    );

    let grant_lifecycle = GrantLifecycleService::new(
        repositories.grant_store.clone(),
        repositories.user_directory.clone(),
        Arc::new(Argon2SecretHasher::new()),
        email_service,
        clock.clone(),
        config.frontend_url.clone(),
        config.grant_ttl_seconds,
    );

    let guest_access = GuestAccessService::new(
        repositories.grant_store,
        repositories.login_audit.clone(),
        session_issuer.clone(),
        clock.clone(),
    );

    let post_service = PostService::new(
        repositories.posts,
        repositories.user_directory.clone(),
        clock.clone(),
    );

    let account_service = AccountService::new(
        repositories.user_directory,
        repositories.login_audit,
        session_issuer.clone(),
        clock,
    );

    let pairing_registry = PairingRegistry::new(
        Arc::new(grant_lifecycle.clone()),
        PairingConfig {
            idle_timeout: config.pairing_idle_timeout,
            ..PairingConfig::default()
        },
    );

    Ok(AppState {
        account_service,
        session_issuer,
        grant_lifecycle,
        guest_access,
        pairing_registry,
        post_service,
        passkey_repository: repositories.passkey_repository,
        webauthn,
        postgres_pool: pool,
        frontend_url: config.frontend_url.clone(),
        cookie_secure: config.cookie_secure,
        admin_token_digest: admin_token_digest(&config.admin_api_token),
    })
}
