use std::sync::Arc;

use keyshare_infrastructure::{
    PostgresGrantStore, PostgresLoginAuditRepository, PostgresPasskeyRepository,
    PostgresPostRepository, PostgresUserDirectory,
};
use sqlx::PgPool;

pub(super) struct RepositorySet {
    pub(super) grant_store: Arc<PostgresGrantStore>,
    pub(super) user_directory: Arc<PostgresUserDirectory>,
    pub(super) login_audit: Arc<PostgresLoginAuditRepository>,
    pub(super) passkey_repository: PostgresPasskeyRepository,
    pub(super) posts: Arc<PostgresPostRepository>,
}

pub(super) fn build_repository_set(pool: &PgPool) -> RepositorySet {
    RepositorySet {
        grant_store: Arc::new(PostgresGrantStore::new(pool.clone())),
        user_directory: Arc::new(PostgresUserDirectory::new(pool.clone())),
        login_audit: Arc::new(PostgresLoginAuditRepository::new(pool.clone())),
        passkey_repository: PostgresPasskeyRepository::new(pool.clone()),
        posts: Arc::new(PostgresPostRepository::new(pool.clone())),
    }
}
