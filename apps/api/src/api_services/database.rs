use std::time::Duration;

use keyshare_core::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("../../crates/infrastructure/migrations");

/// Opens the shared pool and brings the accounts, grants and audit schema
/// up to date.
pub async fn connect_and_migrate(database_url: &str) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    info!(migrations = MIGRATOR.iter().count(), "database schema is current");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::MIGRATOR;

    #[test]
    fn relations_are_created_before_the_login_audit_that_references_them() {
        let descriptions = MIGRATOR
            .iter()
            .map(|migration| migration.description.to_string())
            .collect::<Vec<_>>();

        let grants = descriptions
            .iter()
            .position(|description| description.contains("access grants"));
        let audit = descriptions
            .iter()
            .position(|description| description.contains("login audit"));

        assert!(matches!((grants, audit), (Some(grants), Some(audit)) if grants < audit));
    }
}
