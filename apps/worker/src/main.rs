//! Keyshare deactivation sweeper.
//!
//! Periodically switches off grants whose redemption window has passed and
//! guest relations whose time allowance has run out.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use keyshare_application::{DeactivationReport, GrantLifecycleService, SystemClock};
use keyshare_core::{AppError, AppResult};
use keyshare_infrastructure::{
    Argon2SecretHasher, ConsoleEmailService, PostgresGrantStore, PostgresUserDirectory,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    frontend_url: String,
    sweep_interval_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let lifecycle = build_lifecycle_service(pool, &config);

    info!(
        sweep_interval_seconds = config.sweep_interval_seconds,
        "keyshare-worker started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.sweep_interval_seconds));
    loop {
        interval.tick().await;

        match sweep_once(&lifecycle).await {
            Ok(report) if report.is_empty() => debug!("sweep found nothing to deactivate"),
            Ok(report) => info!(
                grants = report.grants,
                relations = report.relations,
                "deactivated lapsed grants and relations"
            ),
            Err(error) => warn!(error = %error, "deactivation sweep failed"),
        }
    }
}

async fn sweep_once(lifecycle: &GrantLifecycleService) -> AppResult<DeactivationReport> {
    lifecycle.deactivate_lapsed().await
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

// The sweep never issues grants or sends mail; those collaborators are inert.
fn build_lifecycle_service(pool: PgPool, config: &WorkerConfig) -> GrantLifecycleService {
    GrantLifecycleService::new(
        Arc::new(PostgresGrantStore::new(pool.clone())),
        Arc::new(PostgresUserDirectory::new(pool)),
        Arc::new(Argon2SecretHasher::new()),
        Arc::new(ConsoleEmailService::new()),
        Arc::new(SystemClock),
        config.frontend_url.clone(),
        keyshare_domain::DEFAULT_GRANT_TTL_SECONDS,
    )
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_owned())
            .trim_end_matches('/')
            .to_owned();
        let sweep_interval_seconds =
            parse_sweep_interval(env::var("SWEEP_INTERVAL_SECONDS").ok())?;

        Ok(Self {
            database_url,
            frontend_url,
            sweep_interval_seconds,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_sweep_interval(raw: Option<String>) -> AppResult<u64> {
    let Some(value) = raw else {
        return Ok(60);
    };

    let seconds = value.trim().parse::<u64>().map_err(|error| {
        AppError::Validation(format!(
            "invalid SWEEP_INTERVAL_SECONDS value '{value}': {error}"
        ))
    })?;

    if seconds == 0 {
        return Err(AppError::Validation(
            "SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
        ));
    }

    Ok(seconds)
}
