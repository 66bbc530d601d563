use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use keyshare_core::AppError;
use keyshare_infrastructure::MIN_SESSION_SECRET_LEN;
use tracing_subscriber::EnvFilter;

const MAX_SESSION_LIFESPAN_MINUTES: i64 = 30 * 24 * 60;
const MAX_PAIRING_IDLE_TIMEOUT_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct SmtpRuntimeConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    Console,
    Smtp(SmtpRuntimeConfig),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub session_secret: String,
    pub api_host: String,
    pub api_port: u16,
    pub webauthn_rp_id: String,
    pub webauthn_rp_origin: String,
    pub cookie_secure: bool,
    pub session_lifespan_minutes: i64,
    pub grant_ttl_seconds: i64,
    pub pairing_idle_timeout: Duration,
    pub admin_api_token: String,
    pub email_provider: EmailProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_owned())
            .trim_end_matches('/')
            .to_owned();
        let session_secret = required_env("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(AppError::Validation(format!(
                "SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} characters"
            )));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let webauthn_rp_id = env::var("WEBAUTHN_RP_ID").unwrap_or_else(|_| "localhost".to_owned());
        let webauthn_rp_origin =
            env::var("WEBAUTHN_RP_ORIGIN").unwrap_or_else(|_| frontend_url.clone());
        let cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");

        let session_lifespan_minutes = parse_positive(
            "SESSION_LIFESPAN_MINUTES",
            env::var("SESSION_LIFESPAN_MINUTES").ok(),
            60,
            MAX_SESSION_LIFESPAN_MINUTES,
        )?;
        let grant_ttl_seconds = parse_positive(
            "GRANT_TTL_SECONDS",
            env::var("GRANT_TTL_SECONDS").ok(),
            keyshare_domain::DEFAULT_GRANT_TTL_SECONDS,
            keyshare_domain::MAX_GRANT_TTL_SECONDS,
        )?;
        let pairing_idle_timeout_seconds = parse_positive(
            "PAIRING_IDLE_TIMEOUT_SECONDS",
            env::var("PAIRING_IDLE_TIMEOUT_SECONDS").ok(),
            300,
            MAX_PAIRING_IDLE_TIMEOUT_SECONDS,
        )?;

        let admin_api_token = required_non_empty_env("ADMIN_API_TOKEN")?;

        let email_provider = match env::var("EMAIL_PROVIDER")
            .unwrap_or_else(|_| "console".to_owned())
            .as_str()
        {
            "console" => EmailProviderConfig::Console,
            "smtp" => {
                let port = required_non_empty_env("SMTP_PORT")?
                    .parse::<u16>()
                    .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;
                EmailProviderConfig::Smtp(SmtpRuntimeConfig {
                    host: required_non_empty_env("SMTP_HOST")?,
                    port,
                    username: required_non_empty_env("SMTP_USERNAME")?,
                    password: required_non_empty_env("SMTP_PASSWORD")?,
                    from_address: required_non_empty_env("SMTP_FROM_ADDRESS")?,
                })
            }
            other => {
                return Err(AppError::Validation(format!(
                    "EMAIL_PROVIDER must be either 'console' or 'smtp', got '{other}'"
                )));
            }
        };

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            session_secret,
            api_host,
            api_port,
            webauthn_rp_id,
            webauthn_rp_origin,
            cookie_secure,
            session_lifespan_minutes,
            grant_ttl_seconds,
            pairing_idle_timeout: Duration::from_secs(pairing_idle_timeout_seconds.unsigned_abs()),
            admin_api_token,
            email_provider,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

/// Parses an optional integer setting in `1..=max`, falling back to `default`
/// when the variable is unset or blank.
fn parse_positive(
    name: &str,
    raw: Option<String>,
    default: i64,
    max: i64,
) -> Result<i64, AppError> {
    let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
        return Ok(default);
    };

    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))?;

    if value <= 0 {
        return Err(AppError::Validation(format!("{name} must be positive")));
    }

    if value > max {
        return Err(AppError::Validation(format!("{name} must not exceed {max}")));
    }

    Ok(value)
}
