//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_secret_hasher;
mod console_email_service;
mod in_memory_grant_store;
mod in_memory_post_repository;
mod in_memory_user_directory;
mod jwt_session_signer;
mod postgres_grant_store;
mod postgres_login_audit_repository;
mod postgres_passkey_repository;
mod postgres_post_repository;
mod postgres_user_directory;
mod smtp_email_service;

pub use argon2_secret_hasher::Argon2SecretHasher;
pub use console_email_service::ConsoleEmailService;
pub use in_memory_grant_store::InMemoryGrantStore;
pub use in_memory_post_repository::InMemoryPostRepository;
pub use in_memory_user_directory::InMemoryUserDirectory;
pub use jwt_session_signer::{JwtSessionSigner, MIN_SESSION_SECRET_LEN};
pub use postgres_grant_store::PostgresGrantStore;
pub use postgres_login_audit_repository::PostgresLoginAuditRepository;
pub use postgres_passkey_repository::PostgresPasskeyRepository;
pub use postgres_post_repository::PostgresPostRepository;
pub use postgres_user_directory::PostgresUserDirectory;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
