//! Ports consumed by the delegation services.
//!
//! Infrastructure provides PostgreSQL, in-memory, Argon2, JWT and mail
//! implementations of these traits.

mod accounts;
mod grant_store;
mod login_audit;
mod notifications;
mod posts;
mod security;

pub use accounts::{UserDirectory, UserRecord};
pub use grant_store::{DeactivationReport, GrantStore};
pub use login_audit::{LoginAuditRecord, LoginAuditRepository, LoginContext, NewLoginAudit};
pub use notifications::EmailService;
pub use posts::PostRepository;
pub use security::{Clock, SecretHasher, SessionSigner, SignedSession, SystemClock};
