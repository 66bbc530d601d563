//! Application services and ports for account delegation.

#![forbid(unsafe_code)]

mod account_service;
mod delegation_ports;
mod grant_lifecycle_service;
mod guest_access_service;
mod pairing;
mod post_service;
mod session_issuer;

#[cfg(test)]
mod test_support;

pub use account_service::{AccountService, EnsuredAccount};
pub use delegation_ports::{
    Clock, DeactivationReport, EmailService, GrantStore, LoginAuditRecord, LoginAuditRepository,
    LoginContext, NewLoginAudit, PostRepository, SecretHasher, SessionSigner, SignedSession,
    SystemClock, UserDirectory, UserRecord,
};
pub use grant_lifecycle_service::{
    BeginShareInput, GrantFinalizer, GrantLifecycleService, ShareInvitation,
};
pub use guest_access_service::{GuestAccessService, RelationOverview};
pub use pairing::{
    DEFAULT_PAIRING_IDLE_TIMEOUT, PairingConfig, PairingConnection, PairingInbound,
    PairingParticipant, PairingRegistry,
};
pub use post_service::{DEFAULT_POST_PAGE_SIZE, PostAttribution, PostEntry, PostService};
pub use session_issuer::{DelegatedSessionIssuer, IssuedSession};
