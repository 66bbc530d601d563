use chrono::{DateTime, Utc};
use keyshare_core::{AppResult, SessionClaims};

/// Port for salted one-way hashing of grant tokens. Keeps the application
/// layer free of direct cryptographic library coupling.
pub trait SecretHasher: Send + Sync {
    /// Hashes a plaintext secret with a fresh salt.
    fn hash_secret(&self, secret: &str) -> AppResult<String>;

    /// Verifies a plaintext secret against a stored hash.
    /// Must run in constant time regardless of validity.
    fn verify_secret(&self, secret: &str, hash: &str) -> AppResult<bool>;
}

/// Claims plus validity window as carried inside a signed session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedSession {
    /// Verified subject, surrogate and grant.
    pub claims: SessionClaims,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

/// Port for signing and verifying session tokens.
pub trait SessionSigner: Send + Sync {
    /// Produces a signed token for the session.
    fn sign(&self, session: &SignedSession) -> AppResult<String>;

    /// Checks the signature and expiry of a token and returns its contents.
    /// Fails with `Unauthorized` for any invalid token.
    fn verify(&self, token: &str) -> AppResult<SignedSession>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
