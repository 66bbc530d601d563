//! Argon2id hasher for grant tokens.
//!
//! Uses OWASP-recommended Argon2id parameters:
//! m=19456 (19 MiB), t=2, p=1.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use keyshare_application::SecretHasher;
use keyshare_core::{AppError, AppResult};

/// Argon2id token hasher with recommended parameters.
#[derive(Clone)]
pub struct Argon2SecretHasher {
    argon2: Argon2<'static>,
}

impl Argon2SecretHasher {
    /// Creates a new Argon2id hasher with recommended parameters.
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(19456, 2, 1, None).unwrap_or_else(|_| Params::default());

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2SecretHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretHasher for Argon2SecretHasher {
    fn hash_secret(&self, secret: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);

        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|error| AppError::Internal(format!("failed to hash grant token: {error}")))?;

        Ok(hash.to_string())
    }

    fn verify_secret(&self, secret: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash).map_err(|error| {
            AppError::Internal(format!("failed to parse grant token hash: {error}"))
        })?;

        // argon2 compares digests in constant time.
        match self.argon2.verify_password(secret.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(error) => Err(AppError::Internal(format!(
                "grant token verification failed: {error}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use keyshare_application::SecretHasher;
    use keyshare_core::AppResult;

    use super::Argon2SecretHasher;

    #[test]
    fn matching_token_verifies() -> AppResult<()> {
        let hasher = Argon2SecretHasher::new();
        let hash = hasher.hash_secret("6f1c0a")?;

        assert!(hasher.verify_secret("6f1c0a", &hash)?);
        assert!(!hasher.verify_secret("6f1c0b", &hash)?);
        Ok(())
    }

    #[test]
    fn same_token_hashes_differently() -> AppResult<()> {
        let hasher = Argon2SecretHasher::new();

        assert_ne!(hasher.hash_secret("token")?, hasher.hash_secret("token")?);
        Ok(())
    }
}
