//! HS256 session tokens.
//!
//! Tokens carry `sub` (account acted upon), `surrogate` (credential holder),
//! an optional `grant` (guest relation) plus `iat`/`exp` in Unix seconds.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use keyshare_application::{SessionSigner, SignedSession};
use keyshare_core::{AppError, AppResult, RelationId, SessionClaims, UserId};
use serde::{Deserialize, Serialize};

/// Minimum accepted signing secret length.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    surrogate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grant: Option<String>,
    iat: i64,
    exp: i64,
}

/// Session signer backed by an HMAC-SHA256 secret.
#[derive(Clone)]
pub struct JwtSessionSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionSigner {
    /// Creates a signer, rejecting secrets shorter than
    /// [`MIN_SESSION_SECRET_LEN`] characters.
    pub fn new(secret: &str) -> AppResult<Self> {
        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(AppError::Validation(format!(
                "SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} characters"
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

impl SessionSigner for JwtSessionSigner {
    fn sign(&self, session: &SignedSession) -> AppResult<String> {
        let claims = TokenClaims {
            sub: session.claims.subject().to_string(),
            surrogate: session.claims.surrogate().to_string(),
            grant: session.claims.grant().map(|relation_id| relation_id.to_string()),
            iat: session.issued_at.timestamp(),
            exp: session.expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign session token: {error}")))
    }

    fn verify(&self, token: &str) -> AppResult<SignedSession> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |error| match error.kind() {
                ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("session has expired".to_owned())
                }
                _ => AppError::Unauthorized("invalid session token".to_owned()),
            },
        )?;

        let claims = data.claims;
        let subject = parse_claim(&claims.sub, UserId::parse)?;
        let surrogate = parse_claim(&claims.surrogate, UserId::parse)?;
        let session_claims = match claims.grant.as_deref() {
            None if subject == surrogate => SessionClaims::for_self(subject),
            None => {
                return Err(AppError::Unauthorized(
                    "invalid session token".to_owned(),
                ));
            }
            Some(grant) => {
                SessionClaims::delegated(subject, surrogate, parse_claim(grant, RelationId::parse)?)
            }
        };

        Ok(SignedSession {
            claims: session_claims,
            issued_at: timestamp(claims.iat)?,
            expires_at: timestamp(claims.exp)?,
        })
    }
}

fn parse_claim<T>(value: &str, parse: impl FnOnce(&str) -> AppResult<T>) -> AppResult<T> {
    parse(value).map_err(|_| AppError::Unauthorized("invalid session token".to_owned()))
}

fn timestamp(seconds: i64) -> AppResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or_else(|| AppError::Unauthorized("invalid session token".to_owned()))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use keyshare_application::{SessionSigner, SignedSession};
    use keyshare_core::{AppError, RelationId, SessionClaims, UserId};

    use super::JwtSessionSigner;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn session(claims: SessionClaims, lifetime: Duration) -> SignedSession {
        let issued_at = Utc::now();
        SignedSession {
            claims,
            issued_at,
            expires_at: issued_at + lifetime,
        }
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(matches!(
            JwtSessionSigner::new("too-short"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn delegated_claims_survive_signing() {
        let signer = JwtSessionSigner::new(SECRET).unwrap_or_else(|_| unreachable!());
        let claims = SessionClaims::delegated(UserId::new(), UserId::new(), RelationId::new());

        let token = signer
            .sign(&session(claims, Duration::minutes(10)))
            .unwrap_or_else(|_| unreachable!());
        let verified = signer.verify(&token);

        assert!(matches!(verified, Ok(session) if session.claims == claims));
    }

    #[test]
    fn token_from_other_secret_is_unauthorized() {
        let signer = JwtSessionSigner::new(SECRET).unwrap_or_else(|_| unreachable!());
        let other = JwtSessionSigner::new("fedcba9876543210fedcba9876543210")
            .unwrap_or_else(|_| unreachable!());
        let token = other
            .sign(&session(
                SessionClaims::for_self(UserId::new()),
                Duration::minutes(10),
            ))
            .unwrap_or_else(|_| unreachable!());

        assert!(matches!(
            signer.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let signer = JwtSessionSigner::new(SECRET).unwrap_or_else(|_| unreachable!());
        let token = signer
            .sign(&session(
                SessionClaims::for_self(UserId::new()),
                Duration::minutes(-5),
            ))
            .unwrap_or_else(|_| unreachable!());

        assert!(matches!(
            signer.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
