//! Delegated session issuing and verification.
//!
//! A session token always names the account acted upon (`subject`) and the
//! person holding the credential (`surrogate`). Guest sessions also carry
//! the relation that allows the delegation, and they never outlive the
//! relation's time allowance.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use keyshare_core::{AppError, AppResult, RelationId, SessionClaims, UserId};
use tracing::debug;

use crate::{Clock, GrantStore, SessionSigner, SignedSession, UserDirectory};

/// Signed session handed back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    /// Signed token.
    pub token: String,
    /// Claims encoded in the token.
    pub claims: SessionClaims,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}

/// Application service that issues and verifies session tokens.
#[derive(Clone)]
pub struct DelegatedSessionIssuer {
    signer: Arc<dyn SessionSigner>,
    grant_store: Arc<dyn GrantStore>,
    user_directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    session_lifespan: Duration,
}

impl DelegatedSessionIssuer {
    /// Creates a new session issuer.
    #[must_use]
    pub fn new(
        signer: Arc<dyn SessionSigner>,
        grant_store: Arc<dyn GrantStore>,
        user_directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        session_lifespan: Duration,
    ) -> Self {
        Self {
            signer,
            grant_store,
            user_directory,
            clock,
            session_lifespan,
        }
    }

    /// Issues a token for `surrogate` acting on `subject`.
    ///
    /// Delegated tokens must name a relation linking both accounts; their
    /// expiry is capped at the end of the relation's time allowance.
    pub async fn issue(
        &self,
        subject: UserId,
        surrogate: UserId,
        relation_id: Option<RelationId>,
    ) -> AppResult<IssuedSession> {
        let issued_at = self.clock.now();
        let mut expires_at = issued_at + self.session_lifespan;

        let claims = match relation_id {
            None if subject == surrogate => SessionClaims::for_self(subject),
            None => {
                return Err(AppError::Validation(
                    "delegated sessions require a guest relation".to_owned(),
                ));
            }
            Some(relation_id) => {
                let relation = self
                    .grant_store
                    .find_relation(relation_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("guest relation not found".to_owned()))?;

                if !relation.links(subject, surrogate) {
                    return Err(AppError::Forbidden(
                        "guest relation does not link these accounts".to_owned(),
                    ));
                }

                if let Some(allowance_ends_at) = relation.time_allowance_ends_at() {
                    expires_at = expires_at.min(allowance_ends_at);
                }

                SessionClaims::delegated(subject, surrogate, relation_id)
            }
        };

        let token = self.signer.sign(&SignedSession {
            claims,
            issued_at,
            expires_at,
        })?;

        debug!(
            subject = %subject,
            surrogate = %surrogate,
            delegated = !claims.is_primary_holder(),
            "issued session token"
        );

        Ok(IssuedSession {
            token,
            claims,
            expires_at,
        })
    }

    /// Verifies a token cryptographically and against current account and
    /// relation state.
    pub async fn verify(&self, token: &str) -> AppResult<SessionClaims> {
        let session = self.signer.verify(token)?;
        let claims = session.claims;

        if session.expires_at <= self.clock.now() {
            return Err(AppError::Unauthorized("session has expired".to_owned()));
        }

        if self
            .user_directory
            .find_user(claims.subject())
            .await?
            .is_none()
        {
            return Err(AppError::Unauthorized(
                "session account no longer exists".to_owned(),
            ));
        }

        if claims.is_primary_holder() {
            return Ok(claims);
        }

        let relation_id = claims
            .grant()
            .ok_or_else(|| AppError::Unauthorized("guest session is missing its grant".to_owned()))?;

        let relation_is_valid = self
            .grant_store
            .find_relation(relation_id)
            .await?
            .is_some_and(|relation| {
                relation.is_active() && relation.links(claims.subject(), claims.surrogate())
            });

        if !relation_is_valid {
            return Err(AppError::Unauthorized(
                "guest access is no longer active".to_owned(),
            ));
        }

        Ok(claims)
    }
}
