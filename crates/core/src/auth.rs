use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, RelationId, UserId};

/// Verified claims carried by a session token.
///
/// `subject` is the account being acted upon and `surrogate` is the person
/// holding the credential. They differ only for guest sessions, which also
/// name the guest relation that authorizes the delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    subject: UserId,
    surrogate: UserId,
    grant: Option<RelationId>,
}

impl SessionClaims {
    /// Creates claims for a user acting as themselves.
    #[must_use]
    pub fn for_self(user_id: UserId) -> Self {
        Self {
            subject: user_id,
            surrogate: user_id,
            grant: None,
        }
    }

    /// Creates claims for a guest acting on a parent account.
    #[must_use]
    pub fn delegated(parent_id: UserId, guest_id: UserId, relation_id: RelationId) -> Self {
        Self {
            subject: parent_id,
            surrogate: guest_id,
            grant: Some(relation_id),
        }
    }

    /// Returns the account the session acts upon.
    #[must_use]
    pub fn subject(&self) -> UserId {
        self.subject
    }

    /// Returns the credential holder behind the session.
    #[must_use]
    pub fn surrogate(&self) -> UserId {
        self.surrogate
    }

    /// Returns the guest relation backing a delegated session.
    #[must_use]
    pub fn grant(&self) -> Option<RelationId> {
        self.grant
    }

    /// Returns whether the credential holder owns the account in use.
    #[must_use]
    pub fn is_primary_holder(&self) -> bool {
        self.subject == self.surrogate
    }

    /// Returns the account id when the session belongs to its primary holder.
    pub fn require_primary_holder(&self) -> AppResult<UserId> {
        if self.is_primary_holder() {
            return Ok(self.subject);
        }

        Err(AppError::Forbidden(
            "action requires the primary account holder".to_owned(),
        ))
    }
}
