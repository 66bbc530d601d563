//! Shared primitives for all Rust crates in Keyshare.

#![forbid(unsafe_code)]

/// Session claim primitives shared across services.
pub mod auth;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use auth::SessionClaims;

/// Result type used across Keyshare crates.
pub type AppResult<T> = Result<T, AppError>;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a random ", $label, " identifier.")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Creates a ", $label, " identifier from an existing UUID value.")]
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            #[doc = concat!("Parses a ", $label, " identifier from its string form.")]
            pub fn parse(value: &str) -> AppResult<Self> {
                Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
                    AppError::Validation(format!(concat!("invalid ", $label, " id: {}"), error))
                })
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a user account.
    UserId,
    "user"
);

uuid_identifier!(
    /// Unique identifier for a one-time access grant.
    GrantId,
    "grant"
);

uuid_identifier!(
    /// Unique identifier for a standing guest relation.
    RelationId,
    "relation"
);

uuid_identifier!(
    /// Unique identifier for a post written on an account.
    PostId,
    "post"
);

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Session is missing or failed verification.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed to perform the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Time or login allowance has been used up.
    #[error("expired: {0}")]
    Expired(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, GrantId, RelationId, UserId};

    #[test]
    fn user_id_formats_as_uuid() {
        let user_id = UserId::new();
        assert_eq!(user_id.to_string().len(), 36);
    }

    #[test]
    fn grant_id_parse_rejects_garbage() {
        let result = GrantId::parse("not-a-uuid");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn relation_id_parse_round_trips_display() {
        let relation_id = RelationId::new();
        let parsed = RelationId::parse(&relation_id.to_string());
        assert!(matches!(parsed, Ok(value) if value == relation_id));
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let user_id = UserId::new();
        let encoded = serde_json::to_string(&user_id).unwrap_or_default();
        assert_eq!(encoded, format!("\"{user_id}\""));
    }
}
