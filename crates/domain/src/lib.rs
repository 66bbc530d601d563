//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod grant;
mod pairing;
mod post;
mod relation;
mod user;

pub use grant::{
    AccessGrant, DEFAULT_GRANT_TTL_SECONDS, ExpiryPolicy, MAX_GRANT_TTL_SECONDS, StoredAccessGrant,
};
pub use pairing::{
    ClientMetadata, Envelope, EnvelopePayload, PairingAction, PairingCode, PairingRole,
    ProtocolPayload,
};
pub use post::{MAX_POST_BODY_CHARS, Post, StoredPost};
pub use relation::{GuestRelation, StoredGuestRelation};
pub use user::EmailAddress;
