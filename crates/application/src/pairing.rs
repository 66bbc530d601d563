//! Realtime pairing between a grant holder and a prospective guest.
//!
//! Each grant id with live connections is served by exactly one coordinator
//! task that owns all pairing state for it. Connections talk to their
//! coordinator only through its command channel.

mod connection;
mod coordinator;
mod registry;

pub use connection::{PairingConnection, PairingInbound};
pub use registry::{
    DEFAULT_PAIRING_IDLE_TIMEOUT, PairingConfig, PairingParticipant, PairingRegistry,
};
