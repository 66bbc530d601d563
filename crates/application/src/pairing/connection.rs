use keyshare_core::GrantId;
use keyshare_domain::Envelope;
use tokio::sync::mpsc;

use super::coordinator::Command;

/// An admitted pairing connection.
pub struct PairingConnection {
    grant_id: GrantId,
    inbound: PairingInbound,
    outbound: mpsc::Receiver<Envelope>,
}

impl PairingConnection {
    pub(super) fn new(
        grant_id: GrantId,
        connection_id: u64,
        commands: mpsc::Sender<Command>,
        outbound: mpsc::Receiver<Envelope>,
    ) -> Self {
        Self {
            grant_id,
            inbound: PairingInbound {
                connection_id,
                commands,
                left: false,
            },
            outbound,
        }
    }

    /// Returns the grant this connection pairs on.
    #[must_use]
    pub fn grant_id(&self) -> GrantId {
        self.grant_id
    }

    /// Splits into the client-to-coordinator half and the stream of
    /// envelopes to deliver to the client.
    ///
    /// The outbound stream ends when the coordinator closes this connection.
    #[must_use]
    pub fn split(self) -> (PairingInbound, mpsc::Receiver<Envelope>) {
        (self.inbound, self.outbound)
    }
}

/// Sends client messages into the coordinator.
///
/// Dropping it unregisters the connection.
pub struct PairingInbound {
    connection_id: u64,
    commands: mpsc::Sender<Command>,
    left: bool,
}

impl PairingInbound {
    /// Hands raw client text to the coordinator. Returns `false` once the
    /// coordinator is gone.
    pub async fn forward(&self, text: String) -> bool {
        self.commands
            .send(Command::Inbound {
                connection_id: self.connection_id,
                text,
            })
            .await
            .is_ok()
    }

    /// Unregisters the connection, waiting for queue space.
    pub async fn leave(mut self) {
        self.left = true;
        let _ = self
            .commands
            .send(Command::Unregister {
                connection_id: self.connection_id,
            })
            .await;
    }
}

impl Drop for PairingInbound {
    fn drop(&mut self) {
        if !self.left {
            // Closed outbound channels are pruned by the coordinator if this
            // does not get through.
            let _ = self.commands.try_send(Command::Unregister {
                connection_id: self.connection_id,
            });
        }
    }
}
