use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use keyshare_core::{AppError, AppResult, GrantId};
use keyshare_domain::{ClientMetadata, PairingRole};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::connection::PairingConnection;
use super::coordinator::{Command, Coordinator};
use crate::GrantFinalizer;

/// Idle time after which a pairing is closed.
pub const DEFAULT_PAIRING_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

const COMMAND_CAPACITY: usize = 64;

/// Tunables for pairing coordinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingConfig {
    /// Time without any event before both sides are disconnected.
    pub idle_timeout: Duration,
    /// Buffered outbound messages per connection before it is dropped.
    pub outbound_capacity: usize,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_PAIRING_IDLE_TIMEOUT,
            outbound_capacity: 32,
        }
    }
}

/// A connection asking to join a pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingParticipant {
    /// Side the connection plays.
    pub role: PairingRole,
    /// Account and client details of the connection.
    pub metadata: ClientMetadata,
}

struct CoordinatorHandle {
    generation: u64,
    commands: mpsc::Sender<Command>,
}

#[derive(Default)]
struct RegistryState {
    coordinators: Mutex<HashMap<GrantId, CoordinatorHandle>>,
    next_generation: AtomicU64,
}

impl RegistryState {
    fn lock(&self) -> AppResult<MutexGuard<'_, HashMap<GrantId, CoordinatorHandle>>> {
        self.coordinators.lock().map_err(|error| {
            AppError::Internal(format!("failed to lock pairing registry: {error}"))
        })
    }

    /// Removes the entry for a coordinator that has stopped, unless a newer
    /// coordinator already took its place.
    fn release(&self, grant_id: GrantId, generation: u64) {
        if let Ok(mut coordinators) = self.coordinators.lock()
            && coordinators
                .get(&grant_id)
                .is_some_and(|handle| handle.generation == generation)
        {
            coordinators.remove(&grant_id);
        }
    }

    fn forget(&self, grant_id: GrantId, commands: &mpsc::Sender<Command>) {
        if let Ok(mut coordinators) = self.coordinators.lock()
            && coordinators
                .get(&grant_id)
                .is_some_and(|handle| handle.commands.same_channel(commands))
        {
            coordinators.remove(&grant_id);
        }
    }
}

/// Lazily starts one coordinator per grant id and routes joins to it.
#[derive(Clone)]
pub struct PairingRegistry {
    state: Arc<RegistryState>,
    finalizer: Arc<dyn GrantFinalizer>,
    config: PairingConfig,
}

impl PairingRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(finalizer: Arc<dyn GrantFinalizer>, config: PairingConfig) -> Self {
        Self {
            state: Arc::new(RegistryState::default()),
            finalizer,
            config,
        }
    }

    /// Admits a connection to the pairing for `grant_id`.
    ///
    /// Fails with `Conflict` when the requested role is already taken. The
    /// connection is present in the pairing once this returns.
    pub async fn join(
        &self,
        grant_id: GrantId,
        participant: PairingParticipant,
    ) -> AppResult<PairingConnection> {
        // A coordinator that is shutting down can still be in the map; one
        // retry reaches its replacement.
        for _ in 0..2 {
            let commands = self.coordinator_for(grant_id)?;
            let (reply, response) = oneshot::channel();

            let register = Command::Register {
                participant: participant.clone(),
                reply,
            };
            if commands.send(register).await.is_err() {
                self.state.forget(grant_id, &commands);
                continue;
            }

            match response.await {
                Ok(result) => {
                    let registered = result?;
                    return Ok(PairingConnection::new(
                        grant_id,
                        registered.connection_id,
                        commands,
                        registered.outbound,
                    ));
                }
                Err(_) => self.state.forget(grant_id, &commands),
            }
        }

        Err(AppError::Internal(
            "pairing coordinator is unavailable".to_owned(),
        ))
    }

    /// Returns the number of grants with a running coordinator.
    #[must_use]
    pub fn active_pairings(&self) -> usize {
        self.state
            .lock()
            .map(|coordinators| coordinators.len())
            .unwrap_or_default()
    }

    fn coordinator_for(&self, grant_id: GrantId) -> AppResult<mpsc::Sender<Command>> {
        let mut coordinators = self.state.lock()?;

        if let Some(handle) = coordinators.get(&grant_id)
            && !handle.commands.is_closed()
        {
            return Ok(handle.commands.clone());
        }

        let generation = self.state.next_generation.fetch_add(1, Ordering::Relaxed);
        let (commands, receiver) = mpsc::channel(COMMAND_CAPACITY);
        coordinators.insert(
            grant_id,
            CoordinatorHandle {
                generation,
                commands: commands.clone(),
            },
        );

        let coordinator = Coordinator::new(grant_id, self.finalizer.clone(), self.config);
        let state = self.state.clone();
        tokio::spawn(async move {
            coordinator.run(receiver).await;
            state.release(grant_id, generation);
        });

        debug!(grant_id = %grant_id, generation, "started pairing coordinator");

        Ok(commands)
    }
}
