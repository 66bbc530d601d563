use std::sync::Arc;

use keyshare_core::{AppError, AppResult, GrantId, UserId};
use keyshare_domain::{Envelope, PairingAction, PairingCode, PairingRole, ProtocolPayload};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use super::registry::{PairingConfig, PairingParticipant};
use crate::GrantFinalizer;

/// Events processed by a coordinator, in arrival order.
pub(super) enum Command {
    Register {
        participant: PairingParticipant,
        reply: oneshot::Sender<AppResult<Registered>>,
    },
    Unregister {
        connection_id: u64,
    },
    Inbound {
        connection_id: u64,
        text: String,
    },
}

pub(super) struct Registered {
    pub(super) connection_id: u64,
    pub(super) outbound: mpsc::Receiver<Envelope>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Empty,
    HolderPresent,
    GuestPresent,
    BothPresent,
    ConfirmRequested,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct Member {
    connection_id: u64,
    participant: PairingParticipant,
    sender: mpsc::Sender<Envelope>,
}

impl Member {
    fn user_id(&self) -> UserId {
        self.participant.metadata.user_id
    }
}

/// Owns the pairing state of one grant id.
pub(super) struct Coordinator {
    grant_id: GrantId,
    finalizer: Arc<dyn GrantFinalizer>,
    config: PairingConfig,
    holder: Option<Member>,
    guest: Option<Member>,
    confirm_requested: bool,
    finalized: bool,
    next_connection_id: u64,
}

impl Coordinator {
    pub(super) fn new(
        grant_id: GrantId,
        finalizer: Arc<dyn GrantFinalizer>,
        config: PairingConfig,
    ) -> Self {
        Self {
            grant_id,
            finalizer,
            config,
            holder: None,
            guest: None,
            confirm_requested: false,
            finalized: false,
            next_connection_id: 0,
        }
    }

    /// Processes commands until the pairing ends, empties or idles out.
    pub(super) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut deadline = Instant::now() + self.config.idle_timeout;

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    deadline = Instant::now() + self.config.idle_timeout;

                    if self.handle(command).await == Flow::Stop {
                        break;
                    }
                }
                () = sleep_until(deadline) => {
                    self.time_out();
                    break;
                }
            }
        }

        debug!(grant_id = %self.grant_id, phase = ?self.phase(), "pairing coordinator stopped");
    }

    fn phase(&self) -> Phase {
        if self.finalized {
            return Phase::Finalized;
        }

        match (&self.holder, &self.guest) {
            (None, None) => Phase::Empty,
            (Some(_), None) => Phase::HolderPresent,
            (None, Some(_)) => Phase::GuestPresent,
            (Some(_), Some(_)) if self.confirm_requested => Phase::ConfirmRequested,
            (Some(_), Some(_)) => Phase::BothPresent,
        }
    }

    async fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Register { participant, reply } => self.register(participant, reply),
            Command::Unregister { connection_id } => self.unregister(connection_id),
            Command::Inbound {
                connection_id,
                text,
            } => self.inbound(connection_id, text).await,
        }

        if self.phase() == Phase::Empty || self.phase() == Phase::Finalized {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn register(
        &mut self,
        participant: PairingParticipant,
        reply: oneshot::Sender<AppResult<Registered>>,
    ) {
        self.prune_closed();

        let role = participant.role;
        if self.slot(role).is_some() {
            debug!(grant_id = %self.grant_id, role = role.as_str(), "pairing slot already taken");
            let _ = reply.send(Err(AppError::Conflict(format!(
                "pairing already has a {} connection",
                role.as_str()
            ))));
            return;
        }

        self.next_connection_id += 1;
        let connection_id = self.next_connection_id;
        let (sender, outbound) = mpsc::channel(self.config.outbound_capacity);
        let user_id = participant.metadata.user_id;
        *self.slot_mut(role) = Some(Member {
            connection_id,
            participant,
            sender,
        });

        self.send(
            role,
            ProtocolPayload::new(PairingCode::ConnectedSession, "connected to pairing"),
        );

        if self.phase() == Phase::BothPresent {
            self.announce_both_present();
        }

        if reply
            .send(Ok(Registered {
                connection_id,
                outbound,
            }))
            .is_err()
        {
            self.unregister(connection_id);
            return;
        }

        info!(
            grant_id = %self.grant_id,
            user_id = %user_id,
            role = role.as_str(),
            "pairing connection joined"
        );
    }

    fn announce_both_present(&mut self) {
        let all_present =
            ProtocolPayload::new(PairingCode::AllPartiesPresent, "both parties are connected");
        self.send(PairingRole::Guest, all_present.clone());
        self.send(PairingRole::Holder, all_present);

        self.send(
            PairingRole::Holder,
            ProtocolPayload::new(
                PairingCode::IsPrimaryAccountHolder,
                "you are the primary account holder",
            ),
        );

        if let Some(metadata) = self
            .guest
            .as_ref()
            .map(|guest| guest.participant.metadata.clone())
        {
            self.send(
                PairingRole::Holder,
                ProtocolPayload::client_information(metadata),
            );
        }
    }

    fn unregister(&mut self, connection_id: u64) {
        let Some(role) = self.role_of(connection_id) else {
            return;
        };

        *self.slot_mut(role) = None;
        info!(grant_id = %self.grant_id, role = role.as_str(), "pairing connection left");
        self.announce_departure(role);
    }

    fn announce_departure(&mut self, role: PairingRole) {
        self.confirm_requested = false;
        self.send(
            other_role(role),
            ProtocolPayload::new(PairingCode::PartyDisconnected, "the other party disconnected"),
        );
    }

    async fn inbound(&mut self, connection_id: u64, text: String) {
        let Some(role) = self.role_of(connection_id) else {
            return;
        };

        match PairingAction::parse(&text) {
            Some(PairingAction::Deny) => self.deny(role),
            Some(PairingAction::Confirm) => self.request_confirmation(role),
            Some(PairingAction::Finalize) => self.finalize(role).await,
            None => self.relay(role, text),
        }
    }

    fn deny(&mut self, role: PairingRole) {
        if self.guest.is_none() {
            self.violation(role, "there is no guest to deny");
            return;
        }

        self.send(
            PairingRole::Guest,
            ProtocolPayload::new(PairingCode::DenyGrant, "the pairing was denied"),
        );
        self.guest = None;
        self.confirm_requested = false;
        self.send(
            PairingRole::Holder,
            ProtocolPayload::new(PairingCode::DenyGrant, "the pairing was denied"),
        );

        info!(grant_id = %self.grant_id, denied_by = role.as_str(), "pairing denied");
    }

    fn request_confirmation(&mut self, role: PairingRole) {
        let phase = self.phase();
        if role != PairingRole::Guest
            || !matches!(phase, Phase::BothPresent | Phase::ConfirmRequested)
        {
            self.violation(role, "only a paired guest can request confirmation");
            return;
        }

        self.confirm_requested = true;
        self.send(
            PairingRole::Holder,
            ProtocolPayload::new(
                PairingCode::InitializeGrantConfirm,
                "the guest asks for access to your account",
            ),
        );
    }

    async fn finalize(&mut self, role: PairingRole) {
        if role != PairingRole::Holder || self.phase() != Phase::ConfirmRequested {
            self.violation(role, "only the holder can approve a requested confirmation");
            return;
        }

        let (Some(holder_id), Some(guest_id)) = (
            self.holder.as_ref().map(Member::user_id),
            self.guest.as_ref().map(Member::user_id),
        ) else {
            return;
        };

        match self
            .finalizer
            .finalize_grant(self.grant_id, holder_id, guest_id)
            .await
        {
            Ok(relation) => {
                let success = ProtocolPayload::new(
                    PairingCode::AccessGrantSuccess,
                    "guest access is now active",
                );
                self.send(PairingRole::Guest, success.clone());
                self.send(PairingRole::Holder, success);

                info!(
                    grant_id = %self.grant_id,
                    relation_id = %relation.id(),
                    "pairing finalized"
                );

                self.finalized = true;
                self.holder = None;
                self.guest = None;
            }
            Err(error) => {
                warn!(grant_id = %self.grant_id, error = %error, "pairing finalize failed");
                self.confirm_requested = false;
                self.send(
                    PairingRole::Holder,
                    ProtocolPayload::new(PairingCode::AccessGrantFailed, failure_message(&error)),
                );
            }
        }
    }

    fn relay(&mut self, role: PairingRole, text: String) {
        let Some(sender_id) = self.slot(role).map(Member::user_id) else {
            return;
        };

        let target = other_role(role);
        let Some(member) = self.slot(target) else {
            return;
        };

        if member
            .sender
            .try_send(Envelope::relay(sender_id, text))
            .is_err()
        {
            self.drop_member(target);
        }
    }

    fn violation(&mut self, role: PairingRole, message: &str) {
        self.send(
            role,
            ProtocolPayload::new(PairingCode::ProtocolViolation, message),
        );
    }

    fn time_out(&mut self) {
        info!(grant_id = %self.grant_id, phase = ?self.phase(), "pairing idle timeout");

        let timed_out =
            ProtocolPayload::new(PairingCode::PairingTimedOut, "the pairing timed out");
        self.send(PairingRole::Guest, timed_out.clone());
        self.send(PairingRole::Holder, timed_out);
        self.holder = None;
        self.guest = None;
    }

    /// Queues a protocol event for the member in `role`, dropping the member
    /// when its queue is full or closed.
    fn send(&mut self, role: PairingRole, payload: ProtocolPayload) {
        let Some(member) = self.slot(role) else {
            return;
        };

        if member
            .sender
            .try_send(Envelope::protocol(member.user_id(), payload))
            .is_err()
        {
            self.drop_member(role);
        }
    }

    fn drop_member(&mut self, role: PairingRole) {
        if self.slot_mut(role).take().is_none() {
            return;
        }

        warn!(grant_id = %self.grant_id, role = role.as_str(), "dropped unresponsive pairing connection");
        self.announce_departure(role);
    }

    fn prune_closed(&mut self) {
        for role in [PairingRole::Holder, PairingRole::Guest] {
            if self
                .slot(role)
                .is_some_and(|member| member.sender.is_closed())
            {
                self.drop_member(role);
            }
        }
    }

    fn role_of(&self, connection_id: u64) -> Option<PairingRole> {
        [PairingRole::Holder, PairingRole::Guest]
            .into_iter()
            .find(|role| {
                self.slot(*role)
                    .is_some_and(|member| member.connection_id == connection_id)
            })
    }

    fn slot(&self, role: PairingRole) -> Option<&Member> {
        match role {
            PairingRole::Holder => self.holder.as_ref(),
            PairingRole::Guest => self.guest.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: PairingRole) -> &mut Option<Member> {
        match role {
            PairingRole::Holder => &mut self.holder,
            PairingRole::Guest => &mut self.guest,
        }
    }
}

fn other_role(role: PairingRole) -> PairingRole {
    match role {
        PairingRole::Holder => PairingRole::Guest,
        PairingRole::Guest => PairingRole::Holder,
    }
}

/// Client-safe description of a finalize failure.
fn failure_message(error: &AppError) -> &'static str {
    match error {
        AppError::NotFound(_) => "the access grant is no longer available",
        AppError::Expired(_) => "the access grant has expired",
        AppError::Conflict(_) => "the guest already has access to this account",
        AppError::Forbidden(_) => "only the grant owner can approve it",
        AppError::Validation(_) => "the guest cannot be paired with this account",
        AppError::Unauthorized(_) | AppError::Internal(_) => {
            "the access grant could not be activated"
        }
    }
}
