//! Per-tick command routing: prediction, authoritative application,
//! host-side coalescing and hover dispatch.
//!
//! The host runs every inbound command on the issuing participant's entity,
//! copies the authoritative result into a per-participant slot and broadcasts
//! each slot once per tick. Clients run their own commands predictively and
//! send a copy to the host.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use strafe_net::{EntityId, Packet, PacketChannel, ParticipantId, SendCategory, UserCmd};
use tokio::sync::{mpsc, watch};

use crate::context::SessionContext;
use crate::entity::{EntityDirectory, Interactable};
use crate::state::{Role, SessionState};

/// Work queued for the simulation thread from transport callbacks.
#[derive(Debug, Clone)]
pub enum RouterInput {
    /// A command received from `participant`.
    Command {
        participant: ParticipantId,
        cmd: UserCmd,
    },
    /// `participant` left.
    Disconnected(ParticipantId),
}

type RunCommandObserver = Box<dyn FnMut(ParticipantId, &UserCmd)>;

/// Synchronizes per-tick input between clients and the host.
pub struct CommandRouter<N, E> {
    role: Role,
    network: Rc<N>,
    entities: E,
    /// Last interactable each participant hovered.
    hovered: HashMap<ParticipantId, EntityId>,
    /// Canonical command per participant for the current tick (host only).
    pending: BTreeMap<ParticipantId, UserCmd>,
    run_command_observers: Vec<RunCommandObserver>,
    inbox_tx: mpsc::UnboundedSender<RouterInput>,
    inbox_rx: mpsc::UnboundedReceiver<RouterInput>,
    session_state: Option<watch::Receiver<SessionState>>,
}

impl<N: PacketChannel, E: EntityDirectory> CommandRouter<N, E> {
    /// Create a router sharing `ctx`'s channel and role.
    pub fn new<C>(ctx: &SessionContext<N, C>, entities: E) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            role: ctx.role,
            network: Rc::clone(&ctx.network),
            entities,
            hovered: HashMap::new(),
            pending: BTreeMap::new(),
            run_command_observers: Vec::new(),
            inbox_tx,
            inbox_rx,
            session_state: None,
        }
    }

    /// Only route commands while `state` reads [`SessionState::Playing`].
    pub fn with_session_state(mut self, state: watch::Receiver<SessionState>) -> Self {
        self.session_state = Some(state);
        self
    }

    /// The entity directory.
    pub fn entities(&self) -> &E {
        &self.entities
    }

    /// Mutable access to the entity directory.
    pub fn entities_mut(&mut self) -> &mut E {
        &mut self.entities
    }

    /// Called with the participant and command after an authoritative or
    /// predicted run.
    pub fn subscribe_run_command(&mut self, observer: impl FnMut(ParticipantId, &UserCmd) + 'static) {
        self.run_command_observers.push(Box::new(observer));
    }

    fn is_active(&self) -> bool {
        self.session_state
            .as_ref()
            .is_none_or(|state| *state.borrow() == SessionState::Playing)
    }

    /// Apply one command from `participant`.
    ///
    /// `is_prediction` marks a local client running its own input ahead of
    /// the host. On a client the predicted result is written back into `cmd`
    /// and a copy goes to the host. A participant without a controlled entity
    /// still gets hover tracking.
    pub fn handle_user_command(
        &mut self,
        participant: ParticipantId,
        cmd: &mut UserCmd,
        is_prediction: bool,
    ) {
        if !self.is_active() {
            tracing::trace!("Dropping command from {participant}: not playing");
            return;
        }

        let authoritative = self.role == Role::Host;
        let motion = match self.entities.controlled_by(participant) {
            Some(controlled) => {
                controlled.run_command(cmd, is_prediction);
                Some(controlled.motion())
            }
            None => {
                tracing::debug!("No controlled entity for {participant}, tracking hover only");
                None
            }
        };

        if let Some(motion) = motion {
            if authoritative && !is_prediction {
                let slot = self.pending.entry(participant).or_default();
                slot.clone_from(cmd);
                slot.client_index = participant;
                slot.origin = motion.origin;
                slot.velocity = motion.velocity;
                slot.base_velocity = motion.base_velocity;
                slot.send_category = SendCategory::UnreliableSequenced;
            } else if !authoritative && is_prediction {
                cmd.client_index = participant;
                cmd.origin = motion.origin;
                cmd.velocity = motion.velocity;
                cmd.base_velocity = motion.base_velocity;
                cmd.send_category = SendCategory::ReliableSequenced;
                self.network.broadcast(Packet::UserCmd(cmd.clone()));
            }
        }

        if authoritative || is_prediction {
            if motion.is_some() {
                for observer in &mut self.run_command_observers {
                    observer(participant, cmd);
                }
            }
            self.update_hover(participant, cmd.hovered_entity);
        }
    }

    /// Resolve `id` to a live entity with the interactable capability.
    fn resolve_interactable(&mut self, id: EntityId) -> Option<&mut dyn Interactable> {
        if id.is_none() {
            return None;
        }
        self.entities.find(id)?.as_interactable()
    }

    /// Exit fires first; a switch to a new target enters on the next command.
    fn update_hover(&mut self, participant: ParticipantId, hovered: EntityId) {
        let previous = self.hovered.get(&participant).copied();
        let current = self.resolve_interactable(hovered).is_some().then_some(hovered);

        match (previous, current) {
            (Some(old), current) if current != Some(old) => {
                if let Some(target) = self.resolve_interactable(old) {
                    target.mouse_exit(participant);
                }
                self.hovered.remove(&participant);
                tracing::trace!("{participant} stopped hovering {old}");
            }
            (None, Some(new)) => {
                if let Some(target) = self.resolve_interactable(new) {
                    target.mouse_enter(participant);
                }
                self.hovered.insert(participant, new);
                tracing::trace!("{participant} started hovering {new}");
            }
            _ => {}
        }
    }

    /// Entity `participant` currently hovers, if any.
    pub fn hovered_entity(&self, participant: ParticipantId) -> Option<EntityId> {
        self.hovered.get(&participant).copied()
    }

    /// Number of canonical commands waiting for the next tick.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Canonical command queued for `participant` this tick.
    pub fn pending_command(&self, participant: ParticipantId) -> Option<&UserCmd> {
        self.pending.get(&participant)
    }

    /// Tick boundary: broadcast every coalesced command once and clear the
    /// table. Returns the number of commands sent.
    pub fn tick(&mut self) -> usize {
        if !self.is_active() {
            self.pending.clear();
            return 0;
        }

        let mut sent = 0;
        while let Some((_, cmd)) = self.pending.pop_first() {
            self.network.broadcast(Packet::UserCmd(cmd));
            sent += 1;
        }
        if sent > 0 {
            tracing::trace!("Broadcast {sent} canonical commands");
        }
        sent
    }

    /// Forget a participant's hover entry and pending command.
    ///
    /// No `mouse_exit` is sent to the entity the participant was hovering.
    pub fn on_participant_disconnected(&mut self, participant: ParticipantId) {
        if let Some(entity) = self.hovered.remove(&participant) {
            tracing::debug!("{participant} disconnected while hovering {entity}");
        }
        if self.role == Role::Host {
            self.pending.remove(&participant);
        }
    }

    /// Route an inbound packet. Only [`Packet::UserCmd`] is handled.
    ///
    /// On the host the sender is the issuing participant. On a client the
    /// packet is the host's echo and names its participant itself.
    pub fn on_packet(&mut self, from: ParticipantId, packet: Packet) {
        match packet {
            Packet::UserCmd(mut cmd) => {
                let participant = match self.role {
                    Role::Host => from,
                    Role::Client => cmd.client_index,
                };
                self.handle_user_command(participant, &mut cmd, false);
            }
            other => tracing::trace!("Router ignoring {:?} from {from}", other.kind()),
        }
    }

    /// Sender for queueing work from other threads.
    pub fn inbox(&self) -> mpsc::UnboundedSender<RouterInput> {
        self.inbox_tx.clone()
    }

    /// Apply everything queued through [`inbox`](Self::inbox). Returns the
    /// number of inputs handled.
    pub fn drain_inbox(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(input) = self.inbox_rx.try_recv() {
            match input {
                RouterInput::Command {
                    participant,
                    mut cmd,
                } => self.handle_user_command(participant, &mut cmd, false),
                RouterInput::Disconnected(participant) => {
                    self.on_participant_disconnected(participant)
                }
            }
            handled += 1;
        }
        handled
    }
}
