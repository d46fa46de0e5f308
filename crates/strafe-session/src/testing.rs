//! Scripted collaborators for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use strafe_net::{
    ConnectionStatus, DisconnectReason, EntityId, MapChange, Packet, PacketChannel, PacketKind,
    ParticipantId, StatusChange, UserCmd,
};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::content::{ContentError, ContentItem, ContentProvider, GamemodeLoader};
use crate::context::SessionContext;
use crate::entity::{Controllable, Entity, EntityDirectory, Interactable, Motion};
use crate::events::LifecycleEvent;
use crate::loader::SessionLoader;
use crate::state::{Role, SessionState};

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Connects instantly unless told to fail, answers MapChange requests from a
/// queue and records everything sent.
pub(crate) struct FakeChannel {
    connect_failures: Cell<u32>,
    connects: RefCell<Vec<Instant>>,
    replies: RefCell<VecDeque<MapChange>>,
    pub broadcasts: RefCell<Vec<Packet>>,
    pub sent: RefCell<Vec<(ParticipantId, Packet)>>,
    pub kicks: RefCell<Vec<DisconnectReason>>,
    pub status: watch::Sender<StatusChange>,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self {
            connect_failures: Cell::new(0),
            connects: RefCell::new(Vec::new()),
            replies: RefCell::new(VecDeque::new()),
            broadcasts: RefCell::new(Vec::new()),
            sent: RefCell::new(Vec::new()),
            kicks: RefCell::new(Vec::new()),
            status: watch::channel(StatusChange::default()).0,
        }
    }

    /// Queue the host's answer to the next MapChange request.
    pub fn reply_with(&self, client_index: ParticipantId, map_name: &str, gamemode: &str) {
        self.replies.borrow_mut().push_back(MapChange {
            client_index,
            map_name: map_name.to_string(),
            gamemode: gamemode.to_string(),
        });
    }

    pub fn fail_next_connects(&self, count: u32) {
        self.connect_failures.set(count);
    }

    pub fn connect_attempts(&self) -> usize {
        self.connects.borrow().len()
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.connects.borrow().clone()
    }

    pub fn broadcast_kinds(&self) -> Vec<PacketKind> {
        self.broadcasts.borrow().iter().map(Packet::kind).collect()
    }
}

impl PacketChannel for FakeChannel {
    async fn connect(&self, _address: &str, _port: u16, _password: Option<&str>) -> ConnectionStatus {
        self.connects.borrow_mut().push(Instant::now());
        let failures = self.connect_failures.get();
        if failures > 0 {
            self.connect_failures.set(failures - 1);
            return ConnectionStatus::Disconnected;
        }
        ConnectionStatus::Connected
    }

    fn send_to(&self, participant: ParticipantId, packet: Packet) {
        self.sent.borrow_mut().push((participant, packet));
    }

    fn broadcast(&self, packet: Packet) {
        self.broadcasts.borrow_mut().push(packet);
    }

    async fn wait_for(&self, kind: PacketKind, timeout: Duration) -> Option<Packet> {
        let reply = match kind {
            PacketKind::MapChange => self.replies.borrow_mut().pop_front(),
            _ => None,
        };
        match reply {
            Some(reply) => Some(Packet::MapChange(reply)),
            None => {
                tokio::time::sleep(timeout).await;
                None
            }
        }
    }

    fn disconnect_all(&self, reason: DisconnectReason) {
        self.kicks.borrow_mut().push(reason);
    }

    fn status(&self) -> watch::Receiver<StatusChange> {
        self.status.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Content and gamemodes
// ---------------------------------------------------------------------------

pub(crate) struct FakeContent {
    current: RefCell<Option<String>>,
    broken: RefCell<HashSet<String>>,
    loads: RefCell<Vec<String>>,
    items: RefCell<HashMap<u64, ContentItem>>,
    pub distribution_up: Cell<bool>,
    pub download_ok: Cell<bool>,
    pub sources: RefCell<Vec<ContentItem>>,
    pub clears: Cell<u32>,
    /// How long each `load_map` takes.
    pub load_delay: Cell<Duration>,
}

impl FakeContent {
    pub fn new() -> Self {
        Self {
            current: RefCell::new(None),
            broken: RefCell::new(HashSet::new()),
            loads: RefCell::new(Vec::new()),
            items: RefCell::new(HashMap::new()),
            distribution_up: Cell::new(true),
            download_ok: Cell::new(true),
            sources: RefCell::new(Vec::new()),
            clears: Cell::new(0),
            load_delay: Cell::new(Duration::ZERO),
        }
    }

    pub fn set_current(&self, map: &str) {
        *self.current.borrow_mut() = Some(map.to_string());
    }

    pub fn break_map(&self, map: &str) {
        self.broken.borrow_mut().insert(map.to_string());
    }

    pub fn publish_item(&self, id: u64, directory: &str) {
        self.items.borrow_mut().insert(
            id,
            ContentItem {
                id,
                directory: PathBuf::from(directory),
            },
        );
    }

    /// Maps passed to `load_map`, in call order.
    pub fn loads(&self) -> Vec<String> {
        self.loads.borrow().clone()
    }
}

impl ContentProvider for FakeContent {
    fn current_map(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    async fn load_map(&self, name: &str) -> Result<(), ContentError> {
        self.loads.borrow_mut().push(name.to_string());
        let delay = self.load_delay.get();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.broken.borrow().contains(name) {
            return Err(ContentError::MapLoadFailed {
                name: name.to_string(),
                reason: "corrupt".to_string(),
            });
        }
        *self.current.borrow_mut() = Some(name.to_string());
        Ok(())
    }

    fn distribution_available(&self) -> bool {
        self.distribution_up.get()
    }

    async fn resolve_item(&self, id: u64) -> Option<ContentItem> {
        self.items.borrow().get(&id).cloned()
    }

    async fn download_item(&self, _id: u64) -> bool {
        self.download_ok.get()
    }

    fn add_local_source(&self, item: &ContentItem) -> Result<(), ContentError> {
        self.sources.borrow_mut().push(item.clone());
        Ok(())
    }

    fn clear_downloads(&self) {
        self.clears.set(self.clears.get() + 1);
    }
}

pub(crate) struct FakeGamemodes {
    known: HashSet<String>,
    current: Option<String>,
    pub unloads: u32,
}

impl Default for FakeGamemodes {
    fn default() -> Self {
        Self {
            known: ["surf", "bhop"].into_iter().map(String::from).collect(),
            current: None,
            unloads: 0,
        }
    }
}

impl GamemodeLoader for FakeGamemodes {
    fn load_gamemode(&mut self, name: &str) -> bool {
        if !self.known.contains(name) {
            return false;
        }
        self.current = Some(name.to_string());
        true
    }

    fn current_gamemode(&self) -> Option<String> {
        self.current.clone()
    }

    fn unload(&mut self) {
        self.current = None;
        self.unloads += 1;
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HoverEvent {
    Enter(EntityId, ParticipantId),
    Exit(EntityId, ParticipantId),
}

pub(crate) struct FakeProp {
    id: EntityId,
    interactable: bool,
    log: Rc<RefCell<Vec<HoverEvent>>>,
}

impl Entity for FakeProp {
    fn as_interactable(&mut self) -> Option<&mut dyn Interactable> {
        if self.interactable {
            Some(self as &mut dyn Interactable)
        } else {
            None
        }
    }
}

impl Interactable for FakeProp {
    fn mouse_enter(&mut self, participant: ParticipantId) {
        self.log
            .borrow_mut()
            .push(HoverEvent::Enter(self.id, participant));
    }

    fn mouse_exit(&mut self, participant: ParticipantId) {
        self.log
            .borrow_mut()
            .push(HoverEvent::Exit(self.id, participant));
    }
}

/// Moves by `move_input` per command; velocity is ten times the input.
#[derive(Default)]
pub(crate) struct FakeHuman {
    motion: Motion,
    commands: Vec<(u32, bool)>,
}

impl Controllable for FakeHuman {
    fn run_command(&mut self, cmd: &UserCmd, is_prediction: bool) {
        self.commands.push((cmd.number, is_prediction));
        self.motion.origin += cmd.move_input;
        self.motion.velocity = cmd.move_input * 10.0;
    }

    fn motion(&self) -> Motion {
        self.motion
    }
}

#[derive(Default)]
pub(crate) struct FakeDirectory {
    props: HashMap<EntityId, FakeProp>,
    humans: HashMap<ParticipantId, FakeHuman>,
    pub hover_log: Rc<RefCell<Vec<HoverEvent>>>,
}

impl FakeDirectory {
    pub fn add_prop(&mut self, id: EntityId, interactable: bool) {
        let log = Rc::clone(&self.hover_log);
        self.props.insert(
            id,
            FakeProp {
                id,
                interactable,
                log,
            },
        );
    }

    pub fn remove_prop(&mut self, id: EntityId) {
        self.props.remove(&id);
    }

    pub fn add_human(&mut self, participant: ParticipantId) {
        self.humans.insert(participant, FakeHuman::default());
    }

    /// `(number, is_prediction)` of every command `participant`'s entity ran.
    pub fn commands_run(&self, participant: ParticipantId) -> Vec<(u32, bool)> {
        self.humans
            .get(&participant)
            .map(|human| human.commands.clone())
            .unwrap_or_default()
    }
}

impl EntityDirectory for FakeDirectory {
    fn find(&mut self, id: EntityId) -> Option<&mut dyn Entity> {
        self.props
            .get_mut(&id)
            .map(|prop| prop as &mut dyn Entity)
    }

    fn controlled_by(&mut self, participant: ParticipantId) -> Option<&mut dyn Controllable> {
        self.humans
            .get_mut(&participant)
            .map(|human| human as &mut dyn Controllable)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// One simulation's worth of fakes plus the context wrapping them.
pub(crate) struct Harness {
    pub network: Rc<FakeChannel>,
    pub content: Rc<FakeContent>,
    pub gamemodes: Rc<RefCell<FakeGamemodes>>,
    pub ctx: SessionContext<FakeChannel, FakeContent>,
}

impl Harness {
    pub fn new(role: Role) -> Self {
        let network = Rc::new(FakeChannel::new());
        let content = Rc::new(FakeContent::new());
        let gamemodes = Rc::new(RefCell::new(FakeGamemodes::default()));
        let shared: Rc<RefCell<dyn GamemodeLoader>> = gamemodes.clone();
        let ctx = SessionContext::new(role, Rc::clone(&network), Rc::clone(&content), shared);
        Self {
            network,
            content,
            gamemodes,
            ctx,
        }
    }

    pub fn loader(&self) -> SessionLoader<FakeChannel, FakeContent> {
        SessionLoader::new(self.ctx.clone())
    }
}

/// Record every lifecycle event `loader` fires from now on.
pub(crate) fn record_events(
    loader: &SessionLoader<FakeChannel, FakeContent>,
) -> Rc<RefCell<Vec<LifecycleEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    for event in [
        LifecycleEvent::PreGameLoaded,
        LifecycleEvent::GameLoaded,
        LifecycleEvent::PreGameUnloaded,
        LifecycleEvent::GameUnloaded,
    ] {
        let sink = Rc::clone(&events);
        loader.subscribe(event, move || sink.borrow_mut().push(event));
    }
    events
}

/// Record every state `loader` enters from now on.
pub(crate) fn record_states(
    loader: &SessionLoader<FakeChannel, FakeContent>,
) -> Rc<RefCell<Vec<SessionState>>> {
    let states = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&states);
    loader.subscribe_state_changes(move |_, next| sink.borrow_mut().push(next));
    states
}
