//! Session loader: joining, creating, map changes and map-change reconnects.
//!
//! Every load sequence is a chain of awaited steps. Cancellation is
//! cooperative: [`SessionLoader::cancel`] raises a flag that is checked
//! between steps and releases the handshake wait, but an in-flight connect or
//! map load is allowed to finish and its result is discarded.
//!
//! The loader is driven from the simulation thread. Its methods take `&self`
//! so a retry loop and a `cancel()` can interleave on the same task set.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use strafe_net::{
    ConnectionStatus, DisconnectReason, JoinStep, MapChange, Packet, PacketChannel, PacketKind,
    ParticipantId, PlayerIntroduction, StatusChange,
};
use tokio::sync::watch;

use crate::console::{ConsoleCommand, ConsoleError, parse_console_line};
use crate::content::ContentProvider;
use crate::context::SessionContext;
use crate::events::{LifecycleEvent, LifecycleObservers, SubscriptionId};
use crate::state::{LoadOutcome, Role, SessionState};

/// Address and credentials of the last join attempt, kept for reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinParameters {
    /// Host address.
    pub address: String,
    /// Host port.
    pub port: u16,
    /// Join password.
    pub password: Option<String>,
}

/// Host identity reused across map changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSettings {
    /// Advertised session name.
    pub name: String,
    /// Session password, empty for none.
    pub password: String,
}

/// Drives one process through the session lifecycle.
pub struct SessionLoader<N, C> {
    ctx: SessionContext<N, C>,
    state: watch::Sender<SessionState>,
    observers: LifecycleObservers,
    cancel_tx: watch::Sender<bool>,
    retrying: Cell<bool>,
    loading: Cell<bool>,
    hint: RefCell<String>,
    last_join: RefCell<Option<JoinParameters>>,
    settings: RefCell<SessionSettings>,
    client_index: Cell<Option<ParticipantId>>,
}

impl<N: PacketChannel, C: ContentProvider> SessionLoader<N, C> {
    /// Create a loader in [`SessionState::None`].
    pub fn new(ctx: SessionContext<N, C>) -> Self {
        let settings = SessionSettings {
            name: ctx.config.server_name.clone(),
            password: ctx.config.server_password.clone(),
        };
        let (state, _) = watch::channel(SessionState::None);
        let (cancel_tx, _) = watch::channel(false);
        Self {
            ctx,
            state,
            observers: LifecycleObservers::new(),
            cancel_tx,
            retrying: Cell::new(false),
            loading: Cell::new(false),
            hint: RefCell::new(String::new()),
            last_join: RefCell::new(None),
            settings: RefCell::new(settings),
            client_index: Cell::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribe to state changes asynchronously.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The collaborators this loader was built with.
    pub fn context(&self) -> &SessionContext<N, C> {
        &self.ctx
    }

    /// Returns `true` while a load sequence is running.
    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Human-readable description of the current load step.
    pub fn loading_hint(&self) -> String {
        self.hint.borrow().clone()
    }

    /// Index the host assigned to this client during the last join.
    pub fn client_index(&self) -> Option<ParticipantId> {
        self.client_index.get()
    }

    /// Parameters of the most recent join attempt.
    pub fn last_join(&self) -> Option<JoinParameters> {
        self.last_join.borrow().clone()
    }

    /// Returns `true` while the map-change reconnect loop runs.
    pub fn is_retrying(&self) -> bool {
        self.retrying.get()
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called and no new
    /// load has started since.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Host name/password reused across map changes.
    pub fn settings(&self) -> SessionSettings {
        self.settings.borrow().clone()
    }

    /// Replace the host name/password.
    pub fn set_settings(&self, settings: SessionSettings) {
        *self.settings.borrow_mut() = settings;
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Run `handler` every time `event` fires.
    pub fn subscribe(
        &self,
        event: LifecycleEvent,
        handler: impl FnMut() + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(event, handler)
    }

    /// Run `handler(previous, current)` on every state transition.
    pub fn subscribe_state_changes(
        &self,
        handler: impl FnMut(SessionState, SessionState) + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe_state(handler)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn fire(&self, event: LifecycleEvent) {
        self.observers.fire(event);
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!("Session state {previous:?} -> {next:?}");
            self.observers.state_changed(previous, next);
        }
    }

    fn set_hint(&self, hint: impl Into<String>) {
        let hint = hint.into();
        tracing::debug!("{hint}");
        *self.hint.borrow_mut() = hint;
    }

    /// Update the loading hint, then bail out if cancellation was requested.
    fn checkpoint(&self, hint: impl Into<String>) -> Result<(), LoadOutcome> {
        self.set_hint(hint);
        if self.is_cancelled() {
            tracing::info!("Load cancelled");
            return Err(LoadOutcome::Cancelled);
        }
        Ok(())
    }

    fn refuse(&self, operation: &str) -> LoadOutcome {
        tracing::error!(
            "{:?} can't {operation} while state is {:?}",
            self.ctx.role,
            self.state()
        );
        LoadOutcome::None
    }

    /// Record the end of a load attempt and move the state accordingly.
    fn finish(&self, operation: &str, outcome: LoadOutcome) -> LoadOutcome {
        self.loading.set(false);
        if outcome.is_success() {
            self.retrying.set(false);
            self.set_state(SessionState::Playing);
            tracing::info!("{operation} succeeded, now playing");
        } else {
            tracing::warn!("{operation} ended with {outcome:?}");
            self.set_state(SessionState::None);
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Join
    // -----------------------------------------------------------------------

    /// Join a remote host.
    ///
    /// Only valid on a client in [`SessionState::None`]; otherwise refused
    /// with [`LoadOutcome::None`] and nothing changes.
    pub async fn join_game(&self, address: &str, port: u16, password: Option<&str>) -> LoadOutcome {
        if self.state() != SessionState::None || self.ctx.role != Role::Client {
            return self.refuse("join");
        }

        self.set_state(SessionState::Joining);
        *self.last_join.borrow_mut() = Some(JoinParameters {
            address: address.to_string(),
            port,
            password: password.map(str::to_string),
        });
        self.cancel_tx.send_replace(false);
        self.ctx.content.clear_downloads();
        self.loading.set(true);

        tracing::info!("Joining {address}:{port}");
        let outcome = match self.run_join(address, port, password).await {
            Ok(()) => LoadOutcome::Success,
            Err(outcome) => outcome,
        };
        self.finish("Join", outcome)
    }

    async fn run_join(&self, address: &str, port: u16, password: Option<&str>) -> Result<(), LoadOutcome> {
        self.checkpoint("Connecting to host")?;
        let status = self.ctx.network.connect(address, port, password).await;
        if status != ConnectionStatus::Connected {
            tracing::warn!("Connection to {address}:{port} ended as {status:?}");
            return Err(LoadOutcome::FailedToConnect);
        }

        self.checkpoint("Requesting game info")?;
        let params = self.request_session_parameters().await?;
        self.client_index.set(Some(params.client_index));
        self.set_state(SessionState::ChangingMap);

        self.checkpoint(format!("Loading the map: {}", params.map_name))?;
        self.ensure_map_loaded(&params.map_name).await?;
        self.fire(LifecycleEvent::PreGameLoaded);

        self.checkpoint(format!("Loading the gamemode: {}", params.gamemode))?;
        self.load_gamemode(&params.gamemode)?;
        self.fire(LifecycleEvent::GameLoaded);

        self.checkpoint("Done, entering game")?;
        self.ctx
            .network
            .broadcast(Packet::PlayerIntroduction(PlayerIntroduction {
                step: JoinStep::Introduce,
            }));
        Ok(())
    }

    /// Ask the host which index, map and gamemode to use.
    async fn request_session_parameters(&self) -> Result<MapChange, LoadOutcome> {
        let network = &self.ctx.network;
        let timeout = Duration::from_millis(self.ctx.config.handshake_timeout_ms);
        let mut cancelled = self.cancel_tx.subscribe();

        network.broadcast(Packet::MapChange(MapChange::default()));
        let reply = tokio::select! {
            reply = network.wait_for(PacketKind::MapChange, timeout) => reply,
            Ok(_) = cancelled.wait_for(|cancelled| *cancelled) => {
                tracing::info!("Handshake wait released by cancel");
                return Err(LoadOutcome::Cancelled);
            }
        };

        match reply {
            Some(Packet::MapChange(params)) => Ok(params),
            Some(other) => {
                tracing::warn!("Expected MapChange, got {:?}", other.kind());
                Err(LoadOutcome::MissingMapChange)
            }
            None => {
                tracing::warn!("No MapChange from host within {timeout:?}");
                Err(LoadOutcome::MissingMapChange)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Create and host a new game.
    ///
    /// Only valid on a host in [`SessionState::None`]. A purely numeric
    /// `map_name` is treated as a distributed content id and fetched first.
    pub async fn create_game(&self, map_name: &str, gamemode: &str) -> LoadOutcome {
        if self.state() != SessionState::None || self.ctx.role != Role::Host {
            return self.refuse("create a game");
        }

        self.set_state(SessionState::Creating);
        self.ctx.content.clear_downloads();
        self.cancel_tx.send_replace(false);
        self.loading.set(true);

        tracing::info!("Creating game on {map_name} ({gamemode})");
        let outcome = match self.run_create(map_name, gamemode).await {
            Ok(()) => LoadOutcome::Success,
            Err(outcome) => outcome,
        };
        self.finish("Create", outcome)
    }

    async fn run_create(&self, map_name: &str, gamemode: &str) -> Result<(), LoadOutcome> {
        self.set_state(SessionState::ChangingMap);

        self.checkpoint(format!("Loading map: {map_name}"))?;
        if let Ok(content_id) = map_name.parse::<u64>() {
            self.fetch_distributed_map(content_id).await?;
        }
        self.ensure_map_loaded(map_name).await?;

        self.checkpoint(format!("Loading gamemode: {gamemode}"))?;
        self.fire(LifecycleEvent::PreGameLoaded);
        self.load_gamemode(gamemode)?;
        self.fire(LifecycleEvent::GameLoaded);

        self.set_hint("Done, game is created.");
        Ok(())
    }

    async fn fetch_distributed_map(&self, content_id: u64) -> Result<(), LoadOutcome> {
        let content = &self.ctx.content;
        self.set_hint("Downloading map from content distribution");

        if !content.distribution_available() {
            tracing::warn!("Content distribution unavailable, can't fetch {content_id}");
            return Err(LoadOutcome::FailedToLoadMap);
        }
        let Some(item) = content.resolve_item(content_id).await else {
            tracing::warn!("Content {content_id} does not exist");
            return Err(LoadOutcome::FailedToLoadMap);
        };
        if !content.download_item(content_id).await {
            tracing::warn!("Download of content {content_id} failed");
            return Err(LoadOutcome::FailedToLoadMap);
        }
        content.add_local_source(&item).map_err(|e| {
            tracing::warn!("Can't register content {content_id}: {e}");
            LoadOutcome::FailedToLoadMap
        })?;

        tracing::info!(
            "Registered content {content_id} from {}",
            item.directory.display()
        );
        Ok(())
    }

    async fn ensure_map_loaded(&self, map_name: &str) -> Result<(), LoadOutcome> {
        if self.ctx.content.current_map().as_deref() == Some(map_name) {
            tracing::debug!("Map {map_name} already loaded");
            return Ok(());
        }
        self.ctx.content.load_map(map_name).await.map_err(|e| {
            tracing::warn!("Failed to load map {map_name}: {e}");
            LoadOutcome::FailedToLoadMap
        })
    }

    fn load_gamemode(&self, gamemode: &str) -> Result<(), LoadOutcome> {
        if self.ctx.gamemodes.borrow_mut().load_gamemode(gamemode) {
            Ok(())
        } else {
            tracing::warn!("Failed to load gamemode {gamemode}");
            Err(LoadOutcome::FailedToLoadGamemode)
        }
    }

    // -----------------------------------------------------------------------
    // Map change / unload
    // -----------------------------------------------------------------------

    /// Switch the hosted game to another map.
    ///
    /// Kicks every participant with [`DisconnectReason::MapChange`] so clients
    /// reconnect, unloads the current game, waits the settle delay and runs
    /// the create sequence again. Keeps the current gamemode unless
    /// `gamemode` names another one.
    pub async fn change_map(&self, map_name: &str, gamemode: Option<&str>) -> LoadOutcome {
        if self.state() != SessionState::Playing || self.ctx.role != Role::Host {
            return self.refuse("change map");
        }

        let gamemode = match gamemode {
            Some(gamemode) => gamemode.to_string(),
            None => self
                .ctx
                .gamemodes
                .borrow()
                .current_gamemode()
                .unwrap_or_else(|| self.ctx.config.default_gamemode.clone()),
        };

        self.set_state(SessionState::ChangingMap);
        self.cancel_tx.send_replace(false);
        self.loading.set(true);
        tracing::info!(
            "Changing map to {map_name} ({gamemode}) on '{}'",
            self.settings.borrow().name
        );
        self.ctx.network.disconnect_all(DisconnectReason::MapChange);
        self.unload_game();

        let outcome = match self.run_map_change(map_name, &gamemode).await {
            Ok(()) => LoadOutcome::Success,
            Err(outcome) => outcome,
        };
        self.finish("Map change", outcome)
    }

    async fn run_map_change(&self, map_name: &str, gamemode: &str) -> Result<(), LoadOutcome> {
        self.set_hint("Waiting for players to leave");
        tokio::time::sleep(Duration::from_millis(self.ctx.config.map_change_settle_ms)).await;
        self.checkpoint(format!("Reloading on {map_name}"))?;
        self.run_create(map_name, gamemode).await
    }

    /// Leave the current game: fires `PreGameUnloaded`, unloads the
    /// gamemode, fires `GameUnloaded` and returns to [`SessionState::None`].
    ///
    /// Returns `false` (and changes nothing) unless the state is `Playing`.
    pub fn unload(&self) -> bool {
        if self.state() != SessionState::Playing {
            self.refuse("unload");
            return false;
        }
        self.set_state(SessionState::Unloading);
        self.unload_game();
        self.client_index.set(None);
        self.set_state(SessionState::None);
        true
    }

    /// Host side of the join handshake: tell `participant` its index and the
    /// map and gamemode to load.
    ///
    /// Returns `false` unless this is a host that is playing.
    pub fn answer_map_change_request(&self, participant: ParticipantId) -> bool {
        if self.ctx.role != Role::Host || self.state() != SessionState::Playing {
            tracing::debug!("Ignoring MapChange request from {participant}");
            return false;
        }
        let (Some(map_name), Some(gamemode)) = (
            self.ctx.content.current_map(),
            self.ctx.gamemodes.borrow().current_gamemode(),
        ) else {
            tracing::warn!("Playing without a map or gamemode, can't answer {participant}");
            return false;
        };

        tracing::info!("Sending {map_name} ({gamemode}) to {participant}");
        self.ctx.network.send_to(
            participant,
            Packet::MapChange(MapChange {
                client_index: participant,
                map_name,
                gamemode,
            }),
        );
        true
    }

    fn unload_game(&self) {
        self.fire(LifecycleEvent::PreGameUnloaded);
        self.ctx.gamemodes.borrow_mut().unload();
        self.fire(LifecycleEvent::GameUnloaded);
    }

    // -----------------------------------------------------------------------
    // Disconnects and reconnection
    // -----------------------------------------------------------------------

    /// React to a transport status change on a client.
    ///
    /// Any disconnect while playing unloads the game. A disconnect whose
    /// reason is exactly [`DisconnectReason::MapChange`] then starts the
    /// reconnect loop; its last outcome is returned. Other reasons are left
    /// to the caller.
    pub async fn on_status_changed(&self, change: &StatusChange) -> Option<LoadOutcome> {
        if self.ctx.role == Role::Host || change.status != ConnectionStatus::Disconnected {
            return None;
        }

        if self.state() == SessionState::Playing {
            self.unload();
        }

        if change.is_disconnect_with(DisconnectReason::MapChange) {
            tracing::info!("Host is changing map, reconnecting");
            self.begin_retry().await
        } else {
            tracing::info!(
                "Disconnected from host: {}",
                change.reason.as_deref().unwrap_or("no reason")
            );
            None
        }
    }

    /// Feed every status change from the channel into
    /// [`on_status_changed`](Self::on_status_changed) until the channel closes.
    pub async fn watch_connection(&self) {
        let mut status = self.ctx.network.status();
        while status.changed().await.is_ok() {
            let change = status.borrow_and_update().clone();
            self.on_status_changed(&change).await;
        }
    }

    /// Re-run [`join_game`](Self::join_game) with the last parameters until
    /// it succeeds, attempts run out, or [`cancel`](Self::cancel) is called.
    ///
    /// Returns `None` without doing anything if a retry loop is already
    /// running or there is nothing to reconnect to.
    pub async fn begin_retry(&self) -> Option<LoadOutcome> {
        if self.retrying.get() {
            tracing::debug!("Reconnect loop already running");
            return None;
        }
        let Some(params) = self.last_join() else {
            tracing::warn!("No previous join to reconnect to");
            return None;
        };

        let attempts = self.ctx.config.reconnect_attempts;
        let delay = Duration::from_millis(self.ctx.config.reconnect_delay_ms);
        self.retrying.set(true);

        let mut last = None;
        for attempt in 1..=attempts {
            if !self.retrying.get() {
                tracing::info!("Reconnect loop stopped");
                break;
            }

            tracing::info!(
                "Reconnect attempt {attempt}/{attempts} to {}:{}",
                params.address,
                params.port
            );
            let outcome = self
                .join_game(&params.address, params.port, params.password.as_deref())
                .await;
            last = Some(outcome);
            if outcome.is_success() {
                break;
            }

            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        self.retrying.set(false);
        last
    }

    /// Cancel whatever is in flight. Idempotent and valid in any state.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
        self.retrying.set(false);
        tracing::debug!("Cancel requested in state {:?}", self.state());
    }

    // -----------------------------------------------------------------------
    // Console / teardown
    // -----------------------------------------------------------------------

    /// Run a console line on the host (`map.change <map> [gamemode]`).
    pub async fn execute_console(&self, line: &str) -> Result<LoadOutcome, ConsoleError> {
        match parse_console_line(line)? {
            ConsoleCommand::MapChange { map, gamemode } => {
                Ok(self.change_map(&map, gamemode.as_deref()).await)
            }
        }
    }

    /// Tear the loader down: cancels, kicks clients if hosting, drops every
    /// subscriber and returns to [`SessionState::None`].
    pub fn destroy(&self) {
        self.cancel();
        if self.ctx.role == Role::Host && self.state() != SessionState::None {
            self.ctx
                .network
                .disconnect_all(DisconnectReason::ServerShutdown);
        }
        self.observers.clear();
        self.client_index.set(None);
        self.loading.set(false);
        self.set_state(SessionState::None);
    }
}
