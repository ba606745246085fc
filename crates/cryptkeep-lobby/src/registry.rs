//! The registry actor: the single owner of participants and rooms.
//!
//! Registration, deregistration and every classified command go through
//! one channel and are applied one at a time by a Tokio task. Nothing the
//! actor owns is shared, so no locks are needed:
//!
//! ```text
//! transport ──► RegistryHandle ──► mpsc ──► RegistryActor
//!                                              │ lobby scope: rooms, matchmaking
//!                                              │ room scope:  start / leave
//!                                              └ game scope:  RoomGame::dispatch
//! game end ──► GameEndSignal ──► unbounded mpsc ──┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cryptkeep_protocol::{
    Command, EventSender, GameCommand, LobbyCommand, LobbyEvent, MatchSettings, ParticipantHandle,
    ParticipantId, ParticipantSummary, RoomCommand, RoomId, RoomSummary, ServerEvent,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::game::GameEnded;
use crate::room::{ActiveGame, Departure, Room};
use crate::{GameEndSignal, GameFactory, LobbyConfig, LobbyError, MatchMaker, MatchTarget, RoomGame};

/// Requests sent to the registry actor.
pub(crate) enum RegistryCommand {
    Register {
        events: EventSender,
        reply: oneshot::Sender<ParticipantId>,
    },
    Unregister {
        id: ParticipantId,
    },
    Command {
        sender: ParticipantId,
        command: Command,
    },
    Snapshot {
        reply: oneshot::Sender<RegistrySnapshot>,
    },
    Shutdown,
}

/// Everything the lobby lists, at one point in the command stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub participants: Vec<ParticipantSummary>,
    pub rooms: Vec<RoomSummary>,
}

impl RegistrySnapshot {
    pub fn room(&self, id: RoomId) -> Option<&RoomSummary> {
        self.rooms.iter().find(|r| r.id == id)
    }
}

/// Handle to the registry actor. Cheap to clone.
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Registers a new connection and returns its participant id. Events
    /// for it are pushed into `events`.
    pub async fn register(&self, events: EventSender) -> Result<ParticipantId, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RegistryCommand::Register {
            events,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| LobbyError::Unavailable)
    }

    /// Removes a participant from its room and from the registry. Once the
    /// registry and any game have dropped their handles, the participant's
    /// event stream ends.
    pub async fn unregister(&self, id: ParticipantId) -> Result<(), LobbyError> {
        self.send(RegistryCommand::Unregister { id }).await
    }

    /// Queues a classified command (fire-and-forget).
    pub async fn command(&self, sender: ParticipantId, command: Command) -> Result<(), LobbyError> {
        self.send(RegistryCommand::Command { sender, command }).await
    }

    /// Current participants and rooms. Answered after every command queued
    /// before it.
    pub async fn snapshot(&self) -> Result<RegistrySnapshot, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RegistryCommand::Snapshot { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| LobbyError::Unavailable)
    }

    /// Stops every running game and the actor.
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.send(RegistryCommand::Shutdown).await
    }

    async fn send(&self, command: RegistryCommand) -> Result<(), LobbyError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| LobbyError::Unavailable)
    }
}

/// Spawns the registry actor and returns a handle to it.
pub fn spawn_registry<F, M>(config: LobbyConfig, factory: F, matchmaker: M) -> RegistryHandle
where
    F: GameFactory,
    M: MatchMaker,
{
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let (ended_tx, ended_rx) = mpsc::unbounded_channel();

    let actor = RegistryActor {
        config,
        factory,
        matchmaker,
        participants: BTreeMap::new(),
        rooms: BTreeMap::new(),
        owned: HashMap::new(),
        joined: HashMap::new(),
        next_participant: 0,
        next_room: 0,
        next_generation: 0,
        receiver: rx,
        ended_tx,
        ended_rx,
    };
    tokio::spawn(actor.run());

    RegistryHandle { sender: tx }
}

struct RegistryActor<F: GameFactory, M> {
    config: LobbyConfig,
    factory: F,
    matchmaker: M,
    participants: BTreeMap<ParticipantId, ParticipantHandle>,
    rooms: BTreeMap<RoomId, Room<F::Game>>,
    /// Owner to the one room it owns.
    owned: HashMap<ParticipantId, RoomId>,
    /// Member to the one room it is in.
    joined: HashMap<ParticipantId, RoomId>,
    next_participant: u64,
    next_room: u64,
    next_generation: u64,
    receiver: mpsc::Receiver<RegistryCommand>,
    ended_tx: mpsc::UnboundedSender<GameEnded>,
    ended_rx: mpsc::UnboundedReceiver<GameEnded>,
}

impl<F: GameFactory, M: MatchMaker> RegistryActor<F, M> {
    async fn run(mut self) {
        info!("registry started");

        loop {
            // Game ends are applied before any command queued after them.
            tokio::select! {
                biased;
                Some(ended) = self.ended_rx.recv() => self.on_game_ended(ended),
                command = self.receiver.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if !self.handle(command).await {
                        break;
                    }
                }
            }
        }

        for room in self.rooms.values() {
            if let Some(active) = &room.game {
                active.game.stop().await;
            }
        }
        info!("registry stopped");
    }

    /// Applies one request. Returns `false` on shutdown.
    async fn handle(&mut self, command: RegistryCommand) -> bool {
        match command {
            RegistryCommand::Register { events, reply } => {
                let id = self.register(events);
                let _ = reply.send(id);
            }
            RegistryCommand::Unregister { id } => self.unregister(id).await,
            RegistryCommand::Command { sender, command } => self.on_command(sender, command).await,
            RegistryCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RegistryCommand::Shutdown => {
                info!("registry shutting down");
                return false;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    fn register(&mut self, events: EventSender) -> ParticipantId {
        self.next_participant += 1;
        let id = ParticipantId(self.next_participant);
        self.participants
            .insert(id, ParticipantHandle::new(id, String::new(), events));
        info!(
            participant_id = %id,
            participants = self.participants.len(),
            "participant registered"
        );
        id
    }

    async fn unregister(&mut self, id: ParticipantId) {
        if self.participants.remove(&id).is_none() {
            debug!(participant_id = %id, "unregister of unknown participant");
            return;
        }
        self.matchmaker.cancel(id);
        if let Some(room_id) = self.joined.get(&id).copied() {
            self.leave_room(id, room_id).await;
        }
        self.broadcast(LobbyEvent::ParticipantLeft { id });
        info!(
            participant_id = %id,
            participants = self.participants.len(),
            "participant unregistered"
        );
    }

    // -----------------------------------------------------------------------
    // Command routing
    // -----------------------------------------------------------------------

    async fn on_command(&mut self, sender: ParticipantId, command: Command) {
        let result = match command {
            _ if !self.participants.contains_key(&sender) => {
                Err(LobbyError::UnknownParticipant(sender))
            }
            Command::Lobby(cmd) => self.on_lobby_command(sender, cmd).await,
            Command::Room(cmd) => self.on_room_command(sender, cmd).await,
            Command::Game(cmd) => self.on_game_command(sender, cmd).await,
        };
        let Err(err) = result else {
            return;
        };
        match err.code() {
            Some(code) => {
                debug!(participant_id = %sender, error = %err, "command rejected");
                self.send_to(sender, LobbyEvent::Error { code });
            }
            None => debug!(participant_id = %sender, error = %err, "command ignored"),
        }
    }

    async fn on_lobby_command(
        &mut self,
        sender: ParticipantId,
        command: LobbyCommand,
    ) -> Result<(), LobbyError> {
        match command {
            LobbyCommand::JoinLobby { nickname } => {
                self.join_lobby(sender, nickname);
                Ok(())
            }
            LobbyCommand::CreateRoom => self.create_room(sender).await.map(|_| ()),
            LobbyCommand::JoinRoom { room_id } => self.join_room(sender, room_id).await,
            LobbyCommand::RequestMatch { settings } => self.make_match(sender, settings).await,
        }
    }

    async fn on_room_command(
        &mut self,
        sender: ParticipantId,
        command: RoomCommand,
    ) -> Result<(), LobbyError> {
        let room_id = self
            .joined
            .get(&sender)
            .copied()
            .ok_or(LobbyError::NotInRoom(sender))?;
        match command {
            RoomCommand::StartGame => self.start_game(sender, room_id),
            RoomCommand::LeaveRoom => {
                self.leave_room(sender, room_id).await;
                Ok(())
            }
        }
    }

    async fn on_game_command(
        &mut self,
        sender: ParticipantId,
        command: GameCommand,
    ) -> Result<(), LobbyError> {
        let room_id = self
            .joined
            .get(&sender)
            .copied()
            .ok_or(LobbyError::NotInRoom(sender))?;
        match self.rooms.get(&room_id).and_then(|r| r.game.as_ref()) {
            Some(active) => active.game.dispatch(sender, command).await,
            None => debug!(
                participant_id = %sender,
                %room_id,
                command = command.name(),
                "no game running, command dropped"
            ),
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lobby scope
    // -----------------------------------------------------------------------

    fn join_lobby(&mut self, id: ParticipantId, nickname: String) {
        if let Some(participant) = self.participants.get_mut(&id) {
            participant.set_nickname(nickname.clone());
        }
        self.broadcast(LobbyEvent::ParticipantJoined {
            id,
            nickname: nickname.clone(),
        });
        let joined = LobbyEvent::Joined {
            your_id: id,
            your_nickname: nickname,
            clients: self
                .participants
                .values()
                .map(ParticipantHandle::summary)
                .collect(),
            rooms: self.room_summaries(),
        };
        self.send_to(id, joined);
    }

    /// Creates a room owned by `owner`, moving it out of its current room.
    async fn create_room(&mut self, owner: ParticipantId) -> Result<RoomId, LobbyError> {
        if self.owned.contains_key(&owner) {
            return Err(LobbyError::RoomAlreadyExists(owner));
        }
        if let Some(current) = self.joined.get(&owner).copied() {
            self.leave_room(owner, current).await;
        }

        self.next_room += 1;
        let room_id = RoomId(self.next_room);
        self.rooms.insert(room_id, Room::new(room_id, owner));
        self.owned.insert(owner, room_id);
        self.joined.insert(owner, room_id);
        info!(%room_id, owner = %owner, "room created");

        if let Some(room) = self.summary_of(room_id) {
            self.broadcast(LobbyEvent::RoomCreated { room: room.clone() });
            self.send_to(owner, LobbyEvent::RoomJoined { room });
        }
        Ok(room_id)
    }

    /// Moves `id` into `room_id`. A participant already in that room is
    /// left alone; a failed join leaves the participant where it was.
    async fn join_room(&mut self, id: ParticipantId, room_id: RoomId) -> Result<(), LobbyError> {
        let current = self.joined.get(&id).copied();
        if current == Some(room_id) {
            return Ok(());
        }
        let room = self
            .rooms
            .get(&room_id)
            .ok_or(LobbyError::RoomNotFound(room_id))?;
        if room.len() >= self.config.max_members {
            return Err(LobbyError::RoomFull(room_id));
        }
        if let Some(current) = current {
            self.leave_room(id, current).await;
        }

        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(LobbyError::RoomNotFound(room_id))?;
        room.add(id);
        self.joined.insert(id, room_id);
        info!(participant_id = %id, %room_id, members = room.len(), "joined room");

        if let Some(summary) = self.summary_of(room_id) {
            self.send_to(id, LobbyEvent::RoomJoined { room: summary.clone() });
            self.broadcast(LobbyEvent::RoomUpdated { room: summary });
        }

        // Room notices go out before the game's join confirmation.
        let active = self.rooms.get(&room_id).and_then(|r| r.game.as_ref());
        if let (Some(active), Some(participant)) = (active, self.participants.get(&id)) {
            active.game.add_participant(participant.clone()).await;
        }
        Ok(())
    }

    /// Lets the matchmaking policy pick a room, then starts a game there if
    /// none is running.
    async fn make_match(
        &mut self,
        id: ParticipantId,
        settings: MatchSettings,
    ) -> Result<(), LobbyError> {
        let room_id = match self.matchmaker.find_room(id, &settings) {
            MatchTarget::Join(room_id) => {
                self.join_room(id, room_id).await?;
                room_id
            }
            MatchTarget::Create => {
                let room_id = self.create_room(id).await?;
                self.matchmaker.on_room_created(room_id, &settings);
                room_id
            }
        };
        if self.rooms.get(&room_id).is_some_and(|r| !r.game_running()) {
            self.start_game(id, room_id)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Room scope
    // -----------------------------------------------------------------------

    /// Starts a game for the room's members unless one is running or the
    /// room is below the minimum size.
    fn start_game(&mut self, requester: ParticipantId, room_id: RoomId) -> Result<(), LobbyError> {
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(LobbyError::RoomNotFound(room_id))?;
        if room.game_running() {
            debug!(%room_id, "game already running");
            return Ok(());
        }
        if room.len() < self.config.min_members_to_start {
            debug!(%room_id, members = room.len(), "not enough members to start");
            return Ok(());
        }

        let participants: Vec<ParticipantHandle> = room
            .members()
            .iter()
            .filter_map(|m| self.participants.get(m).cloned())
            .collect();
        self.next_generation += 1;
        let generation = self.next_generation;
        let signal = GameEndSignal::new(room_id, generation, self.ended_tx.clone());
        let game = self.factory.start(room_id, participants, signal);
        room.game = Some(ActiveGame { game, generation });
        info!(%room_id, requester = %requester, members = room.len(), "game started");

        self.broadcast_room_update(room_id);
        Ok(())
    }

    /// Removes `id` from `room_id`. An emptied room is removed; an owner
    /// departure hands the room to the longest-standing member.
    async fn leave_room(&mut self, id: ParticipantId, room_id: RoomId) {
        self.joined.remove(&id);
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        let departure = room.remove(id);
        if departure == Departure::NotMember {
            return;
        }
        if let Some(active) = &room.game {
            active.game.remove_participant(id).await;
        }
        info!(participant_id = %id, %room_id, members = room.len(), "left room");

        match departure {
            Departure::Emptied => self.remove_room(room_id).await,
            Departure::OwnerChanged(next) => {
                self.owned.remove(&id);
                self.owned.insert(next, room_id);
                info!(%room_id, owner = %next, "room owner changed");
                self.broadcast_room_update(room_id);
            }
            Departure::Left => self.broadcast_room_update(room_id),
            Departure::NotMember => {}
        }
    }

    async fn remove_room(&mut self, room_id: RoomId) {
        let Some(room) = self.rooms.remove(&room_id) else {
            return;
        };
        info!(room_id = %room.id(), last_owner = %room.owner(), "room removed");
        if let Some(active) = room.game {
            active.game.stop().await;
        }
        self.owned.retain(|_, r| *r != room_id);
        self.matchmaker.on_room_removed(room_id);
        self.broadcast(LobbyEvent::RoomRemoved { room_id });
    }

    /// Frees the room's game slot, unless the signal belongs to a game that
    /// has already been replaced or the room is gone.
    fn on_game_ended(&mut self, ended: GameEnded) {
        let room_id = ended.room_id;
        let Some(room) = self.rooms.get_mut(&room_id) else {
            debug!(%room_id, "game ended in a removed room");
            return;
        };
        if room
            .game
            .as_ref()
            .is_none_or(|g| g.generation != ended.generation)
        {
            debug!(%room_id, generation = ended.generation, "stale game end ignored");
            return;
        }
        room.game = None;
        info!(%room_id, winner = ?ended.winner, "game over, room reclaimed");
        self.broadcast_room_update(room_id);
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Sends to every registered participant.
    fn broadcast(&self, event: LobbyEvent) {
        let event = Arc::new(ServerEvent::from(event));
        for participant in self.participants.values() {
            participant.send(Arc::clone(&event));
        }
    }

    fn send_to(&self, id: ParticipantId, event: LobbyEvent) {
        if let Some(participant) = self.participants.get(&id) {
            participant.send(Arc::new(ServerEvent::from(event)));
        }
    }

    fn broadcast_room_update(&self, room_id: RoomId) {
        if let Some(room) = self.summary_of(room_id) {
            self.broadcast(LobbyEvent::RoomUpdated { room });
        }
    }

    fn summary_of(&self, room_id: RoomId) -> Option<RoomSummary> {
        self.rooms
            .get(&room_id)
            .map(|r| r.summary(&self.participants))
    }

    fn room_summaries(&self) -> Vec<RoomSummary> {
        self.rooms
            .values()
            .map(|r| r.summary(&self.participants))
            .collect()
    }

    fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            participants: self
                .participants
                .values()
                .map(ParticipantHandle::summary)
                .collect(),
            rooms: self.room_summaries(),
        }
    }
}
