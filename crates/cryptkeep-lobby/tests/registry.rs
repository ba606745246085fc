//! Integration tests for the registry actor using a mock game.

use std::sync::{Arc, Mutex};

use cryptkeep_lobby::{
    GameEndSignal, GameFactory, LobbyConfig, NamedRoomMatchMaker, ROOM_NAME_KEY, RegistryHandle,
    RoomGame, spawn_registry,
};
use cryptkeep_protocol::{
    Command, Direction, ErrorCode, EventReceiver, GameCommand, LobbyCommand, LobbyEvent,
    MatchSettings, MoveCommand, ParticipantHandle, ParticipantId, RoomCommand, RoomId,
    RoomSummary, ServerEvent,
};
use serde_json::json;
use tokio::sync::mpsc;

// =========================================================================
// Mock game: records what the registry asks of it.
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Started(RoomId, Vec<ParticipantId>),
    Dispatched(RoomId, ParticipantId),
    Added(RoomId, ParticipantId),
    Removed(RoomId, ParticipantId),
    Stopped(RoomId),
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    signals: Arc<Mutex<Vec<GameEndSignal>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn starts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Started(..)))
            .count()
    }

    /// Ends the most recently started game.
    fn end_latest(&self, winner: Option<ParticipantId>) {
        let signal = self.signals.lock().unwrap().pop().unwrap();
        signal.fire(winner);
    }
}

struct MockGame {
    room_id: RoomId,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockGame {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RoomGame for MockGame {
    async fn dispatch(&self, sender: ParticipantId, _command: GameCommand) {
        self.record(Call::Dispatched(self.room_id, sender));
    }

    async fn add_participant(&self, participant: ParticipantHandle) {
        self.record(Call::Added(self.room_id, participant.id()));
    }

    async fn remove_participant(&self, id: ParticipantId) {
        self.record(Call::Removed(self.room_id, id));
    }

    async fn stop(&self) {
        self.record(Call::Stopped(self.room_id));
    }
}

struct MockFactory(Recorder);

impl GameFactory for MockFactory {
    type Game = MockGame;

    fn start(
        &self,
        room_id: RoomId,
        participants: Vec<ParticipantHandle>,
        on_end: GameEndSignal,
    ) -> MockGame {
        let ids = participants.iter().map(ParticipantHandle::id).collect();
        self.0.calls.lock().unwrap().push(Call::Started(room_id, ids));
        self.0.signals.lock().unwrap().push(on_end);
        MockGame {
            room_id,
            calls: Arc::clone(&self.0.calls),
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn setup(config: LobbyConfig) -> (RegistryHandle, Recorder) {
    let recorder = Recorder::default();
    let registry = spawn_registry(
        config,
        MockFactory(recorder.clone()),
        NamedRoomMatchMaker::default(),
    );
    (registry, recorder)
}

/// Registers and joins the lobby under `nickname`.
async fn connect(registry: &RegistryHandle, nickname: &str) -> (ParticipantId, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = registry.register(tx).await.unwrap();
    send(
        registry,
        id,
        Command::Lobby(LobbyCommand::JoinLobby {
            nickname: nickname.to_string(),
        }),
    )
    .await;
    (id, rx)
}

/// Sends a command and waits until the registry has applied it.
async fn send(registry: &RegistryHandle, id: ParticipantId, command: Command) {
    registry.command(id, command).await.unwrap();
    registry.snapshot().await.unwrap();
}

async fn create_room(registry: &RegistryHandle, id: ParticipantId) {
    send(registry, id, Command::Lobby(LobbyCommand::CreateRoom)).await;
}

async fn join_room(registry: &RegistryHandle, id: ParticipantId, room_id: RoomId) {
    send(registry, id, Command::Lobby(LobbyCommand::JoinRoom { room_id })).await;
}

fn lobby_events(rx: &mut EventReceiver) -> Vec<LobbyEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ServerEvent::Lobby(event) = event.as_ref() {
            events.push(event.clone());
        }
    }
    events
}

fn member_ids(room: &RoomSummary) -> Vec<ParticipantId> {
    room.members.iter().map(|m| m.id).collect()
}

fn step() -> Command {
    Command::Game(GameCommand::Move(MoveCommand {
        x: 10,
        y: 10,
        direction: Direction::Up,
        is_moving: true,
    }))
}

const R1: RoomId = RoomId(1);
const R2: RoomId = RoomId(2);

// =========================================================================
// Registration and lobby
// =========================================================================

#[tokio::test]
async fn test_register_assigns_increasing_ids() {
    let (registry, _) = setup(LobbyConfig::default());
    let (tx, _rx) = mpsc::unbounded_channel();

    let first = registry.register(tx.clone()).await.unwrap();
    let second = registry.register(tx).await.unwrap();

    assert_eq!(first, ParticipantId(1));
    assert_eq!(second, ParticipantId(2));
    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(snapshot.participants.len(), 2);
    assert!(snapshot.rooms.is_empty());
}

#[tokio::test]
async fn test_join_lobby_lists_clients_and_rooms() {
    let (registry, _) = setup(LobbyConfig::default());
    let (ada, mut ada_rx) = connect(&registry, "ada").await;
    create_room(&registry, ada).await;
    lobby_events(&mut ada_rx);

    let (bo, mut bo_rx) = connect(&registry, "bo").await;

    let events = lobby_events(&mut bo_rx);
    let Some(LobbyEvent::Joined {
        your_id,
        your_nickname,
        clients,
        rooms,
    }) = events.last()
    else {
        panic!("expected Joined, got {events:?}");
    };
    assert_eq!(*your_id, bo);
    assert_eq!(your_nickname, "bo");
    let names: Vec<_> = clients.iter().map(|c| c.nickname.as_str()).collect();
    assert_eq!(names, ["ada", "bo"]);
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].owner.id, ada);

    assert_eq!(
        lobby_events(&mut ada_rx),
        vec![LobbyEvent::ParticipantJoined {
            id: bo,
            nickname: "bo".into()
        }]
    );
}

#[tokio::test]
async fn test_commands_from_unknown_participants_are_ignored() {
    let (registry, recorder) = setup(LobbyConfig::default());
    let (_ada, mut ada_rx) = connect(&registry, "ada").await;
    lobby_events(&mut ada_rx);

    send(&registry, ParticipantId(99), Command::Lobby(LobbyCommand::CreateRoom)).await;

    assert!(lobby_events(&mut ada_rx).is_empty());
    assert!(registry.snapshot().await.unwrap().rooms.is_empty());
    assert!(recorder.calls().is_empty());
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_create_room_broadcasts_and_rejects_second_room() {
    let (registry, _) = setup(LobbyConfig::default());
    let (ada, mut ada_rx) = connect(&registry, "ada").await;
    let (_bo, mut bo_rx) = connect(&registry, "bo").await;
    lobby_events(&mut ada_rx);
    lobby_events(&mut bo_rx);

    create_room(&registry, ada).await;

    let events = lobby_events(&mut ada_rx);
    assert!(matches!(&events[0], LobbyEvent::RoomCreated { room } if room.id == R1));
    assert!(matches!(&events[1], LobbyEvent::RoomJoined { room } if member_ids(room) == [ada]));
    assert!(matches!(
        lobby_events(&mut bo_rx).as_slice(),
        [LobbyEvent::RoomCreated { .. }]
    ));

    create_room(&registry, ada).await;

    assert_eq!(
        lobby_events(&mut ada_rx),
        vec![LobbyEvent::Error {
            code: ErrorCode::RoomAlreadyExists
        }]
    );
    assert!(lobby_events(&mut bo_rx).is_empty());
    assert_eq!(registry.snapshot().await.unwrap().rooms.len(), 1);
}

#[tokio::test]
async fn test_join_missing_room_reports_only_to_sender() {
    let (registry, _) = setup(LobbyConfig::default());
    let (ada, mut ada_rx) = connect(&registry, "ada").await;
    let (_bo, mut bo_rx) = connect(&registry, "bo").await;
    lobby_events(&mut ada_rx);
    lobby_events(&mut bo_rx);

    join_room(&registry, ada, RoomId(42)).await;

    assert_eq!(
        lobby_events(&mut ada_rx),
        vec![LobbyEvent::Error {
            code: ErrorCode::RoomDoesNotExist
        }]
    );
    assert!(lobby_events(&mut bo_rx).is_empty());
}

#[tokio::test]
async fn test_join_room_updates_everyone() {
    let (registry, _) = setup(LobbyConfig::default());
    let (ada, mut ada_rx) = connect(&registry, "ada").await;
    let (bo, mut bo_rx) = connect(&registry, "bo").await;
    create_room(&registry, ada).await;
    lobby_events(&mut ada_rx);
    lobby_events(&mut bo_rx);

    join_room(&registry, bo, R1).await;

    let events = lobby_events(&mut bo_rx);
    assert!(matches!(&events[0], LobbyEvent::RoomJoined { room } if room.id == R1));
    assert!(matches!(&events[1], LobbyEvent::RoomUpdated { room } if member_ids(room) == [ada, bo]));
    assert!(matches!(
        lobby_events(&mut ada_rx).as_slice(),
        [LobbyEvent::RoomUpdated { room }] if member_ids(room) == [ada, bo]
    ));

    // Joining the same room again is a no-op.
    join_room(&registry, bo, R1).await;
    assert!(lobby_events(&mut ada_rx).is_empty());
}

#[tokio::test]
async fn test_join_full_room_is_rejected() {
    let config = LobbyConfig {
        max_members: 1,
        ..LobbyConfig::default()
    };
    let (registry, _) = setup(config);
    let (ada, _ada_rx) = connect(&registry, "ada").await;
    let (bo, mut bo_rx) = connect(&registry, "bo").await;
    create_room(&registry, ada).await;
    lobby_events(&mut bo_rx);

    join_room(&registry, bo, R1).await;

    assert_eq!(
        lobby_events(&mut bo_rx),
        vec![LobbyEvent::Error {
            code: ErrorCode::RoomFull
        }]
    );
    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(member_ids(snapshot.room(R1).unwrap()), [ada]);
}

#[tokio::test]
async fn test_owner_leaving_transfers_ownership_once() {
    let (registry, _) = setup(LobbyConfig::default());
    let (ada, _ada_rx) = connect(&registry, "ada").await;
    let (bo, _bo_rx) = connect(&registry, "bo").await;
    let (cy, mut cy_rx) = connect(&registry, "cy").await;
    create_room(&registry, ada).await;
    join_room(&registry, bo, R1).await;
    join_room(&registry, cy, R1).await;
    lobby_events(&mut cy_rx);

    send(&registry, ada, Command::Room(RoomCommand::LeaveRoom)).await;

    let events = lobby_events(&mut cy_rx);
    assert_eq!(events.len(), 1, "{events:?}");
    let LobbyEvent::RoomUpdated { room } = &events[0] else {
        panic!("expected RoomUpdated, got {events:?}");
    };
    assert_eq!(room.owner.id, bo);
    assert_eq!(member_ids(room), [bo, cy]);

    // The former owner is free to create another room.
    create_room(&registry, ada).await;
    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(snapshot.room(R2).unwrap().owner.id, ada);
}

#[tokio::test]
async fn test_last_member_leaving_removes_room() {
    let (registry, _) = setup(LobbyConfig::default());
    let (ada, _ada_rx) = connect(&registry, "ada").await;
    let (_bo, mut bo_rx) = connect(&registry, "bo").await;
    create_room(&registry, ada).await;
    lobby_events(&mut bo_rx);

    send(&registry, ada, Command::Room(RoomCommand::LeaveRoom)).await;

    assert_eq!(
        lobby_events(&mut bo_rx),
        vec![LobbyEvent::RoomRemoved { room_id: R1 }]
    );
    assert!(registry.snapshot().await.unwrap().rooms.is_empty());

    // Room ids are not reused.
    create_room(&registry, ada).await;
    let snapshot = registry.snapshot().await.unwrap();
    assert!(snapshot.room(R1).is_none());
    assert!(snapshot.room(R2).is_some());
}

#[tokio::test]
async fn test_creating_a_room_leaves_the_current_one() {
    let (registry, _) = setup(LobbyConfig::default());
    let (ada, _ada_rx) = connect(&registry, "ada").await;
    let (bo, _bo_rx) = connect(&registry, "bo").await;
    create_room(&registry, ada).await;
    join_room(&registry, bo, R1).await;

    create_room(&registry, bo).await;

    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(member_ids(snapshot.room(R1).unwrap()), [ada]);
    assert_eq!(member_ids(snapshot.room(R2).unwrap()), [bo]);
}

// =========================================================================
// Games
// =========================================================================

#[tokio::test]
async fn test_start_game_forwards_commands_from_members() {
    let (registry, recorder) = setup(LobbyConfig::default());
    let (ada, mut ada_rx) = connect(&registry, "ada").await;
    let (bo, _bo_rx) = connect(&registry, "bo").await;
    let (cy, _cy_rx) = connect(&registry, "cy").await;
    create_room(&registry, ada).await;
    join_room(&registry, bo, R1).await;
    lobby_events(&mut ada_rx);

    send(&registry, ada, Command::Room(RoomCommand::StartGame)).await;

    assert_eq!(recorder.calls(), vec![Call::Started(R1, vec![ada, bo])]);
    assert!(matches!(
        lobby_events(&mut ada_rx).as_slice(),
        [LobbyEvent::RoomUpdated { room }] if room.game_running
    ));

    send(&registry, bo, step()).await;
    send(&registry, cy, step()).await;
    send(&registry, ada, Command::Room(RoomCommand::StartGame)).await;

    assert_eq!(
        recorder.calls(),
        vec![Call::Started(R1, vec![ada, bo]), Call::Dispatched(R1, bo)]
    );
}

#[tokio::test]
async fn test_start_game_needs_minimum_members() {
    let config = LobbyConfig {
        min_members_to_start: 2,
        ..LobbyConfig::default()
    };
    let (registry, recorder) = setup(config);
    let (ada, _ada_rx) = connect(&registry, "ada").await;
    create_room(&registry, ada).await;

    send(&registry, ada, Command::Room(RoomCommand::StartGame)).await;

    assert_eq!(recorder.starts(), 0);
    assert!(!registry.snapshot().await.unwrap().rooms[0].game_running);
}

#[tokio::test]
async fn test_late_join_and_leave_reach_running_game() {
    let (registry, recorder) = setup(LobbyConfig::default());
    let (ada, _ada_rx) = connect(&registry, "ada").await;
    let (bo, _bo_rx) = connect(&registry, "bo").await;
    create_room(&registry, ada).await;
    send(&registry, ada, Command::Room(RoomCommand::StartGame)).await;

    join_room(&registry, bo, R1).await;
    send(&registry, bo, Command::Room(RoomCommand::LeaveRoom)).await;

    assert_eq!(
        recorder.calls(),
        vec![
            Call::Started(R1, vec![ada]),
            Call::Added(R1, bo),
            Call::Removed(R1, bo),
        ]
    );
}

#[tokio::test]
async fn test_game_end_frees_the_room() {
    let (registry, recorder) = setup(LobbyConfig::default());
    let (ada, mut ada_rx) = connect(&registry, "ada").await;
    create_room(&registry, ada).await;
    send(&registry, ada, Command::Room(RoomCommand::StartGame)).await;
    lobby_events(&mut ada_rx);

    recorder.end_latest(Some(ada));
    send(&registry, ada, step()).await;

    assert!(matches!(
        lobby_events(&mut ada_rx).as_slice(),
        [LobbyEvent::RoomUpdated { room }] if !room.game_running
    ));
    assert!(!recorder.calls().contains(&Call::Dispatched(R1, ada)));

    send(&registry, ada, Command::Room(RoomCommand::StartGame)).await;
    assert_eq!(recorder.starts(), 2);
}

#[tokio::test]
async fn test_emptied_room_stops_its_game() {
    let (registry, recorder) = setup(LobbyConfig::default());
    let (ada, _ada_rx) = connect(&registry, "ada").await;
    create_room(&registry, ada).await;
    send(&registry, ada, Command::Room(RoomCommand::StartGame)).await;

    send(&registry, ada, Command::Room(RoomCommand::LeaveRoom)).await;

    assert_eq!(
        recorder.calls(),
        vec![
            Call::Started(R1, vec![ada]),
            Call::Removed(R1, ada),
            Call::Stopped(R1),
        ]
    );

    // A late end signal for the removed room changes nothing.
    recorder.end_latest(None);
    assert!(registry.snapshot().await.unwrap().rooms.is_empty());
}

#[tokio::test]
async fn test_shutdown_stops_running_games() {
    let (registry, recorder) = setup(LobbyConfig::default());
    let (ada, _ada_rx) = connect(&registry, "ada").await;
    create_room(&registry, ada).await;
    send(&registry, ada, Command::Room(RoomCommand::StartGame)).await;

    registry.shutdown().await.unwrap();

    assert!(registry.snapshot().await.is_err());
    assert!(recorder.calls().contains(&Call::Stopped(R1)));
}

// =========================================================================
// Matchmaking
// =========================================================================

fn named(name: &str) -> Command {
    Command::Lobby(LobbyCommand::RequestMatch {
        settings: MatchSettings::from([(ROOM_NAME_KEY.to_string(), json!(name))]),
    })
}

#[tokio::test]
async fn test_matchmaking_groups_by_room_name() {
    let (registry, recorder) = setup(LobbyConfig::default());
    let (ada, _ada_rx) = connect(&registry, "ada").await;
    let (bo, _bo_rx) = connect(&registry, "bo").await;
    let (cy, _cy_rx) = connect(&registry, "cy").await;

    send(&registry, ada, named("crypt")).await;
    send(&registry, bo, named("crypt")).await;
    send(&registry, cy, named("tomb")).await;

    assert_eq!(
        recorder.calls(),
        vec![
            Call::Started(R1, vec![ada]),
            Call::Added(R1, bo),
            Call::Started(R2, vec![cy]),
        ]
    );
    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(member_ids(snapshot.room(R1).unwrap()), [ada, bo]);
}

#[tokio::test]
async fn test_matchmaking_rebinds_name_after_room_removed() {
    let (registry, recorder) = setup(LobbyConfig::default());
    let (ada, _ada_rx) = connect(&registry, "ada").await;

    send(&registry, ada, named("crypt")).await;
    send(&registry, ada, Command::Room(RoomCommand::LeaveRoom)).await;
    send(&registry, ada, named("crypt")).await;

    let snapshot = registry.snapshot().await.unwrap();
    assert!(snapshot.room(R1).is_none());
    assert_eq!(member_ids(snapshot.room(R2).unwrap()), [ada]);
    assert_eq!(recorder.starts(), 2);
}

// =========================================================================
// Deregistration
// =========================================================================

#[tokio::test]
async fn test_unregister_leaves_room_and_closes_stream() {
    let (registry, _) = setup(LobbyConfig::default());
    let (ada, mut ada_rx) = connect(&registry, "ada").await;
    let (bo, mut bo_rx) = connect(&registry, "bo").await;
    create_room(&registry, ada).await;
    join_room(&registry, bo, R1).await;
    lobby_events(&mut bo_rx);

    registry.unregister(ada).await.unwrap();
    let snapshot = registry.snapshot().await.unwrap();

    let events = lobby_events(&mut bo_rx);
    assert!(matches!(
        events.as_slice(),
        [LobbyEvent::RoomUpdated { room }, LobbyEvent::ParticipantLeft { id }]
            if room.owner.id == bo && *id == ada
    ));
    assert_eq!(snapshot.participants.len(), 1);
    assert_eq!(snapshot.room(R1).unwrap().owner.id, bo);

    lobby_events(&mut ada_rx);
    assert!(ada_rx.recv().await.is_none());
}
