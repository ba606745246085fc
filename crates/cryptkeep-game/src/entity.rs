//! Players, monsters and interactive objects.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use cryptkeep_map::{Point, PropertyValue, Rect};
use cryptkeep_protocol::{
    Direction, MonsterId, MonsterKind, MonsterPosition, MonsterStats, ObjectId, ObjectKind,
    ObjectSnapshot, ObjectState, ParticipantHandle, ParticipantId, PlayerClass, PlayerPosition,
    PlayerStats,
};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// The three player attacks, each with its own cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackKind {
    Fireball,
    Sword,
    Arrow,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub(crate) participant: ParticipantHandle,
    pub class: PlayerClass,
    /// `0xRRGGBB`.
    pub color: String,
    pub max_hp: i32,
    pub hp: i32,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub moving: bool,
    last_attack: HashMap<AttackKind, Instant>,
}

impl Player {
    pub fn new(
        participant: ParticipantHandle,
        class: PlayerClass,
        color: String,
        max_hp: i32,
        spawn: Point,
    ) -> Self {
        Self {
            participant,
            class,
            color,
            max_hp,
            hp: max_hp,
            x: spawn.x,
            y: spawn.y,
            direction: Direction::Right,
            moving: false,
            last_attack: HashMap::new(),
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.participant.id()
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Checks the cooldown for `kind` and, if it has elapsed, restarts it.
    pub fn try_start_attack(&mut self, kind: AttackKind, cooldown: Duration, now: Instant) -> bool {
        if let Some(last) = self.last_attack.get(&kind) {
            if now.saturating_duration_since(*last) < cooldown {
                return false;
            }
        }
        self.last_attack.insert(kind, now);
        true
    }

    pub fn position_snapshot(&self) -> PlayerPosition {
        PlayerPosition {
            client_id: self.id(),
            x: self.x,
            y: self.y,
            direction: self.direction,
            is_moving: self.moving,
        }
    }

    pub fn stats(&self) -> PlayerStats {
        PlayerStats {
            position: self.position_snapshot(),
            class: self.class,
            nickname: self.participant.nickname().to_string(),
            color: self.color.clone(),
            max_hp: self.max_hp,
            hp: self.hp,
        }
    }
}

// ---------------------------------------------------------------------------
// Attack windows
// ---------------------------------------------------------------------------

/// Durations of one attack window, all measured from when it opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowTiming {
    /// Time before the effect is due.
    pub wind_up: Duration,
    /// The attack animation runs until here.
    pub active: Duration,
    /// The window closes here and the monster may attack again.
    pub total: Duration,
}

/// Where an attack window stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Idle,
    WindUp,
    /// The effect is due and has not fired yet.
    Strike,
    /// Effect done, animation still running.
    Active,
    /// Effect done, animation over, window not yet closed.
    Cooldown,
    /// The window has run its full length.
    Expired,
}

/// `idle → wind-up → strike → (active → cooldown) → idle`, driven purely by
/// elapsed time since the window opened. Nothing is scheduled; each AI tick
/// asks for the current phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackWindow {
    started_at: Option<Instant>,
    effect_fired: bool,
}

impl AttackWindow {
    pub fn is_idle(&self) -> bool {
        self.started_at.is_none()
    }

    pub fn open(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.effect_fired = false;
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.effect_fired = false;
    }

    /// Marks the effect as spent, whether or not it actually fired.
    pub fn spend_effect(&mut self) {
        self.effect_fired = true;
    }

    pub fn phase(&self, timing: &WindowTiming, now: Instant) -> WindowPhase {
        let Some(started) = self.started_at else {
            return WindowPhase::Idle;
        };
        let elapsed = now.saturating_duration_since(started);
        if elapsed < timing.wind_up {
            WindowPhase::WindUp
        } else if !self.effect_fired {
            WindowPhase::Strike
        } else if elapsed >= timing.total {
            WindowPhase::Expired
        } else if elapsed < timing.active {
            WindowPhase::Active
        } else {
            WindowPhase::Cooldown
        }
    }

    /// Whether the window has run its full length at `now`.
    pub fn has_elapsed(&self, timing: &WindowTiming, now: Instant) -> bool {
        self.started_at
            .is_some_and(|s| now.saturating_duration_since(s) >= timing.total)
    }
}

// ---------------------------------------------------------------------------
// Monster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Monster {
    pub id: MonsterId,
    pub kind: MonsterKind,
    pub hp: i32,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub moving: bool,
    pub attacking: bool,
    pub move_target: Point,
    pub window: AttackWindow,
    pub last_lightning: Option<Instant>,
    pub last_fire_circle: Option<Instant>,
}

impl Monster {
    pub fn new(id: MonsterId, kind: MonsterKind, hp: i32, at: Point) -> Self {
        Self {
            id,
            kind,
            hp,
            x: at.x,
            y: at.y,
            direction: Direction::Left,
            moving: false,
            attacking: false,
            move_target: at,
            window: AttackWindow::default(),
            last_lightning: None,
            last_fire_circle: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// One step of linear movement toward `move_target`, `speed` pixels per
    /// axis. Clears `moving` once both axes have arrived.
    pub fn step_toward_target(&mut self, speed: i32) {
        if !self.moving {
            return;
        }
        let target = self.move_target;
        if self.x != target.x {
            self.direction = if target.x > self.x {
                Direction::Right
            } else {
                Direction::Left
            };
            self.x = approach(self.x, target.x, speed);
        }
        if self.y != target.y {
            self.y = approach(self.y, target.y, speed);
        }
        if self.x == target.x && self.y == target.y {
            self.moving = false;
        }
    }

    pub fn position_snapshot(&self) -> MonsterPosition {
        MonsterPosition {
            id: self.id,
            x: self.x,
            y: self.y,
            direction: self.direction,
            is_moving: self.moving,
            is_attacking: self.attacking,
        }
    }

    pub fn stats(&self) -> MonsterStats {
        MonsterStats {
            position: self.position_snapshot(),
            kind: self.kind,
            hp: self.hp,
        }
    }
}

fn approach(from: i32, to: i32, speed: i32) -> i32 {
    if from < to {
        (from + speed).min(to)
    } else {
        (from - speed).max(to)
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GameObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub bounds: Rect,
    pub state: ObjectState,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl GameObject {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.bounds.x, self.bounds.y)
    }

    pub fn snapshot(&self) -> ObjectSnapshot {
        ObjectSnapshot {
            id: self.id,
            kind: self.kind,
            x: self.bounds.x,
            y: self.bounds.y,
            width: self.bounds.width,
            height: self.bounds.height,
            state: self.state,
        }
    }
}
