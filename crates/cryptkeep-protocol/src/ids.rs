//! Identity newtypes, facing direction and message addressing.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A connected participant. Assigned by the registry at registration,
/// strictly increasing and never reused within a process.
///
/// `#[serde(transparent)]` keeps the wire form a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A room. Assigned by the registry, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// A monster, unique within one game. Numbering starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonsterId(pub u32);

impl fmt::Display for MonsterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

/// An interactive map object, unique within one game. Numbering starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Facing direction of a creature. Serialized lowercase (`"left"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    #[default]
    Right,
}

impl Direction {
    /// Unit vector in screen coordinates (y grows downward).
    pub fn vector(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// The direction from `(x1, y1)` towards `(x2, y2)`, picking the
    /// dominant axis. Ties resolve vertically.
    pub fn towards(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        if (x2 - x1).abs() > (y2 - y1).abs() {
            if x2 > x1 { Self::Right } else { Self::Left }
        } else if y2 > y1 {
            Self::Down
        } else {
            Self::Up
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who an outbound event is for, relative to the scope that emits it
/// (every member of a game, or every registered participant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Everyone in scope.
    All,
    /// One participant.
    Participant(ParticipantId),
    /// Everyone in scope except one participant.
    AllExcept(ParticipantId),
}

impl Recipient {
    /// Whether `id` is addressed by this recipient.
    pub fn includes(&self, id: ParticipantId) -> bool {
        match self {
            Self::All => true,
            Self::Participant(target) => *target == id,
            Self::AllExcept(excluded) => *excluded != id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_bare_numbers() {
        assert_eq!(serde_json::to_string(&ParticipantId(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&MonsterId(3)).unwrap(), "3");
    }

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(ParticipantId(42).to_string(), "P-42");
        assert_eq!(RoomId(1).to_string(), "R-1");
        assert_eq!(MonsterId(2).to_string(), "M-2");
        assert_eq!(ObjectId(9).to_string(), "O-9");
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Left).unwrap(), "\"left\"");
        let d: Direction = serde_json::from_str("\"up\"").unwrap();
        assert_eq!(d, Direction::Up);
    }

    #[test]
    fn test_direction_towards_picks_dominant_axis() {
        assert_eq!(Direction::towards(0, 0, 10, 3), Direction::Right);
        assert_eq!(Direction::towards(0, 0, -10, 3), Direction::Left);
        assert_eq!(Direction::towards(0, 0, 2, 9), Direction::Down);
        assert_eq!(Direction::towards(0, 0, 5, -5), Direction::Up);
    }

    #[test]
    fn test_recipient_includes() {
        let a = ParticipantId(1);
        let b = ParticipantId(2);
        assert!(Recipient::All.includes(a));
        assert!(Recipient::Participant(a).includes(a));
        assert!(!Recipient::Participant(a).includes(b));
        assert!(!Recipient::AllExcept(a).includes(a));
        assert!(Recipient::AllExcept(a).includes(b));
    }
}
