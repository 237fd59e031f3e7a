//! Identity and enum types shared by every layer.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The server-assigned name of an actor (a connected player).
///
/// A newtype over `String` so an actor can't be passed where a room is
/// expected. `#[serde(transparent)]` keeps it a plain string in config
/// files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The server-assigned identifier of a room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Phase: the coarse match lifecycle
// ---------------------------------------------------------------------------

/// The room/match lifecycle stage.
///
/// On the wire the server sends it as an integer (`phase=1`), matching the
/// declaration order here.
///
/// ```text
/// Ready ──(game start)──→ Playing ──(end / forced end)──→ End
///   ↑                                                      │
///   └────────────────(ready toggled / next round)──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Ready,
    Playing,
    End,
}

impl Phase {
    /// Converts the server's integer encoding. Unknown values → `None`.
    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Ready),
            1 => Some(Self::Playing),
            2 => Some(Self::End),
            _ => None,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            Self::Ready => 0,
            Self::Playing => 1,
            Self::End => 2,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    ///
    /// A new round may start from either `Ready` or `End`; staying in the
    /// same phase is always allowed (duplicate broadcasts are harmless).
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Ready, Self::Playing)
                | (Self::End, Self::Playing)
                | (Self::Playing, Self::End)
                | (Self::End, Self::Ready)
        ) || self == target
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Playing => write!(f, "Playing"),
            Self::End => write!(f, "End"),
        }
    }
}

// ---------------------------------------------------------------------------
// Winner
// ---------------------------------------------------------------------------

/// The outcome of a finished match. `-` on the wire means a draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Winner {
    Actor(ActorId),
    Draw,
}

impl Winner {
    pub fn from_wire(raw: &str) -> Self {
        if raw == "-" {
            Self::Draw
        } else {
            Self::Actor(ActorId::new(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ActorId::new("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId::from("r1").to_string(), "r1");
    }

    #[test]
    fn test_phase_wire_encoding() {
        for phase in [Phase::Ready, Phase::Playing, Phase::End] {
            assert_eq!(Phase::from_wire(phase.to_wire()), Some(phase));
        }
        assert_eq!(Phase::from_wire(7), None);
    }

    #[test]
    fn test_phase_transitions() {
        assert!(Phase::Ready.can_transition_to(Phase::Playing));
        assert!(Phase::End.can_transition_to(Phase::Playing));
        assert!(Phase::Playing.can_transition_to(Phase::End));
        assert!(!Phase::Ready.can_transition_to(Phase::End));
        assert!(!Phase::Playing.can_transition_to(Phase::Ready));
        assert!(Phase::Playing.can_transition_to(Phase::Playing));
    }

    #[test]
    fn test_winner_dash_is_draw() {
        assert_eq!(Winner::from_wire("-"), Winner::Draw);
        assert_eq!(Winner::from_wire("bob"), Winner::Actor(ActorId::new("bob")));
    }
}
