//! The contract between the session machine and whatever presents it.

use cardlink_protocol::{ActorId, Phase, PositionUpdate, RoomId, Winner};
use cardlink_room::LobbyEntry;
use cardlink_transport::CloseReason;

/// Something the presentation layer should reflect.
///
/// Plain data: the machine never hands out references into its state.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The server bound our control connection to `actor`.
    Connected { actor: ActorId },

    RoomOpened {
        room_id: RoomId,
        title: String,
        rows: usize,
        cols: usize,
    },
    RoomClosed { room_id: RoomId },
    MembersChanged {
        master: ActorId,
        challenger: Option<ActorId>,
    },
    PhaseChanged(Phase),
    ReadyChanged { ready: bool },
    /// Whether the local player may press start right now.
    StartEnabled(bool),

    SlotShown { index: usize, value: i32 },
    SlotHidden { index: usize },
    BoardReset { rows: usize, cols: usize },
    ScoresChanged { master: u32, challenger: u32 },
    TurnChanged { actor: ActorId, mine: bool },
    GameEnded { winner: Winner },

    Position(PositionUpdate),
    AvatarRemoved(ActorId),

    LobbyUpdated(LobbyEntry),
    LobbyRemoved(RoomId),

    Heartbeat,
    ServerError { code: String },
    /// Always the last event of a session.
    Disconnected { reason: CloseReason },
}

/// Receives [`ViewEvent`]s from the session machine.
///
/// Called on the consumer, synchronously, in the order the events happen.
pub trait View {
    fn on_event(&mut self, event: ViewEvent);
}

/// Collects events; handy in tests and for polling-style frontends.
impl View for Vec<ViewEvent> {
    fn on_event(&mut self, event: ViewEvent) {
        self.push(event);
    }
}
