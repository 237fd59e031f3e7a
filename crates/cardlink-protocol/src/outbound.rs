//! Typed client → server commands.

use crate::{ActorId, RoomId, encode, names, sanitize_value};

/// Every command this client sends, on either channel or to the gateway.
///
/// Built by the session layer and turned into a line with
/// [`to_line`](Outbound::to_line). User-supplied text is sanitized there, so
/// the codec's "no spaces, no `=`" rule holds for everything we emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// TCP identification, sent right after connecting.
    Hello { actor: ActorId },
    /// UDP identification, the first datagram on the positional channel.
    UdpHello { token: String, actor: ActorId },
    Login { id: String },
    EnterWorld { actor: ActorId, world: String },
    CreateRoom { title: String, rows: usize, cols: usize },
    EnterRoom { room_id: RoomId },
    ChangeReady { room_id: RoomId, is_ready: bool },
    GameStart { room_id: RoomId },
    Flip {
        room_id: RoomId,
        actor: ActorId,
        index: usize,
    },
    /// Acknowledges that the local opening reveal has finished.
    FirstFlipEnd { room_id: RoomId, actor: ActorId },
    RoomExit { room_id: RoomId, actor: ActorId },
    ChangeRule {
        room_id: RoomId,
        master: ActorId,
        cols: usize,
        rows: usize,
    },
    /// Positional update on the UDP channel.
    Move { seq: u32, x: f32, y: f32 },
}

impl Outbound {
    /// The wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } | Self::UdpHello { .. } => names::HELLO,
            Self::Login { .. } => names::LOGIN,
            Self::EnterWorld { .. } => names::ENTER_WORLD,
            Self::CreateRoom { .. } => names::REQ_CREATE_ROOM,
            Self::EnterRoom { .. } => names::REQ_ENTER_ROOM,
            Self::ChangeReady { .. } => names::REQ_CHANGE_READY,
            Self::GameStart { .. } => names::REQ_GAME_START,
            Self::Flip { .. } => names::REQ_FLIP,
            Self::FirstFlipEnd { .. } => names::REQ_FIRST_FLIP_END,
            Self::RoomExit { .. } => names::REQ_ROOM_EXIT,
            Self::ChangeRule { .. } => names::REQ_CHANGE_RULE,
            Self::Move { .. } => names::MOVE,
        }
    }

    /// Renders the command as one line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let fields: Vec<(&str, String)> = match self {
            Self::Hello { actor } => vec![("actor", actor.to_string())],
            Self::UdpHello { token, actor } => vec![
                ("token", sanitize_value(token)),
                ("actor", actor.to_string()),
            ],
            Self::Login { id } => vec![("id", sanitize_value(id))],
            Self::EnterWorld { actor, world } => vec![
                ("actor", actor.to_string()),
                ("world", sanitize_value(world)),
            ],
            Self::CreateRoom { title, rows, cols } => vec![
                ("title", sanitize_value(title)),
                ("rows", rows.to_string()),
                ("cols", cols.to_string()),
            ],
            Self::EnterRoom { room_id } => vec![("roomId", room_id.to_string())],
            Self::ChangeReady { room_id, is_ready } => vec![
                ("roomId", room_id.to_string()),
                ("isReady", if *is_ready { "True" } else { "False" }.to_string()),
            ],
            Self::GameStart { room_id } => vec![("roomId", room_id.to_string())],
            Self::Flip {
                room_id,
                actor,
                index,
            } => vec![
                ("roomId", room_id.to_string()),
                ("actor", actor.to_string()),
                ("index", index.to_string()),
            ],
            Self::FirstFlipEnd { room_id, actor } | Self::RoomExit { room_id, actor } => vec![
                ("roomId", room_id.to_string()),
                ("actor", actor.to_string()),
            ],
            Self::ChangeRule {
                room_id,
                master,
                cols,
                rows,
            } => vec![
                ("roomId", room_id.to_string()),
                ("master", master.to_string()),
                ("cols", cols.to_string()),
                ("rows", rows.to_string()),
            ],
            Self::Move { seq, x, y } => vec![
                ("seq", seq.to_string()),
                ("x", format!("{x:.3}")),
                ("y", format!("{y:.3}")),
            ],
        };
        encode(self.name(), fields)
    }
}
