//! Typed server → client commands.
//!
//! A [`Command`] is stringly-typed: any name, any fields. The session layer
//! shouldn't have to look up `"masterScore"` by hand and decide what a
//! missing value means, so every command it handles is converted into a
//! variant of a closed enum first. Unknown names and missing/garbled
//! required fields become a [`ProtocolError`] at this boundary, which the
//! session logs and drops.

use std::time::Duration;

use crate::names;
use crate::{ActorId, Command, Phase, ProtocolError, RoomId, Winner};

// ---------------------------------------------------------------------------
// Control channel
// ---------------------------------------------------------------------------

/// The outcome of a single card flip, as reported by the server in both
/// `CAST_FLIP_RESULT` and `CAST_END_GAME`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipReport {
    pub room_id: RoomId,
    /// Row-major slot index that was flipped.
    pub index: usize,
    /// The card value under that slot.
    pub card: i32,
    /// Who holds the turn *after* this flip.
    pub turn: ActorId,
    pub master_score: u32,
    pub challenger_score: u32,
}

/// Every command the world server sends on the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `BROADCAST_HEART_BEAT`: periodic liveness ping.
    Heartbeat,

    /// `HELLO_OK`: the server bound our control connection to `actor`.
    HelloAck { actor: ActorId },

    /// `RES_CREATE_ROOM`: our own create request succeeded.
    RoomCreated {
        room_id: RoomId,
        master: ActorId,
        title: String,
    },

    /// `BROADCAST_CREATE_ROOM`: someone opened a room (lobby directory).
    RoomCreatedBroadcast {
        room_id: RoomId,
        master: ActorId,
        title: String,
    },

    /// `CAST_ENTER_ROOM`: the full room snapshot, sent to the room's
    /// members when someone enters.
    RoomEntered {
        room_id: RoomId,
        master: ActorId,
        /// Empty on the wire when the seat is free.
        challenger: Option<ActorId>,
        title: String,
        rows: usize,
        cols: usize,
    },

    /// `BROADCAST_ENTER_ROOM`: a room became full (lobby directory).
    RoomEnteredBroadcast { room_id: RoomId, title: String },

    /// `CAST_CHANGE_READY`: the challenger toggled ready.
    ReadyChanged { room_id: RoomId, is_ready: bool },

    /// `CAST_GAME_START`: the deck for the opening reveal plus its timing.
    GameStarted {
        room_id: RoomId,
        cards: Vec<i32>,
        /// How long each card is shown during the opening reveal (`dur`).
        per_card: Duration,
        /// How long the whole board is shown at the end (`all_dur`).
        hold: Duration,
        phase: Phase,
    },

    /// `CAST_FIRST_FLIP_END`: both clients finished the opening reveal;
    /// interactive play begins with `turn`.
    FirstFlipEnd {
        room_id: RoomId,
        turn: ActorId,
        master_score: u32,
        challenger_score: u32,
    },

    /// `CAST_FLIP_RESULT`: a flip during interactive play.
    FlipResult(FlipReport),

    /// `CAST_END_GAME`: the final flip plus the winner.
    EndGame { flip: FlipReport, winner: Winner },

    /// `CAST_EXIT_ROOM`: a member left the room.
    ExitRoom {
        room_id: RoomId,
        master: ActorId,
        exit_actor: ActorId,
    },

    /// `BROADCAST_EXIT_ROOM`: a room has a free seat again (lobby).
    ExitRoomBroadcast { room_id: RoomId, title: String },

    /// `BROADCAST_CHANGE_ROOM_MASTER`: authority moved to another member.
    MasterChanged { room_id: RoomId, master: ActorId },

    /// `BROADCAST_DELETE_ROOM`: a room is gone.
    RoomDeleted { room_id: RoomId, master: ActorId },

    /// `CAST_CHANGE_RULE`: new board dimensions.
    RuleChanged {
        room_id: RoomId,
        rows: usize,
        cols: usize,
    },

    /// `CAST_FORCED_END_GAME`: a member left mid-match.
    ForcedEndGame { room_id: RoomId, phase: Phase },

    /// `BROADCAST_EXIT_SERVER`: an actor disconnected from the world.
    ActorLeftServer { actor: ActorId },

    /// `ERR code=...`: the server rejected one of our requests.
    ServerError {
        code: String,
        room_id: Option<RoomId>,
    },
}

impl Inbound {
    /// Converts a decoded command into its typed form.
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownCommand`] for names this client doesn't handle;
    /// - [`ProtocolError::MissingField`] / [`ProtocolError::InvalidField`]
    ///   when a required field is absent or unparseable.
    pub fn parse(cmd: &Command) -> Result<Self, ProtocolError> {
        let inbound = match cmd.name() {
            names::BROADCAST_HEART_BEAT => Self::Heartbeat,
            names::HELLO_OK => Self::HelloAck {
                actor: actor(cmd, "actor")?,
            },
            names::RES_CREATE_ROOM => Self::RoomCreated {
                room_id: room(cmd)?,
                master: actor(cmd, "master")?,
                title: cmd.require("title")?.to_string(),
            },
            names::BROADCAST_CREATE_ROOM => Self::RoomCreatedBroadcast {
                room_id: room(cmd)?,
                master: actor(cmd, "master")?,
                title: cmd.require("title")?.to_string(),
            },
            names::CAST_ENTER_ROOM => Self::RoomEntered {
                room_id: room(cmd)?,
                master: actor(cmd, "master")?,
                challenger: cmd
                    .field("challenger")
                    .filter(|c| !c.is_empty())
                    .map(ActorId::from),
                title: cmd.require("title")?.to_string(),
                rows: cmd.require_parsed("rows")?,
                cols: cmd.require_parsed("cols")?,
            },
            names::BROADCAST_ENTER_ROOM => Self::RoomEnteredBroadcast {
                room_id: room(cmd)?,
                title: cmd.require("title")?.to_string(),
            },
            names::CAST_CHANGE_READY => Self::ReadyChanged {
                room_id: room(cmd)?,
                is_ready: parse_bool(cmd, "isReady")?,
            },
            names::CAST_GAME_START => Self::GameStarted {
                room_id: room(cmd)?,
                cards: parse_cards(cmd)?,
                per_card: Duration::from_millis(cmd.require_parsed("dur")?),
                hold: Duration::from_millis(cmd.require_parsed("all_dur")?),
                phase: optional_phase(cmd)?.unwrap_or(Phase::Playing),
            },
            names::CAST_FIRST_FLIP_END => Self::FirstFlipEnd {
                room_id: room(cmd)?,
                turn: actor(cmd, "turn")?,
                master_score: cmd.require_parsed("masterScore")?,
                challenger_score: cmd.require_parsed("challengerScore")?,
            },
            names::CAST_FLIP_RESULT => Self::FlipResult(flip_report(cmd)?),
            names::CAST_END_GAME => Self::EndGame {
                flip: flip_report(cmd)?,
                winner: Winner::from_wire(cmd.require("winner")?),
            },
            names::CAST_EXIT_ROOM => Self::ExitRoom {
                room_id: room(cmd)?,
                master: actor(cmd, "master")?,
                exit_actor: actor(cmd, "exitActor")?,
            },
            names::BROADCAST_EXIT_ROOM => Self::ExitRoomBroadcast {
                room_id: room(cmd)?,
                title: cmd.require("title")?.to_string(),
            },
            names::BROADCAST_CHANGE_ROOM_MASTER => Self::MasterChanged {
                room_id: room(cmd)?,
                master: actor(cmd, "master")?,
            },
            names::BROADCAST_DELETE_ROOM => Self::RoomDeleted {
                room_id: room(cmd)?,
                master: actor(cmd, "master")?,
            },
            names::CAST_CHANGE_RULE => Self::RuleChanged {
                room_id: room(cmd)?,
                rows: cmd.require_parsed("rows")?,
                cols: cmd.require_parsed("cols")?,
            },
            names::CAST_FORCED_END_GAME => Self::ForcedEndGame {
                room_id: room(cmd)?,
                phase: optional_phase(cmd)?.unwrap_or(Phase::End),
            },
            names::BROADCAST_EXIT_SERVER => Self::ActorLeftServer {
                actor: actor(cmd, "actor")?,
            },
            names::ERR => Self::ServerError {
                code: cmd.require("code")?.to_string(),
                room_id: cmd.field("roomId").map(RoomId::from),
            },
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(inbound)
    }

    /// The room this command is scoped to, if any.
    ///
    /// The session uses this to reject commands addressed to a room it
    /// isn't in (stale or foreign room ids).
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::RoomCreated { room_id, .. }
            | Self::RoomCreatedBroadcast { room_id, .. }
            | Self::RoomEntered { room_id, .. }
            | Self::RoomEnteredBroadcast { room_id, .. }
            | Self::ReadyChanged { room_id, .. }
            | Self::GameStarted { room_id, .. }
            | Self::FirstFlipEnd { room_id, .. }
            | Self::ExitRoom { room_id, .. }
            | Self::ExitRoomBroadcast { room_id, .. }
            | Self::MasterChanged { room_id, .. }
            | Self::RoomDeleted { room_id, .. }
            | Self::RuleChanged { room_id, .. }
            | Self::ForcedEndGame { room_id, .. } => Some(room_id),
            Self::FlipResult(flip) | Self::EndGame { flip, .. } => Some(&flip.room_id),
            Self::ServerError { room_id, .. } => room_id.as_ref(),
            Self::Heartbeat | Self::HelloAck { .. } | Self::ActorLeftServer { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// One world server advertised by the gateway after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldInfo {
    pub id: String,
    pub name: String,
    pub udp_host: String,
    pub udp_port: u16,
}

/// Replies the login gateway sends on its own control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayReply {
    /// `LOGIN_OK`: followed by `world_count` [`GatewayReply::World`] lines.
    LoginOk { token: String, world_count: usize },
    /// `WORLD`: one selectable world server.
    World(WorldInfo),
    /// `ERR_ID_EXSIT`: the id is already logged in elsewhere.
    DuplicateId,
    /// `ENTER_OK`: where to find the world and how to identify there.
    EnterOk {
        udp_host: String,
        udp_port: u16,
        udp_token: String,
        actor: ActorId,
    },
}

impl GatewayReply {
    pub fn parse(cmd: &Command) -> Result<Self, ProtocolError> {
        let reply = match cmd.name() {
            names::LOGIN_OK => Self::LoginOk {
                token: cmd.require("token")?.to_string(),
                world_count: cmd.optional_parsed("worldCount")?.unwrap_or(0),
            },
            names::WORLD => Self::World(WorldInfo {
                id: cmd.require("id")?.to_string(),
                name: cmd.field("name").unwrap_or_default().to_string(),
                udp_host: cmd.require("udp_host")?.to_string(),
                udp_port: cmd.require_parsed("udp_port")?,
            }),
            names::ERR_ID_EXSIT => Self::DuplicateId,
            names::ENTER_OK => Self::EnterOk {
                udp_host: cmd.require("udp_host")?.to_string(),
                udp_port: cmd.require_parsed("udp_port")?,
                udp_token: cmd.require("udp_token")?.to_string(),
                actor: actor(cmd, "actor")?,
            },
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Positional channel
// ---------------------------------------------------------------------------

/// `ACTOR_POS id=... x=... y=... [seq=...]` from a datagram.
///
/// Transient: forwarded to the avatar renderer and otherwise discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub actor_id: ActorId,
    pub x: f32,
    pub y: f32,
    /// Sender-side sequence number, when the server includes one.
    pub seq: Option<u32>,
}

impl PositionUpdate {
    /// Parses a positional update.
    ///
    /// `id` is required. Missing coordinates default to `0.0`, but present
    /// coordinates that don't parse to a finite number reject the line.
    pub fn parse(cmd: &Command) -> Result<Self, ProtocolError> {
        if cmd.name() != names::ACTOR_POS {
            return Err(ProtocolError::UnknownCommand(cmd.name().to_string()));
        }
        Ok(Self {
            actor_id: actor(cmd, "id")?,
            x: coordinate(cmd, "x")?,
            y: coordinate(cmd, "y")?,
            seq: cmd.optional_parsed("seq")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn room(cmd: &Command) -> Result<RoomId, ProtocolError> {
    let raw = cmd.require("roomId")?;
    if raw.is_empty() {
        return Err(cmd.invalid("roomId", raw));
    }
    Ok(RoomId::from(raw))
}

fn actor(cmd: &Command, key: &'static str) -> Result<ActorId, ProtocolError> {
    let raw = cmd.require(key)?;
    if raw.is_empty() {
        return Err(cmd.invalid(key, raw));
    }
    Ok(ActorId::from(raw))
}

fn parse_bool(cmd: &Command, key: &'static str) -> Result<bool, ProtocolError> {
    match cmd.require(key)? {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" => Ok(false),
        raw => Err(cmd.invalid(key, raw)),
    }
}

fn optional_phase(cmd: &Command) -> Result<Option<Phase>, ProtocolError> {
    match cmd.optional_parsed::<i32>("phase")? {
        None => Ok(None),
        Some(n) => Phase::from_wire(n)
            .map(Some)
            .ok_or_else(|| cmd.invalid("phase", &n.to_string())),
    }
}

/// `cards=3,1,2,...`: an empty list is valid (`cards=`).
fn parse_cards(cmd: &Command) -> Result<Vec<i32>, ProtocolError> {
    let raw = cmd.require("cards")?;
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| cmd.invalid("cards", raw)))
        .collect()
}

fn flip_report(cmd: &Command) -> Result<FlipReport, ProtocolError> {
    Ok(FlipReport {
        room_id: room(cmd)?,
        index: cmd.require_parsed("index")?,
        card: cmd.require_parsed("card")?,
        turn: actor(cmd, "turn")?,
        master_score: cmd.require_parsed("masterScore")?,
        challenger_score: cmd.require_parsed("challengerScore")?,
    })
}

fn coordinate(cmd: &Command, key: &'static str) -> Result<f32, ProtocolError> {
    match cmd.optional_parsed::<f32>(key)? {
        None => Ok(0.0),
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(cmd.invalid(key, cmd.field(key).unwrap_or_default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;

    fn parse(line: &str) -> Result<Inbound, ProtocolError> {
        Inbound::parse(&decode(line))
    }

    #[test]
    fn test_heartbeat_is_bare() {
        assert_eq!(parse("BROADCAST_HEART_BEAT").unwrap(), Inbound::Heartbeat);
    }

    #[test]
    fn test_room_created() {
        let msg = parse("RES_CREATE_ROOM roomId=r1 master=alice title=Foo").unwrap();
        assert_eq!(
            msg,
            Inbound::RoomCreated {
                room_id: RoomId::from("r1"),
                master: ActorId::from("alice"),
                title: "Foo".into(),
            }
        );
    }

    #[test]
    fn test_room_entered_empty_challenger_is_none() {
        let msg =
            parse("CAST_ENTER_ROOM roomId=r1 master=alice challenger= title=Foo rows=4 cols=3")
                .unwrap();
        match msg {
            Inbound::RoomEntered {
                challenger,
                rows,
                cols,
                ..
            } => {
                assert_eq!(challenger, None);
                assert_eq!((rows, cols), (4, 3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_game_started_parses_deck_and_timing() {
        let msg = parse("CAST_GAME_START roomId=r1 cards=3,1,2,3,1,2 dur=500 all_dur=800 phase=1")
            .unwrap();
        assert_eq!(
            msg,
            Inbound::GameStarted {
                room_id: RoomId::from("r1"),
                cards: vec![3, 1, 2, 3, 1, 2],
                per_card: Duration::from_millis(500),
                hold: Duration::from_millis(800),
                phase: Phase::Playing,
            }
        );
    }

    #[test]
    fn test_game_started_rejects_bad_card() {
        let err = parse("CAST_GAME_START roomId=r1 cards=1,x dur=500 all_dur=500").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField { field: "cards", .. }));
    }

    #[test]
    fn test_ready_changed_accepts_server_spelling() {
        let msg = parse("CAST_CHANGE_READY roomId=r1 isReady=True").unwrap();
        assert_eq!(
            msg,
            Inbound::ReadyChanged {
                room_id: RoomId::from("r1"),
                is_ready: true
            }
        );
        assert!(parse("CAST_CHANGE_READY roomId=r1 isReady=maybe").is_err());
    }

    #[test]
    fn test_end_game_draw() {
        let msg = parse(
            "CAST_END_GAME roomId=r1 index=5 card=2 turn=bob masterScore=4 challengerScore=4 winner=-",
        )
        .unwrap();
        match msg {
            Inbound::EndGame { flip, winner } => {
                assert_eq!(flip.index, 5);
                assert_eq!(winner, Winner::Draw);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_flip_result_missing_index_is_error() {
        let err =
            parse("CAST_FLIP_RESULT roomId=r1 card=2 turn=bob masterScore=0 challengerScore=0")
                .unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField { field: "index", .. }));
    }

    #[test]
    fn test_unknown_command_is_error() {
        let err = parse("FLY_TO_MOON speed=9000").unwrap_err();
        assert_eq!(err, ProtocolError::UnknownCommand("FLY_TO_MOON".into()));
    }

    #[test]
    fn test_room_id_scoping() {
        assert_eq!(parse("BROADCAST_HEART_BEAT").unwrap().room_id(), None);
        let msg = parse("CAST_CHANGE_RULE roomId=r9 rows=2 cols=2").unwrap();
        assert_eq!(msg.room_id(), Some(&RoomId::from("r9")));
    }

    #[test]
    fn test_server_error_with_room() {
        let msg = parse("ERR code=ROOM_NOT_FOUND roomId=r3").unwrap();
        assert_eq!(
            msg,
            Inbound::ServerError {
                code: "ROOM_NOT_FOUND".into(),
                room_id: Some(RoomId::from("r3")),
            }
        );
    }

    // =====================================================================
    // Gateway
    // =====================================================================

    #[test]
    fn test_gateway_world_entry() {
        let reply =
            GatewayReply::parse(&decode("WORLD id=0 name=alpha udp_host=10.0.0.2 udp_port=9001"))
                .unwrap();
        assert_eq!(
            reply,
            GatewayReply::World(WorldInfo {
                id: "0".into(),
                name: "alpha".into(),
                udp_host: "10.0.0.2".into(),
                udp_port: 9001,
            })
        );
    }

    #[test]
    fn test_gateway_duplicate_id() {
        let reply = GatewayReply::parse(&decode("ERR_ID_EXSIT ")).unwrap();
        assert_eq!(reply, GatewayReply::DuplicateId);
    }

    // =====================================================================
    // Positions
    // =====================================================================

    #[test]
    fn test_position_update_parses() {
        let pos = PositionUpdate::parse(&decode("ACTOR_POS id=bob x=1.5 y=-2.25")).unwrap();
        assert_eq!(pos.actor_id, ActorId::from("bob"));
        assert_eq!(pos.x, 1.5);
        assert_eq!(pos.y, -2.25);
        assert_eq!(pos.seq, None);
    }

    #[test]
    fn test_position_update_requires_id() {
        assert!(PositionUpdate::parse(&decode("ACTOR_POS x=1 y=2")).is_err());
    }

    #[test]
    fn test_position_update_rejects_non_finite() {
        assert!(PositionUpdate::parse(&decode("ACTOR_POS id=a x=NaN y=0")).is_err());
        assert!(PositionUpdate::parse(&decode("ACTOR_POS id=a x=oops y=0")).is_err());
    }
}
