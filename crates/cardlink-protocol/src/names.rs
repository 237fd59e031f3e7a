//! Command names as they appear on the wire.
//!
//! Kept in one place so the inbound parsers, the outbound builders and the
//! tests can't drift apart on spelling (the server's spellings are
//! preserved as-is, including `ERR_ID_EXSIT`).

// -- Client → server (control channel) --
pub const HELLO: &str = "HELLO";
pub const REQ_CREATE_ROOM: &str = "REQ_CREATE_ROOM";
pub const REQ_ENTER_ROOM: &str = "REQ_ENTER_ROOM";
pub const REQ_CHANGE_READY: &str = "REQ_CHANGE_READY";
pub const REQ_GAME_START: &str = "REQ_GAME_START";
pub const REQ_FLIP: &str = "REQ_FLIP";
pub const REQ_FIRST_FLIP_END: &str = "REQ_FIRST_FLIP_END";
pub const REQ_ROOM_EXIT: &str = "REQ_ROOM_EXIT";
pub const REQ_CHANGE_RULE: &str = "REQ_CHANGE_RULE";

// -- Client → gateway --
pub const LOGIN: &str = "LOGIN";
pub const ENTER_WORLD: &str = "ENTER_WORLD";

// -- Client → server (positional channel) --
pub const MOVE: &str = "MOVE";

// -- Server → client (control channel) --
pub const BROADCAST_HEART_BEAT: &str = "BROADCAST_HEART_BEAT";
pub const HELLO_OK: &str = "HELLO_OK";
pub const RES_CREATE_ROOM: &str = "RES_CREATE_ROOM";
pub const BROADCAST_CREATE_ROOM: &str = "BROADCAST_CREATE_ROOM";
pub const CAST_ENTER_ROOM: &str = "CAST_ENTER_ROOM";
pub const BROADCAST_ENTER_ROOM: &str = "BROADCAST_ENTER_ROOM";
pub const CAST_CHANGE_READY: &str = "CAST_CHANGE_READY";
pub const CAST_GAME_START: &str = "CAST_GAME_START";
pub const CAST_FIRST_FLIP_END: &str = "CAST_FIRST_FLIP_END";
pub const CAST_FLIP_RESULT: &str = "CAST_FLIP_RESULT";
pub const CAST_END_GAME: &str = "CAST_END_GAME";
pub const CAST_EXIT_ROOM: &str = "CAST_EXIT_ROOM";
pub const BROADCAST_EXIT_ROOM: &str = "BROADCAST_EXIT_ROOM";
pub const BROADCAST_CHANGE_ROOM_MASTER: &str = "BROADCAST_CHANGE_ROOM_MASTER";
pub const BROADCAST_DELETE_ROOM: &str = "BROADCAST_DELETE_ROOM";
pub const CAST_CHANGE_RULE: &str = "CAST_CHANGE_RULE";
pub const CAST_FORCED_END_GAME: &str = "CAST_FORCED_END_GAME";
pub const BROADCAST_EXIT_SERVER: &str = "BROADCAST_EXIT_SERVER";
pub const ERR: &str = "ERR";

// -- Gateway → client --
pub const LOGIN_OK: &str = "LOGIN_OK";
pub const WORLD: &str = "WORLD";
pub const ERR_ID_EXSIT: &str = "ERR_ID_EXSIT";
pub const ENTER_OK: &str = "ENTER_OK";

// -- Server → client (positional channel) --
pub const ACTOR_POS: &str = "ACTOR_POS";
