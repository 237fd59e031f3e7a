//! The client's directory of open rooms.
//!
//! There is no "list rooms" request; the directory is assembled from the
//! room broadcasts the server sends to everyone in the world.

use std::collections::BTreeMap;

use cardlink_protocol::{ActorId, RoomId};
use serde::Serialize;

/// One open room as seen from the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LobbyEntry {
    pub room_id: RoomId,
    /// Unknown when we only ever saw a broadcast without it.
    pub master: Option<ActorId>,
    pub title: String,
    /// 1 or 2.
    pub occupancy: u8,
}

impl LobbyEntry {
    pub fn is_joinable(&self) -> bool {
        self.occupancy < 2
    }
}

#[derive(Debug, Default)]
pub struct Lobby {
    rooms: BTreeMap<RoomId, LobbyEntry>,
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    /// A room was created with its master inside.
    pub fn room_opened(&mut self, room_id: RoomId, master: ActorId, title: &str) -> &LobbyEntry {
        self.rooms
            .entry(room_id.clone())
            .and_modify(|e| {
                e.master = Some(master.clone());
                e.title = title.to_string();
                e.occupancy = 1;
            })
            .or_insert_with(|| LobbyEntry {
                room_id,
                master: Some(master),
                title: title.to_string(),
                occupancy: 1,
            })
    }

    /// Someone took the second seat.
    pub fn room_filled(&mut self, room_id: RoomId, title: &str) -> &LobbyEntry {
        self.set_occupancy(room_id, title, 2)
    }

    /// A member left; the room has a free seat again.
    pub fn seat_freed(&mut self, room_id: RoomId, title: &str) -> &LobbyEntry {
        self.set_occupancy(room_id, title, 1)
    }

    /// Returns the updated entry, or `None` if the room isn't known.
    pub fn master_changed(&mut self, room_id: &RoomId, master: ActorId) -> Option<&LobbyEntry> {
        let entry = self.rooms.get_mut(room_id)?;
        entry.master = Some(master);
        Some(entry)
    }

    pub fn remove(&mut self, room_id: &RoomId) -> Option<LobbyEntry> {
        self.rooms.remove(room_id)
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&LobbyEntry> {
        self.rooms.get(room_id)
    }

    /// All known rooms, ordered by id.
    pub fn entries(&self) -> impl Iterator<Item = &LobbyEntry> {
        self.rooms.values()
    }

    pub fn joinable(&self) -> impl Iterator<Item = &LobbyEntry> {
        self.rooms.values().filter(|e| e.is_joinable())
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn set_occupancy(&mut self, room_id: RoomId, title: &str, occupancy: u8) -> &LobbyEntry {
        let entry = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| LobbyEntry {
                room_id,
                master: None,
                title: String::new(),
                occupancy,
            });
        entry.title = title.to_string();
        entry.occupancy = occupancy;
        entry
    }
}
