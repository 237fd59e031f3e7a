//! The client's view of the room it's in.

use std::collections::BTreeMap;
use std::time::Duration;

use cardlink_protocol::{ActorId, Phase, RoomId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BoardError, RoomError};

/// A room never has more than a master and a challenger.
const MAX_MEMBERS: usize = 2;

// ---------------------------------------------------------------------------
// BoardConfig
// ---------------------------------------------------------------------------

/// Board dimensions and timing for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
    /// Per-card reveal time during the opening sequence (`dur`).
    pub reveal_delay: Duration,
    /// Whole-board reveal time at the end of the opening (`all_dur`).
    pub hold_duration: Duration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 4,
            cols: 4,
            reveal_delay: Duration::from_millis(500),
            hold_duration: Duration::from_millis(500),
        }
    }
}

impl BoardConfig {
    /// Largest board the client builds (8×8).
    pub const MAX_SLOTS: usize = 64;

    /// Checks that `rows × cols` is a playable board: non-zero, an even
    /// slot count, at most [`MAX_SLOTS`](Self::MAX_SLOTS). Returns the slot
    /// count.
    pub fn check_dimensions(rows: usize, cols: usize) -> Result<usize, BoardError> {
        match rows.checked_mul(cols) {
            Some(slots) if slots > 0 && slots % 2 == 0 && slots <= Self::MAX_SLOTS => Ok(slots),
            _ => Err(BoardError::InvalidDimensions { rows, cols }),
        }
    }

    pub fn with_dimensions(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }

    pub fn slot_count(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub actor_id: ActorId,
    pub score: u32,
    /// Play time recorded for this member in the current match.
    pub time: Duration,
}

impl Participant {
    fn new(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            score: 0,
            time: Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// What [`RoomState::depart`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The master left. The challenger, if there was one, is now master.
    MasterLeft { new_master: Option<ActorId> },
    ChallengerLeft,
}

/// The single room this client is in.
///
/// Invariants, kept by every method:
/// - at most two members, and `master` is always one of them;
/// - `challenger`, when set, is the other member;
/// - `turn`, when set, names a member.
#[derive(Debug, Clone)]
pub struct RoomState {
    room_id: RoomId,
    master: ActorId,
    challenger: Option<ActorId>,
    title: String,
    phase: Phase,
    turn: Option<ActorId>,
    config: BoardConfig,
    members: BTreeMap<ActorId, Participant>,
    challenger_ready: bool,
}

impl RoomState {
    pub fn new(room_id: RoomId, master: ActorId, title: impl Into<String>, config: BoardConfig) -> Self {
        let mut members = BTreeMap::new();
        members.insert(master.clone(), Participant::new(master.clone()));
        Self {
            room_id,
            master,
            challenger: None,
            title: title.into(),
            phase: Phase::Ready,
            turn: None,
            config,
            members,
            challenger_ready: false,
        }
    }

    // -- Accessors --

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn master(&self) -> &ActorId {
        &self.master
    }

    pub fn challenger(&self) -> Option<&ActorId> {
        self.challenger.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> Option<&ActorId> {
        self.turn.as_ref()
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn members(&self) -> impl Iterator<Item = &Participant> {
        self.members.values()
    }

    pub fn member(&self, actor: &ActorId) -> Option<&Participant> {
        self.members.get(actor)
    }

    pub fn is_member(&self, actor: &ActorId) -> bool {
        self.members.contains_key(actor)
    }

    pub fn is_master(&self, actor: &ActorId) -> bool {
        self.master == *actor
    }

    pub fn occupancy(&self) -> usize {
        self.members.len()
    }

    pub fn is_challenger_ready(&self) -> bool {
        self.challenger_ready
    }

    /// The master may start once a ready challenger is seated and no
    /// match is running.
    pub fn can_start(&self) -> bool {
        self.challenger.is_some() && self.challenger_ready && self.phase != Phase::Playing
    }

    /// `(master score, challenger score)`.
    pub fn scores(&self) -> (u32, u32) {
        let score = |a: Option<&ActorId>| {
            a.and_then(|a| self.members.get(a))
                .map_or(0, |p| p.score)
        };
        (score(Some(&self.master)), score(self.challenger.as_ref()))
    }

    // -- Guards --

    /// Rejects commands addressed to another room.
    pub fn check_room(&self, room_id: &RoomId) -> Result<(), RoomError> {
        if *room_id == self.room_id {
            Ok(())
        } else {
            Err(RoomError::RoomMismatch {
                expected: self.room_id.clone(),
                got: room_id.clone(),
            })
        }
    }

    // -- Membership --

    /// Adds `actor` as a member if it isn't one yet.
    ///
    /// # Errors
    /// [`RoomError::RoomFull`] if both seats are taken by others.
    pub fn ensure_member(&mut self, actor: &ActorId) -> Result<(), RoomError> {
        if self.members.contains_key(actor) {
            return Ok(());
        }
        if self.members.len() >= MAX_MEMBERS {
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }
        self.members
            .insert(actor.clone(), Participant::new(actor.clone()));
        Ok(())
    }

    /// Seats `actor` as challenger (or empties the seat with `None`).
    pub fn set_challenger(&mut self, actor: Option<ActorId>) -> Result<(), RoomError> {
        if let Some(old) = self.challenger.take() {
            if Some(&old) != actor.as_ref() {
                self.members.remove(&old);
                self.challenger_ready = false;
                if self.turn.as_ref() == Some(&old) {
                    self.turn = None;
                }
            }
        }
        if let Some(actor) = &actor {
            self.ensure_member(actor)?;
        }
        self.challenger = actor;
        Ok(())
    }

    /// Removes a member.
    ///
    /// If the master leaves, the challenger takes over and the challenger
    /// seat becomes empty. A departing turn holder clears the turn.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] if `actor` isn't a member.
    pub fn depart(&mut self, actor: &ActorId) -> Result<Departure, RoomError> {
        if self.members.remove(actor).is_none() {
            return Err(RoomError::NotInRoom(actor.clone(), self.room_id.clone()));
        }
        if self.turn.as_ref() == Some(actor) {
            self.turn = None;
        }
        self.challenger_ready = false;

        if self.master == *actor {
            let new_master = self.challenger.take();
            if let Some(next) = &new_master {
                debug!(room_id = %self.room_id, master = %next, "challenger promoted");
                self.master = next.clone();
            }
            Ok(Departure::MasterLeft { new_master })
        } else {
            self.challenger = None;
            Ok(Departure::ChallengerLeft)
        }
    }

    /// Makes `actor` the master. If it was the challenger, the old master
    /// (if still present) takes the challenger seat.
    pub fn promote(&mut self, actor: &ActorId) -> Result<(), RoomError> {
        if self.master == *actor {
            return Ok(());
        }
        if !self.members.contains_key(actor) {
            return Err(RoomError::NotInRoom(actor.clone(), self.room_id.clone()));
        }
        let old = std::mem::replace(&mut self.master, actor.clone());
        self.challenger = self.members.contains_key(&old).then_some(old);
        self.challenger_ready = false;
        Ok(())
    }

    // -- Match state --

    /// # Errors
    /// [`RoomError::InvalidPhase`] if the move isn't a legal transition.
    pub fn set_phase(&mut self, phase: Phase) -> Result<(), RoomError> {
        if !self.phase.can_transition_to(phase) {
            return Err(RoomError::InvalidPhase {
                from: self.phase,
                to: phase,
            });
        }
        self.phase = phase;
        Ok(())
    }

    /// Sets the phase without checking the transition. For server
    /// overrides such as a forced end.
    pub fn force_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(room_id = %self.room_id, from = %self.phase, to = %phase, "phase forced");
        }
        self.phase = phase;
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.challenger_ready = ready;
    }

    /// # Errors
    /// [`RoomError::NotInRoom`] if `actor` isn't a member.
    pub fn set_turn(&mut self, actor: &ActorId) -> Result<(), RoomError> {
        if !self.members.contains_key(actor) {
            return Err(RoomError::NotInRoom(actor.clone(), self.room_id.clone()));
        }
        self.turn = Some(actor.clone());
        Ok(())
    }

    pub fn clear_turn(&mut self) {
        self.turn = None;
    }

    pub fn set_scores(&mut self, master_score: u32, challenger_score: u32) {
        if let Some(p) = self.members.get_mut(&self.master) {
            p.score = master_score;
        }
        if let Some(p) = self
            .challenger
            .as_ref()
            .and_then(|c| self.members.get_mut(c))
        {
            p.score = challenger_score;
        }
    }

    pub fn reset_scores(&mut self) {
        for p in self.members.values_mut() {
            p.score = 0;
            p.time = Duration::ZERO;
        }
    }

    /// Adds play time to every member (called once per tick while playing).
    pub fn add_play_time(&mut self, dt: Duration) {
        for p in self.members.values_mut() {
            p.time += dt;
        }
    }

    pub fn set_dimensions(&mut self, rows: usize, cols: usize) {
        self.config.rows = rows;
        self.config.cols = cols;
    }

    pub fn set_timing(&mut self, reveal_delay: Duration, hold_duration: Duration) {
        self.config.reveal_delay = reveal_delay;
        self.config.hold_duration = hold_duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomState {
        RoomState::new(
            RoomId::from("r1"),
            ActorId::from("alice"),
            "Foo",
            BoardConfig::default(),
        )
    }

    fn full_room() -> RoomState {
        let mut r = room();
        r.set_challenger(Some(ActorId::from("bob"))).unwrap();
        r
    }

    #[test]
    fn test_new_room_has_master_only() {
        let r = room();
        assert_eq!(r.occupancy(), 1);
        assert!(r.is_master(&ActorId::from("alice")));
        assert_eq!(r.challenger(), None);
        assert_eq!(r.phase(), Phase::Ready);
        assert_eq!(r.config().slot_count(), 16);
    }

    #[test]
    fn test_third_member_is_rejected() {
        let mut r = full_room();
        let err = r.ensure_member(&ActorId::from("eve")).unwrap_err();
        assert_eq!(err, RoomError::RoomFull(RoomId::from("r1")));
        assert!(r.ensure_member(&ActorId::from("bob")).is_ok());
    }

    #[test]
    fn test_master_departure_promotes_challenger() {
        let mut r = full_room();
        let d = r.depart(&ActorId::from("alice")).unwrap();
        assert_eq!(
            d,
            Departure::MasterLeft {
                new_master: Some(ActorId::from("bob"))
            }
        );
        assert_eq!(r.master(), &ActorId::from("bob"));
        assert_eq!(r.challenger(), None);
        assert_eq!(r.occupancy(), 1);
    }

    #[test]
    fn test_departing_turn_holder_clears_turn() {
        let mut r = full_room();
        r.set_turn(&ActorId::from("bob")).unwrap();
        r.set_ready(true);
        assert_eq!(r.depart(&ActorId::from("bob")).unwrap(), Departure::ChallengerLeft);
        assert_eq!(r.turn(), None);
        assert!(!r.is_challenger_ready());
    }

    #[test]
    fn test_depart_non_member_errors() {
        let mut r = room();
        assert!(matches!(
            r.depart(&ActorId::from("zed")),
            Err(RoomError::NotInRoom(..))
        ));
    }

    #[test]
    fn test_turn_must_be_member() {
        let mut r = room();
        assert!(r.set_turn(&ActorId::from("bob")).is_err());
        assert_eq!(r.turn(), None);
    }

    #[test]
    fn test_promote_swaps_seats() {
        let mut r = full_room();
        r.promote(&ActorId::from("bob")).unwrap();
        assert_eq!(r.master(), &ActorId::from("bob"));
        assert_eq!(r.challenger(), Some(&ActorId::from("alice")));
    }

    #[test]
    fn test_scores_follow_seats() {
        let mut r = full_room();
        r.set_scores(3, 1);
        assert_eq!(r.scores(), (3, 1));
        r.reset_scores();
        assert_eq!(r.scores(), (0, 0));
    }

    #[test]
    fn test_can_start_requires_ready_challenger() {
        let mut r = room();
        r.set_ready(true);
        assert!(!r.can_start(), "no challenger");
        r.set_challenger(Some(ActorId::from("bob"))).unwrap();
        r.set_ready(true);
        assert!(r.can_start());
        r.set_phase(Phase::Playing).unwrap();
        assert!(!r.can_start());
    }

    #[test]
    fn test_illegal_phase_transition() {
        let mut r = room();
        assert_eq!(
            r.set_phase(Phase::End),
            Err(RoomError::InvalidPhase {
                from: Phase::Ready,
                to: Phase::End
            })
        );
    }

    #[test]
    fn test_forced_phase_skips_transition_check() {
        let mut r = room();
        r.force_phase(Phase::End);
        assert_eq!(r.phase(), Phase::End);
    }

    #[test]
    fn test_check_room_mismatch() {
        let r = room();
        assert!(r.check_room(&RoomId::from("r1")).is_ok());
        assert!(matches!(
            r.check_room(&RoomId::from("r2")),
            Err(RoomError::RoomMismatch { .. })
        ));
    }

    #[test]
    fn test_board_config_serializes_dimensions() {
        let json = serde_json::to_value(BoardConfig::with_dimensions(2, 3)).unwrap();
        assert_eq!(json["rows"], 2);
        assert_eq!(json["cols"], 3);
    }
}
