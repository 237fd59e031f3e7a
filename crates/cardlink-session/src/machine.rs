//! The session state machine.
//!
//! ```text
//!                HELLO_OK               room created / entered
//! Disconnected ───────────→ Lobby ─────────────────────────────→ InRoom(phase)
//!      │                      ↑                                       │
//!      │                      └──── exit / room deleted ──────────────┘
//!      │
//!      └──── (any state) control connection closed ────→ Left
//! ```
//!
//! The machine is the only writer of [`RoomState`], [`MatchEngine`] and
//! [`Lobby`]. Inbound events come from the dispatch queues, time comes from
//! [`SessionMachine::tick`], and outbound actions are called by the view.
//! All three run on the consumer, so plain `&mut self` is enough.

use std::sync::Arc;
use std::time::Duration;

use cardlink_protocol::{
    ActorId, Command, FlipReport, Inbound, Outbound, Phase, PositionUpdate, RoomId, Winner,
};
use cardlink_room::{
    BoardConfig, BoardEvent, Departure, FlipOutcome, Lobby, MatchEngine, RoomState,
};
use cardlink_transport::{CloseReason, Connection, DatagramEvent, LineEvent};
use tracing::{debug, info, trace, warn};

use crate::{PositionTracker, SessionContext, SessionError, View, ViewEvent};

// ---------------------------------------------------------------------------
// SessionSettings
// ---------------------------------------------------------------------------

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// How long a missed pair stays visible before a game start supplies
    /// its own `dur`.
    pub fail_delay: Duration,
    /// Delay between the end of a match and the board being cleared.
    pub reset_delay: Duration,
    /// Drop out-of-order positional updates.
    pub validate_positions: bool,
    /// Board used for our own create request when none is given.
    pub default_rows: usize,
    pub default_cols: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            fail_delay: MatchEngine::DEFAULT_FAIL_DELAY,
            reset_delay: MatchEngine::DEFAULT_RESET_DELAY,
            validate_positions: true,
            default_rows: 4,
            default_cols: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Where the session is, coarsely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Connected, but the server hasn't acknowledged `HELLO` yet.
    Disconnected,
    /// In the world, not in a room.
    Lobby,
    InRoom(Phase),
    /// The control connection closed. Terminal.
    Left,
}

// ---------------------------------------------------------------------------
// SessionMachine
// ---------------------------------------------------------------------------

/// Keeps room and match state in step with the server.
pub struct SessionMachine<V: View> {
    context: SessionContext,
    control: Arc<dyn Connection>,
    view: V,
    settings: SessionSettings,
    greeted: bool,
    left: bool,
    room: Option<RoomState>,
    board: MatchEngine,
    lobby: Lobby,
    positions: PositionTracker,
    /// Dimensions of our outstanding create request.
    pending_create: Option<(usize, usize)>,
}

impl<V: View> SessionMachine<V> {
    pub fn new(
        context: SessionContext,
        control: Arc<dyn Connection>,
        view: V,
        settings: SessionSettings,
    ) -> Self {
        let board = MatchEngine::new(settings.fail_delay, settings.reset_delay);
        let positions = PositionTracker::new(settings.validate_positions);
        Self {
            context,
            control,
            view,
            settings,
            greeted: false,
            left: false,
            room: None,
            board,
            lobby: Lobby::new(),
            positions,
            pending_create: None,
        }
    }

    // -- Queries --

    pub fn status(&self) -> SessionStatus {
        if self.left {
            SessionStatus::Left
        } else if let Some(room) = &self.room {
            SessionStatus::InRoom(room.phase())
        } else if self.greeted {
            SessionStatus::Lobby
        } else {
            SessionStatus::Disconnected
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.context.actor_id
    }

    pub fn room(&self) -> Option<&RoomState> {
        self.room.as_ref()
    }

    pub fn board(&self) -> &MatchEngine {
        &self.board
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn positions(&self) -> &PositionTracker {
        &self.positions
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn is_my_turn(&self) -> bool {
        self.room
            .as_ref()
            .and_then(|r| r.turn())
            .is_some_and(|t| *t == self.context.actor_id)
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Applies one event from the control channel.
    ///
    /// # Errors
    /// Malformed commands and commands that contradict local state. The
    /// caller logs them; the session stays usable.
    pub fn handle_line_event(&mut self, event: LineEvent) -> Result<(), SessionError> {
        match event {
            LineEvent::Command(cmd) => self.handle_command(&cmd),
            LineEvent::Closed { reason } => {
                self.on_closed(reason);
                Ok(())
            }
        }
    }

    /// Applies one event from the positional channel.
    pub fn handle_datagram_event(&mut self, event: DatagramEvent) -> Result<(), SessionError> {
        match event {
            DatagramEvent::Position(update) => self.on_position(update),
            DatagramEvent::Closed { reason } => {
                warn!(%reason, "positional channel closed");
            }
        }
        Ok(())
    }

    /// Applies one decoded control command.
    pub fn handle_command(&mut self, cmd: &Command) -> Result<(), SessionError> {
        if self.left {
            debug!(command = cmd.name(), "session over, command ignored");
            return Ok(());
        }
        let inbound = Inbound::parse(cmd)?;
        debug!(command = cmd.name(), "handling command");

        match inbound {
            Inbound::Heartbeat => {
                self.view.on_event(ViewEvent::Heartbeat);
                Ok(())
            }
            Inbound::HelloAck { actor } => {
                self.on_hello_ack(actor);
                Ok(())
            }
            Inbound::RoomCreated {
                room_id,
                master,
                title,
            } => self.on_room_created(room_id, master, title),
            Inbound::RoomEntered {
                room_id,
                master,
                challenger,
                title,
                rows,
                cols,
            } => self.on_room_entered(room_id, master, challenger, title, rows, cols),
            Inbound::ReadyChanged { room_id, is_ready } => {
                self.on_ready_changed(&room_id, is_ready);
                Ok(())
            }
            Inbound::GameStarted {
                room_id,
                cards,
                per_card,
                hold,
                phase,
            } => self.on_game_started(&room_id, &cards, per_card, hold, phase),
            Inbound::FirstFlipEnd {
                room_id,
                turn,
                master_score,
                challenger_score,
            } => self.on_first_flip_end(&room_id, &turn, master_score, challenger_score),
            Inbound::FlipResult(flip) => self.on_flip(&flip, None),
            Inbound::EndGame { flip, winner } => self.on_flip(&flip, Some(winner)),
            Inbound::ExitRoom {
                room_id,
                exit_actor,
                ..
            } => self.on_exit_room(&room_id, &exit_actor),
            Inbound::RuleChanged {
                room_id,
                rows,
                cols,
            } => self.on_rule_changed(&room_id, rows, cols),
            Inbound::ForcedEndGame { room_id, phase } => {
                self.on_forced_end(&room_id, phase);
                Ok(())
            }
            Inbound::RoomCreatedBroadcast {
                room_id,
                master,
                title,
            } => {
                let entry = self.lobby.room_opened(room_id, master, &title).clone();
                self.view.on_event(ViewEvent::LobbyUpdated(entry));
                Ok(())
            }
            Inbound::RoomEnteredBroadcast { room_id, title } => {
                let entry = self.lobby.room_filled(room_id, &title).clone();
                self.view.on_event(ViewEvent::LobbyUpdated(entry));
                Ok(())
            }
            Inbound::ExitRoomBroadcast { room_id, title } => {
                let entry = self.lobby.seat_freed(room_id, &title).clone();
                self.view.on_event(ViewEvent::LobbyUpdated(entry));
                Ok(())
            }
            Inbound::MasterChanged { room_id, master } => self.on_master_changed(&room_id, master),
            Inbound::RoomDeleted { room_id, master } => {
                self.on_room_deleted(&room_id, &master);
                Ok(())
            }
            Inbound::ActorLeftServer { actor } => {
                self.positions.remove(&actor);
                self.view.on_event(ViewEvent::AvatarRemoved(actor));
                Ok(())
            }
            Inbound::ServerError { code, room_id } => {
                warn!(%code, room_id = ?room_id, "server rejected request");
                self.view.on_event(ViewEvent::ServerError { code });
                Ok(())
            }
        }
    }

    /// Advances board time by `dt`. Call once per tick, after draining.
    ///
    /// # Errors
    /// Sending the opening acknowledgement failed.
    pub fn tick(&mut self, dt: Duration) -> Result<(), SessionError> {
        self.board.advance(dt);
        if let Some(room) = &mut self.room {
            if room.phase() == Phase::Playing {
                room.add_play_time(dt);
            }
        }
        self.flush_board()
    }

    // -----------------------------------------------------------------------
    // Outbound actions
    // -----------------------------------------------------------------------

    /// Asks the server for a new room with us as master. An empty title
    /// becomes `"room"`.
    pub fn create_room(&mut self, title: &str, rows: usize, cols: usize) -> Result<(), SessionError> {
        self.ensure_connected()?;
        if let Some(room) = &self.room {
            return Err(SessionError::AlreadyInRoom(room.room_id().clone()));
        }
        check_dimensions(rows, cols)?;
        let title = if title.trim().is_empty() { "room" } else { title };
        self.send(Outbound::CreateRoom {
            title: title.to_string(),
            rows,
            cols,
        })?;
        self.pending_create = Some((rows, cols));
        Ok(())
    }

    pub fn enter_room(&mut self, room_id: &RoomId) -> Result<(), SessionError> {
        self.ensure_connected()?;
        if let Some(room) = &self.room {
            return Err(SessionError::AlreadyInRoom(room.room_id().clone()));
        }
        self.send(Outbound::EnterRoom {
            room_id: room_id.clone(),
        })
    }

    /// Flips the challenger's ready flag on the server.
    pub fn toggle_ready(&mut self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        let room = self.room.as_ref().ok_or(SessionError::NotInRoom)?;
        if room.challenger() != Some(&self.context.actor_id) {
            return Err(SessionError::NotChallenger);
        }
        if room.phase() == Phase::Playing {
            return Err(SessionError::WrongPhase(room.phase()));
        }
        let out = Outbound::ChangeReady {
            room_id: room.room_id().clone(),
            is_ready: !room.is_challenger_ready(),
        };
        self.send(out)
    }

    /// Master only, while the challenger is ready.
    pub fn start_game(&mut self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        let room = self.room.as_ref().ok_or(SessionError::NotInRoom)?;
        if !room.is_master(&self.context.actor_id) {
            return Err(SessionError::NotMaster);
        }
        if room.phase() == Phase::Playing {
            return Err(SessionError::WrongPhase(room.phase()));
        }
        if !room.can_start() {
            return Err(SessionError::ChallengerNotReady);
        }
        let out = Outbound::GameStart {
            room_id: room.room_id().clone(),
        };
        self.send(out)
    }

    /// Requests a flip. The board only changes when the server's result
    /// comes back.
    pub fn flip(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_connected()?;
        let room = self.room.as_ref().ok_or(SessionError::NotInRoom)?;
        if room.phase() != Phase::Playing {
            return Err(SessionError::WrongPhase(room.phase()));
        }
        if room.turn() != Some(&self.context.actor_id) {
            return Err(SessionError::NotYourTurn);
        }
        self.board.check_flippable(index)?;
        let out = Outbound::Flip {
            room_id: room.room_id().clone(),
            actor: self.context.actor_id.clone(),
            index,
        };
        self.send(out)
    }

    pub fn exit_room(&mut self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        let room = self.room.as_ref().ok_or(SessionError::NotInRoom)?;
        let out = Outbound::RoomExit {
            room_id: room.room_id().clone(),
            actor: self.context.actor_id.clone(),
        };
        self.send(out)
    }

    /// Master only, outside a running match.
    pub fn change_rule(&mut self, rows: usize, cols: usize) -> Result<(), SessionError> {
        self.ensure_connected()?;
        let room = self.room.as_ref().ok_or(SessionError::NotInRoom)?;
        if !room.is_master(&self.context.actor_id) {
            return Err(SessionError::NotMaster);
        }
        if room.phase() == Phase::Playing {
            return Err(SessionError::WrongPhase(room.phase()));
        }
        check_dimensions(rows, cols)?;
        let out = Outbound::ChangeRule {
            room_id: room.room_id().clone(),
            master: self.context.actor_id.clone(),
            cols,
            rows,
        };
        self.send(out)
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn on_hello_ack(&mut self, actor: ActorId) {
        if actor != self.context.actor_id {
            warn!(expected = %self.context.actor_id, got = %actor, "HELLO_OK for another actor");
        }
        self.greeted = true;
        info!(%actor, "joined world");
        self.view.on_event(ViewEvent::Connected { actor });
    }

    fn on_room_created(
        &mut self,
        room_id: RoomId,
        master: ActorId,
        title: String,
    ) -> Result<(), SessionError> {
        if let Some(room) = &self.room {
            return Err(SessionError::AlreadyInRoom(room.room_id().clone()));
        }
        if master != self.context.actor_id {
            warn!(%room_id, %master, "room created for another master");
        }
        let (rows, cols) = self
            .pending_create
            .take()
            .unwrap_or((self.settings.default_rows, self.settings.default_cols));
        check_dimensions(rows, cols)?;
        self.open_room(RoomState::new(
            room_id,
            master,
            title,
            BoardConfig::with_dimensions(rows, cols),
        ))?;
        self.flush_board()
    }

    fn on_room_entered(
        &mut self,
        room_id: RoomId,
        master: ActorId,
        challenger: Option<ActorId>,
        title: String,
        rows: usize,
        cols: usize,
    ) -> Result<(), SessionError> {
        if let Some(current) = &self.room {
            if let Err(e) = current.check_room(&room_id) {
                debug!(error = %e, "ignoring command for another room");
                return Ok(());
            }
        }
        check_dimensions(rows, cols)?;

        let mut snapshot =
            RoomState::new(room_id, master, title, BoardConfig::with_dimensions(rows, cols));
        snapshot.set_challenger(challenger)?;

        match self.room.take() {
            None => self.open_room(snapshot)?,
            Some(previous) => {
                // A new member arrived; keep the board unless its size changed.
                let resized = previous.config().rows != rows || previous.config().cols != cols;
                if resized {
                    self.board.setup(rows, cols)?;
                }
                self.room = Some(snapshot);
                self.emit_members();
                self.emit_gating();
            }
        }
        self.flush_board()
    }

    fn on_ready_changed(&mut self, room_id: &RoomId, is_ready: bool) {
        let me = &self.context.actor_id;
        let Some(room) = scoped(&mut self.room, room_id) else {
            return;
        };
        room.set_ready(is_ready);
        // Toggling ready after a finished match starts the next round.
        if room.phase() == Phase::End {
            room.force_phase(Phase::Ready);
            room.reset_scores();
            self.view.on_event(ViewEvent::PhaseChanged(Phase::Ready));
            self.view.on_event(ViewEvent::ScoresChanged {
                master: 0,
                challenger: 0,
            });
        }
        let start = room.is_master(me) && room.can_start();
        self.view.on_event(ViewEvent::ReadyChanged { ready: is_ready });
        self.view.on_event(ViewEvent::StartEnabled(start));
    }

    fn on_game_started(
        &mut self,
        room_id: &RoomId,
        cards: &[i32],
        per_card: Duration,
        hold: Duration,
        phase: Phase,
    ) -> Result<(), SessionError> {
        let me = self.context.actor_id.clone();
        let Some(room) = scoped(&mut self.room, room_id) else {
            return Ok(());
        };
        let previous = room.phase();
        room.set_phase(phase)?;
        let (rows, cols) = (room.config().rows, room.config().cols);

        let opened = self.board.setup(rows, cols).and_then(|()| {
            self.board.set_fail_delay(per_card);
            self.board.opening_sequence(cards, per_card, hold)
        });
        if let Err(e) = opened {
            warn!(%room_id, error = %e, "cannot play opening, game start rejected");
            room.force_phase(previous);
            self.flush_board()?;
            return Err(e.into());
        }

        room.set_timing(per_card, hold);
        room.clear_turn();
        room.reset_scores();
        let is_challenger = room.challenger() == Some(&me);
        info!(%room_id, cards = cards.len(), ?per_card, ?hold, "game started");

        self.view.on_event(ViewEvent::PhaseChanged(phase));
        self.view.on_event(ViewEvent::ScoresChanged {
            master: 0,
            challenger: 0,
        });
        self.view.on_event(ViewEvent::StartEnabled(false));
        if is_challenger {
            self.send(Outbound::ChangeReady {
                room_id: room_id.clone(),
                is_ready: false,
            })?;
        }
        self.flush_board()
    }

    fn on_first_flip_end(
        &mut self,
        room_id: &RoomId,
        turn: &ActorId,
        master_score: u32,
        challenger_score: u32,
    ) -> Result<(), SessionError> {
        let Some(room) = scoped(&mut self.room, room_id) else {
            return Ok(());
        };
        room.set_turn(turn)?;
        room.set_scores(master_score, challenger_score);
        debug!(%room_id, %turn, "interactive play begins");
        self.view.on_event(ViewEvent::ScoresChanged {
            master: master_score,
            challenger: challenger_score,
        });
        self.view.on_event(ViewEvent::TurnChanged {
            actor: turn.clone(),
            mine: *turn == self.context.actor_id,
        });
        Ok(())
    }

    /// A flip during play (`winner` is `None`) or the final flip of a match.
    fn on_flip(&mut self, flip: &FlipReport, winner: Option<Winner>) -> Result<(), SessionError> {
        let Some(room) = scoped(&mut self.room, &flip.room_id) else {
            return Ok(());
        };

        // The server keeps the turn with whoever just matched.
        let outcome = if winner.is_some() || room.turn() == Some(&flip.turn) {
            FlipOutcome::Success
        } else {
            FlipOutcome::Fail
        };
        let revealed = self.board.reveal(flip.index, flip.card, outcome);
        match &revealed {
            Ok(r) => trace!(room_id = %flip.room_id, ?r, "flip applied"),
            Err(e) => warn!(room_id = %flip.room_id, index = flip.index, error = %e, "flip not applied"),
        }

        room.set_turn(&flip.turn)?;
        room.set_scores(flip.master_score, flip.challenger_score);
        self.view.on_event(ViewEvent::ScoresChanged {
            master: flip.master_score,
            challenger: flip.challenger_score,
        });
        self.view.on_event(ViewEvent::TurnChanged {
            actor: flip.turn.clone(),
            mine: flip.turn == self.context.actor_id,
        });

        if let Some(winner) = winner {
            room.force_phase(Phase::End);
            info!(room_id = %flip.room_id, ?winner, "game over");
            self.board.reset();
            self.view.on_event(ViewEvent::PhaseChanged(Phase::End));
            self.view.on_event(ViewEvent::GameEnded { winner });
        }

        self.flush_board()?;
        revealed.map(|_| ()).map_err(Into::into)
    }

    fn on_exit_room(&mut self, room_id: &RoomId, exit_actor: &ActorId) -> Result<(), SessionError> {
        let Some(room) = scoped(&mut self.room, room_id) else {
            return Ok(());
        };
        if *exit_actor == self.context.actor_id {
            self.close_room();
            return Ok(());
        }
        match room.depart(exit_actor)? {
            Departure::MasterLeft { new_master } => {
                info!(%room_id, left = %exit_actor, new_master = ?new_master, "master left");
            }
            Departure::ChallengerLeft => debug!(%room_id, left = %exit_actor, "challenger left"),
        }
        self.emit_members();
        self.emit_gating();
        Ok(())
    }

    fn on_master_changed(&mut self, room_id: &RoomId, master: ActorId) -> Result<(), SessionError> {
        if let Some(entry) = self.lobby.master_changed(room_id, master.clone()) {
            let entry = entry.clone();
            self.view.on_event(ViewEvent::LobbyUpdated(entry));
        }
        let Some(room) = self.room.as_mut().filter(|r| r.room_id() == room_id) else {
            return Ok(());
        };
        room.promote(&master)?;
        self.emit_members();
        self.emit_gating();
        Ok(())
    }

    fn on_room_deleted(&mut self, room_id: &RoomId, master: &ActorId) {
        if self.lobby.remove(room_id).is_some() {
            self.view.on_event(ViewEvent::LobbyRemoved(room_id.clone()));
        }
        let ours = self.room.as_ref().is_some_and(|r| r.room_id() == room_id);
        if ours {
            debug!(%room_id, %master, "our room was deleted");
            self.close_room();
        }
    }

    fn on_rule_changed(
        &mut self,
        room_id: &RoomId,
        rows: usize,
        cols: usize,
    ) -> Result<(), SessionError> {
        let Some(room) = scoped(&mut self.room, room_id) else {
            return Ok(());
        };
        // Nothing changes unless the new size is playable.
        check_dimensions(rows, cols)?;
        room.set_dimensions(rows, cols);
        debug!(%room_id, rows, cols, "rule changed");
        self.board.setup(rows, cols)?;
        self.flush_board()
    }

    fn on_forced_end(&mut self, room_id: &RoomId, phase: Phase) {
        let Some(room) = scoped(&mut self.room, room_id) else {
            return;
        };
        room.force_phase(phase);
        room.reset_scores();
        room.clear_turn();
        info!(%room_id, %phase, "game ended by server");
        self.board.reset();
        self.view.on_event(ViewEvent::PhaseChanged(phase));
        self.view.on_event(ViewEvent::ScoresChanged {
            master: 0,
            challenger: 0,
        });
        self.emit_gating();
    }

    fn on_position(&mut self, update: PositionUpdate) {
        if self.positions.accept(&update) {
            self.view.on_event(ViewEvent::Position(update));
        }
    }

    fn on_closed(&mut self, reason: CloseReason) {
        if self.left {
            return;
        }
        info!(%reason, "session ended");
        self.close_room();
        self.left = true;
        self.pending_create = None;
        self.view.on_event(ViewEvent::Disconnected { reason });
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.left || self.control.is_closed() {
            return Err(SessionError::NotConnected);
        }
        Ok(())
    }

    fn send(&self, out: Outbound) -> Result<(), SessionError> {
        debug!(command = out.name(), "send");
        self.control.send_line(out.to_line())?;
        Ok(())
    }

    fn open_room(&mut self, room: RoomState) -> Result<(), SessionError> {
        let (rows, cols) = (room.config().rows, room.config().cols);
        self.board.setup(rows, cols)?;
        self.board.set_fail_delay(self.settings.fail_delay);
        info!(room_id = %room.room_id(), master = %room.master(), rows, cols, "entered room");
        self.view.on_event(ViewEvent::RoomOpened {
            room_id: room.room_id().clone(),
            title: room.title().to_string(),
            rows,
            cols,
        });
        self.view.on_event(ViewEvent::PhaseChanged(room.phase()));
        self.room = Some(room);
        self.emit_members();
        self.emit_gating();
        Ok(())
    }

    /// Drops the local room and everything scheduled on its board.
    fn close_room(&mut self) {
        let Some(room) = self.room.take() else {
            return;
        };
        info!(room_id = %room.room_id(), "left room");
        self.board.clear();
        self.board.drain_events();
        self.view.on_event(ViewEvent::RoomClosed {
            room_id: room.room_id().clone(),
        });
    }

    fn emit_members(&mut self) {
        if let Some(room) = &self.room {
            self.view.on_event(ViewEvent::MembersChanged {
                master: room.master().clone(),
                challenger: room.challenger().cloned(),
            });
        }
    }

    fn emit_gating(&mut self) {
        if let Some(room) = &self.room {
            let start = room.is_master(&self.context.actor_id) && room.can_start();
            self.view.on_event(ViewEvent::StartEnabled(start));
        }
    }

    /// Forwards board events to the view, acknowledging a finished opening.
    fn flush_board(&mut self) -> Result<(), SessionError> {
        for event in self.board.drain_events() {
            let view_event = match event {
                BoardEvent::SlotShown { index, value } => ViewEvent::SlotShown { index, value },
                BoardEvent::SlotHidden { index } => ViewEvent::SlotHidden { index },
                BoardEvent::Reset { rows, cols } => ViewEvent::BoardReset { rows, cols },
                BoardEvent::OpeningFinished => {
                    if let Some(room) = &self.room {
                        debug!(room_id = %room.room_id(), "opening finished, acknowledging");
                        self.send(Outbound::FirstFlipEnd {
                            room_id: room.room_id().clone(),
                            actor: self.context.actor_id.clone(),
                        })?;
                    }
                    continue;
                }
            };
            self.view.on_event(view_event);
        }
        Ok(())
    }
}

/// The current room, if `room_id` names it. Commands for another room (or
/// for no room at all) are logged and ignored.
fn scoped<'a>(room: &'a mut Option<RoomState>, room_id: &RoomId) -> Option<&'a mut RoomState> {
    let Some(current) = room.as_mut() else {
        debug!(%room_id, "not in a room, command ignored");
        return None;
    };
    match current.check_room(room_id) {
        Ok(()) => Some(current),
        Err(e) => {
            debug!(error = %e, "ignoring command for another room");
            None
        }
    }
}

/// Applies to outbound requests and to sizes the server sends alike.
fn check_dimensions(rows: usize, cols: usize) -> Result<(), SessionError> {
    BoardConfig::check_dimensions(rows, cols)
        .map(|_| ())
        .map_err(|_| SessionError::InvalidDimensions { rows, cols })
}
