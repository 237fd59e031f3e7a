//! The card-matching board.
//!
//! The server decides everything that matters (which card is under which
//! slot, whether a pair matched, whose turn it is). The engine's job is to
//! mirror those decisions on a local board and to stage them in time: show
//! a missed pair for a moment before hiding it, run the opening reveal, and
//! clear the board shortly after a match ends.
//!
//! ```text
//!              reveal (no pending)            reveal + Success
//!   hidden ───────────────────────→ pending ────────────────────→ matched (locked)
//!      ↑                               │
//!      │        fail delay             │ reveal + Fail
//!      └──────── hide both ←───────────┘
//! ```
//!
//! Observable changes are collected as [`BoardEvent`]s; the owner drains
//! them with [`MatchEngine::drain_events`] and forwards them to the view.

use std::time::Duration;

use tracing::{debug, trace};

use crate::{BoardConfig, BoardError, Timeline};

/// One position on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSlot {
    pub index: usize,
    pub revealed: bool,
    /// Locked slots can't be flipped (pending or matched).
    pub locked: bool,
    /// Known only while revealed.
    pub value: Option<i32>,
}

impl CardSlot {
    fn hidden(index: usize) -> Self {
        Self {
            index,
            revealed: false,
            locked: false,
            value: None,
        }
    }

    fn hide(&mut self) {
        self.revealed = false;
        self.locked = false;
        self.value = None;
    }
}

/// The server's verdict on the second flip of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    Success,
    Fail,
}

/// What a successful [`MatchEngine::reveal`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// First card of a pair; it's now the pending flip.
    First(usize),
    /// Both cards stay face up for good.
    Matched { first: usize, second: usize },
    /// Both cards will be hidden after the fail delay.
    Missed { first: usize, second: usize },
}

/// Something the view should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    SlotShown { index: usize, value: i32 },
    SlotHidden { index: usize },
    /// The board was rebuilt or wiped; every slot is hidden.
    Reset { rows: usize, cols: usize },
    /// The opening reveal ran to completion; the board is interactive.
    OpeningFinished,
}

/// Delayed work. Private: callers only see its effects as events.
#[derive(Debug, Clone, Copy)]
enum BoardAction {
    Show(usize),
    Hide(usize),
    ShowAll,
    HideAll,
    FinishOpening,
    HidePair(usize, usize),
    Wipe,
}

/// The local mirror of the card board.
pub struct MatchEngine {
    rows: usize,
    cols: usize,
    slots: Vec<CardSlot>,
    first_flip: Option<usize>,
    /// Deck for the opening reveal, present only while it runs.
    opening_deck: Option<Vec<i32>>,
    timeline: Timeline<BoardAction>,
    events: Vec<BoardEvent>,
    fail_delay: Duration,
    reset_delay: Duration,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FAIL_DELAY, Self::DEFAULT_RESET_DELAY)
    }
}

impl MatchEngine {
    pub const DEFAULT_FAIL_DELAY: Duration = Duration::from_millis(500);
    pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(1);

    /// An empty (0×0) board. Call [`setup`](Self::setup) before use.
    pub fn new(fail_delay: Duration, reset_delay: Duration) -> Self {
        Self {
            rows: 0,
            cols: 0,
            slots: Vec::new(),
            first_flip: None,
            opening_deck: None,
            timeline: Timeline::new(),
            events: Vec::new(),
            fail_delay,
            reset_delay,
        }
    }

    /// Rebuilds the board as `rows × cols` hidden slots, cancelling any
    /// scheduled work.
    ///
    /// # Errors
    /// [`BoardError::InvalidDimensions`] (board untouched) unless
    /// [`BoardConfig::check_dimensions`] accepts the size.
    pub fn setup(&mut self, rows: usize, cols: usize) -> Result<(), BoardError> {
        let len = BoardConfig::check_dimensions(rows, cols)?;
        self.rows = rows;
        self.cols = cols;
        self.slots = (0..len).map(CardSlot::hidden).collect();
        self.first_flip = None;
        self.opening_deck = None;
        self.timeline.clear();
        debug!(rows, cols, "board rebuilt");
        self.events.push(BoardEvent::Reset { rows, cols });
        Ok(())
    }

    // -- Queries --

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[CardSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&CardSlot> {
        self.slots.get(index)
    }

    /// The pending first flip, if any.
    pub fn first_flip_index(&self) -> Option<usize> {
        self.first_flip
    }

    /// `false` while the opening reveal runs.
    pub fn is_interactive(&self) -> bool {
        self.opening_deck.is_none()
    }

    pub fn fail_delay(&self) -> Duration {
        self.fail_delay
    }

    pub fn set_fail_delay(&mut self, delay: Duration) {
        self.fail_delay = delay;
    }

    /// Checks that `index` could be flipped right now, without changing
    /// anything.
    pub fn check_flippable(&self, index: usize) -> Result<(), BoardError> {
        if !self.is_interactive() {
            return Err(BoardError::OpeningInProgress);
        }
        let slot = self.slots.get(index).ok_or(BoardError::IndexOutOfRange {
            index,
            len: self.slots.len(),
        })?;
        if self.first_flip == Some(index) {
            return Err(BoardError::SameSlot(index));
        }
        if slot.locked {
            return Err(BoardError::SlotLocked(index));
        }
        Ok(())
    }

    // -- Flips --

    /// Shows `value` at `index`.
    ///
    /// With no pending flip this becomes the pending flip and `outcome` is
    /// ignored. Otherwise it completes the pair: on
    /// [`FlipOutcome::Success`] both slots stay locked face up; on
    /// [`FlipOutcome::Fail`] both are hidden and unlocked after the fail
    /// delay. Either way the pending flip is cleared immediately.
    pub fn reveal(
        &mut self,
        index: usize,
        value: i32,
        outcome: FlipOutcome,
    ) -> Result<Reveal, BoardError> {
        self.check_flippable(index)?;

        self.show(index, value, true);

        let Some(first) = self.first_flip.take() else {
            self.first_flip = Some(index);
            return Ok(Reveal::First(index));
        };

        match outcome {
            FlipOutcome::Success => {
                debug!(first, second = index, "pair matched");
                Ok(Reveal::Matched {
                    first,
                    second: index,
                })
            }
            FlipOutcome::Fail => {
                debug!(first, second = index, delay = ?self.fail_delay, "pair missed");
                self.timeline
                    .schedule_in(self.fail_delay, BoardAction::HidePair(first, index));
                Ok(Reveal::Missed {
                    first,
                    second: index,
                })
            }
        }
    }

    // -- Opening reveal --

    /// Plays the opening reveal for `deck`.
    ///
    /// Each card `i` is shown at `i·per_card` and hidden one step later;
    /// then the whole board is shown at `N·per_card` and hidden again
    /// after `hold`, followed by [`BoardEvent::OpeningFinished`]. Flips are
    /// rejected until then. Returns the total duration `N·per_card + hold`.
    ///
    /// # Errors
    /// [`BoardError::DeckSizeMismatch`] if `deck` doesn't have exactly one
    /// card per slot. Nothing is scheduled in that case.
    pub fn opening_sequence(
        &mut self,
        deck: &[i32],
        per_card: Duration,
        hold: Duration,
    ) -> Result<Duration, BoardError> {
        if deck.len() != self.slots.len() {
            return Err(BoardError::DeckSizeMismatch {
                expected: self.slots.len(),
                got: deck.len(),
            });
        }

        self.timeline.clear();
        self.first_flip = None;
        for slot in &mut self.slots {
            slot.hide();
        }

        let n = deck.len() as u32;
        for i in 0..n {
            self.timeline
                .schedule_in(per_card * i, BoardAction::Show(i as usize));
            self.timeline
                .schedule_in(per_card * (i + 1), BoardAction::Hide(i as usize));
        }
        let all_shown = per_card * n;
        let total = all_shown + hold;
        self.timeline.schedule_in(all_shown, BoardAction::ShowAll);
        self.timeline.schedule_in(total, BoardAction::HideAll);
        self.timeline.schedule_in(total, BoardAction::FinishOpening);
        self.opening_deck = Some(deck.to_vec());

        debug!(cards = n, ?total, "opening sequence started");
        Ok(total)
    }

    // -- Clearing --

    /// Hides every slot after the reset delay.
    pub fn reset(&mut self) {
        self.timeline.schedule_in(self.reset_delay, BoardAction::Wipe);
    }

    /// Hides every slot now and cancels all scheduled work.
    pub fn clear(&mut self) {
        self.timeline.clear();
        self.wipe();
    }

    // -- Time --

    /// Advances the board's clock and applies whatever became due.
    pub fn advance(&mut self, dt: Duration) {
        for action in self.timeline.advance(dt) {
            self.apply(action);
        }
    }

    /// Takes the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    // -- Internals --

    fn apply(&mut self, action: BoardAction) {
        trace!(?action, "board action");
        match action {
            BoardAction::Show(i) => {
                if let Some(v) = self.deck_value(i) {
                    self.show(i, v, false);
                }
            }
            BoardAction::Hide(i) => self.hide(i),
            BoardAction::ShowAll => {
                for i in 0..self.slots.len() {
                    if let Some(v) = self.deck_value(i) {
                        self.show(i, v, false);
                    }
                }
            }
            BoardAction::HideAll => {
                for i in 0..self.slots.len() {
                    self.hide(i);
                }
            }
            BoardAction::FinishOpening => {
                self.opening_deck = None;
                debug!("opening sequence finished");
                self.events.push(BoardEvent::OpeningFinished);
            }
            BoardAction::HidePair(a, b) => {
                self.hide(a);
                self.hide(b);
            }
            BoardAction::Wipe => self.wipe(),
        }
    }

    fn deck_value(&self, index: usize) -> Option<i32> {
        self.opening_deck.as_ref()?.get(index).copied()
    }

    fn show(&mut self, index: usize, value: i32, lock: bool) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.revealed = true;
            slot.locked = lock;
            slot.value = Some(value);
            self.events.push(BoardEvent::SlotShown { index, value });
        }
    }

    fn hide(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.hide();
            self.events.push(BoardEvent::SlotHidden { index });
        }
    }

    fn wipe(&mut self) {
        for slot in &mut self.slots {
            slot.hide();
        }
        self.first_flip = None;
        self.opening_deck = None;
        self.events.push(BoardEvent::Reset {
            rows: self.rows,
            cols: self.cols,
        });
    }
}
