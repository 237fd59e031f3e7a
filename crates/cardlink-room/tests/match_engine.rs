//! Integration tests for the match engine: flip rules, delays and the
//! opening reveal, all driven by explicit `advance` calls.

use std::time::Duration;

use cardlink_room::{BoardConfig, BoardError, BoardEvent, FlipOutcome, MatchEngine, Reveal};

const MS: Duration = Duration::from_millis(1);

fn board(rows: usize, cols: usize) -> MatchEngine {
    let mut engine = MatchEngine::default();
    engine.setup(rows, cols).unwrap();
    engine.drain_events();
    engine
}

// =========================================================================
// Setup
// =========================================================================

#[test]
fn test_setup_builds_hidden_board() {
    let mut engine = MatchEngine::default();
    engine.setup(4, 4).unwrap();

    assert_eq!(engine.len(), 16);
    assert!(engine.slots().iter().all(|s| !s.revealed && !s.locked && s.value.is_none()));
    assert!(engine.slots().iter().enumerate().all(|(i, s)| s.index == i));
    assert_eq!(engine.first_flip_index(), None);
    assert_eq!(engine.drain_events(), vec![BoardEvent::Reset { rows: 4, cols: 4 }]);
}

#[test]
fn test_setup_rejects_unplayable_sizes_untouched() {
    let mut engine = board(2, 2);
    engine.reveal(0, 3, FlipOutcome::Success).unwrap();
    engine.drain_events();

    for (rows, cols) in [(0, 4), (3, 3), (9, 8), (200_000, 200_000), (usize::MAX, 2)] {
        assert_eq!(
            engine.setup(rows, cols),
            Err(BoardError::InvalidDimensions { rows, cols })
        );
    }
    assert_eq!((engine.rows(), engine.cols(), engine.len()), (2, 2, 4));
    assert_eq!(engine.first_flip_index(), Some(0));
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_largest_board_is_eight_by_eight() {
    let mut engine = MatchEngine::default();
    engine.setup(8, 8).unwrap();
    assert_eq!(engine.len(), BoardConfig::MAX_SLOTS);
}

// =========================================================================
// Pairs
// =========================================================================

#[test]
fn test_first_flip_becomes_pending() {
    let mut engine = board(2, 2);
    assert_eq!(engine.reveal(1, 7, FlipOutcome::Fail), Ok(Reveal::First(1)));

    let slot = engine.slot(1).unwrap();
    assert!(slot.revealed && slot.locked);
    assert_eq!(slot.value, Some(7));
    assert_eq!(engine.first_flip_index(), Some(1));
}

#[test]
fn test_matching_pair_stays_revealed() {
    let mut engine = board(2, 2);
    engine.reveal(0, 3, FlipOutcome::Success).unwrap();
    let r = engine.reveal(2, 3, FlipOutcome::Success).unwrap();

    assert_eq!(r, Reveal::Matched { first: 0, second: 2 });
    assert_eq!(engine.first_flip_index(), None);
    for i in [0, 2] {
        let s = engine.slot(i).unwrap();
        assert!(s.revealed && s.locked, "slot {i}");
    }

    // Matched cards are never hidden by time passing.
    engine.advance(Duration::from_secs(5));
    assert!(engine.slot(0).unwrap().revealed);
}

#[test]
fn test_missed_pair_hides_after_fail_delay() {
    let mut engine = board(2, 2);
    engine.reveal(0, 3, FlipOutcome::Success).unwrap();
    let r = engine.reveal(3, 5, FlipOutcome::Fail).unwrap();
    assert_eq!(r, Reveal::Missed { first: 0, second: 3 });
    assert_eq!(engine.first_flip_index(), None);
    engine.drain_events();

    engine.advance(499 * MS);
    assert!(engine.slot(3).unwrap().revealed, "still showing before delay");

    engine.advance(MS);
    for i in [0, 3] {
        let s = engine.slot(i).unwrap();
        assert!(!s.revealed && !s.locked, "slot {i} should be hidden");
        assert_eq!(s.value, None);
    }
    assert_eq!(
        engine.drain_events(),
        vec![
            BoardEvent::SlotHidden { index: 0 },
            BoardEvent::SlotHidden { index: 3 }
        ]
    );
}

#[test]
fn test_custom_fail_delay() {
    let mut engine = MatchEngine::new(200 * MS, Duration::from_secs(1));
    engine.setup(1, 2).unwrap();
    engine.reveal(0, 1, FlipOutcome::Success).unwrap();
    engine.reveal(1, 2, FlipOutcome::Fail).unwrap();
    engine.advance(200 * MS);
    assert!(!engine.slot(0).unwrap().revealed);
}

#[test]
fn test_reveal_errors() {
    let mut engine = board(2, 2);
    assert_eq!(
        engine.reveal(4, 1, FlipOutcome::Success),
        Err(BoardError::IndexOutOfRange { index: 4, len: 4 })
    );

    engine.reveal(0, 1, FlipOutcome::Success).unwrap();
    assert_eq!(
        engine.reveal(0, 1, FlipOutcome::Success),
        Err(BoardError::SameSlot(0))
    );

    engine.reveal(1, 1, FlipOutcome::Success).unwrap();
    assert_eq!(
        engine.reveal(1, 1, FlipOutcome::Success),
        Err(BoardError::SlotLocked(1))
    );
}

// =========================================================================
// Opening reveal
// =========================================================================

#[test]
fn test_opening_sequence_timeline() {
    let mut engine = board(1, 3);
    let d = 100 * MS;
    let hold = 250 * MS;

    let total = engine.opening_sequence(&[5, 6, 7], d, hold).unwrap();
    assert_eq!(total, 3 * d + hold);
    assert!(!engine.is_interactive());

    // t = 0: card 0 shown.
    engine.advance(Duration::ZERO);
    assert_eq!(engine.drain_events(), vec![BoardEvent::SlotShown { index: 0, value: 5 }]);

    // t = d: card 0 hidden, card 1 shown.
    engine.advance(d);
    assert_eq!(
        engine.drain_events(),
        vec![
            BoardEvent::SlotHidden { index: 0 },
            BoardEvent::SlotShown { index: 1, value: 6 },
        ]
    );

    // t = 3d: last card hidden, then the whole board shown.
    engine.advance(2 * d);
    let events = engine.drain_events();
    assert!(events.contains(&BoardEvent::SlotHidden { index: 2 }));
    assert_eq!(
        &events[events.len() - 3..],
        &[
            BoardEvent::SlotShown { index: 0, value: 5 },
            BoardEvent::SlotShown { index: 1, value: 6 },
            BoardEvent::SlotShown { index: 2, value: 7 },
        ]
    );
    assert!(engine.slots().iter().all(|s| s.revealed));

    // Just before 3d + hold: still holding, still not interactive.
    engine.advance(hold - MS);
    assert!(engine.drain_events().is_empty());
    assert!(!engine.is_interactive());

    // t = 3d + hold: all hidden, finished.
    engine.advance(MS);
    let events = engine.drain_events();
    assert_eq!(events.last(), Some(&BoardEvent::OpeningFinished));
    assert!(engine.is_interactive());
    assert!(engine.slots().iter().all(|s| !s.revealed && !s.locked));
}

#[test]
fn test_each_card_shows_then_hides_then_shows_then_hides() {
    let mut engine = board(2, 2);
    let d = 50 * MS;
    engine.opening_sequence(&[1, 2, 1, 2], d, d).unwrap();

    let mut all = Vec::new();
    for _ in 0..30 {
        engine.advance(10 * MS);
        all.extend(engine.drain_events());
    }

    for i in 0..4 {
        let trail: Vec<&str> = all
            .iter()
            .filter_map(|e| match e {
                BoardEvent::SlotShown { index, .. } if *index == i => Some("shown"),
                BoardEvent::SlotHidden { index } if *index == i => Some("hidden"),
                _ => None,
            })
            .collect();
        assert_eq!(trail, vec!["shown", "hidden", "shown", "hidden"], "slot {i}");
    }
}

#[test]
fn test_flips_rejected_during_opening() {
    let mut engine = board(1, 2);
    engine.opening_sequence(&[1, 1], 10 * MS, 10 * MS).unwrap();
    assert_eq!(
        engine.reveal(0, 1, FlipOutcome::Success),
        Err(BoardError::OpeningInProgress)
    );
    engine.advance(30 * MS);
    assert!(engine.reveal(0, 1, FlipOutcome::Success).is_ok());
}

#[test]
fn test_deck_size_mismatch_fails_closed() {
    let mut engine = board(2, 2);
    let err = engine
        .opening_sequence(&[1, 2, 3], 10 * MS, 10 * MS)
        .unwrap_err();
    assert_eq!(err, BoardError::DeckSizeMismatch { expected: 4, got: 3 });
    assert!(engine.is_interactive());

    engine.advance(Duration::from_secs(1));
    assert!(engine.drain_events().is_empty(), "nothing scheduled");
}

// =========================================================================
// Reset / clear
// =========================================================================

#[test]
fn test_reset_clears_after_delay() {
    let mut engine = board(1, 2);
    engine.reveal(0, 4, FlipOutcome::Success).unwrap();
    engine.reveal(1, 4, FlipOutcome::Success).unwrap();
    engine.reset();

    engine.advance(999 * MS);
    assert!(engine.slot(0).unwrap().revealed);
    engine.drain_events();

    engine.advance(MS);
    assert!(engine.slots().iter().all(|s| !s.revealed && !s.locked));
    assert_eq!(engine.drain_events(), vec![BoardEvent::Reset { rows: 1, cols: 2 }]);
}

#[test]
fn test_clear_cancels_scheduled_work() {
    let mut engine = board(1, 2);
    engine.reveal(0, 1, FlipOutcome::Success).unwrap();
    engine.reveal(1, 2, FlipOutcome::Fail).unwrap();
    engine.clear();
    engine.drain_events();

    engine.advance(Duration::from_secs(2));
    assert!(engine.drain_events().is_empty());
    assert_eq!(engine.first_flip_index(), None);
}

#[test]
fn test_new_opening_cancels_pending_reset() {
    let mut engine = board(1, 2);
    engine.reset();
    engine.opening_sequence(&[3, 3], 100 * MS, 100 * MS).unwrap();
    engine.drain_events();

    // The stale wipe at 1s would have produced a Reset event.
    engine.advance(Duration::from_secs(1));
    assert!(!engine
        .drain_events()
        .iter()
        .any(|e| matches!(e, BoardEvent::Reset { .. })));
}
