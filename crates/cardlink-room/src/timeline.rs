//! A tick-driven list of things to do later.
//!
//! The board needs delays (hide a missed pair after half a second, clear
//! the board a second after the game ends), but it must only ever be
//! mutated by its owner. So instead of timers, delayed work is queued here
//! and released by [`Timeline::advance`], which the owner calls once per
//! tick with that tick's `dt`.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

struct Entry<A> {
    due: Duration,
    /// Insertion order; breaks ties between actions due at the same time.
    seq: u64,
    action: A,
}

impl<A> PartialEq for Entry<A> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<A> Eq for Entry<A> {}

impl<A> PartialOrd for Entry<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for Entry<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Actions scheduled against a virtual clock.
///
/// Actions due at the same instant are released in the order they were
/// scheduled.
pub struct Timeline<A> {
    now: Duration,
    next_seq: u64,
    pending: BinaryHeap<Reverse<Entry<A>>>,
}

impl<A> Default for Timeline<A> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            pending: BinaryHeap::new(),
        }
    }
}

impl<A> Timeline<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` to be released `delay` after the current time.
    /// A zero delay releases it on the next [`advance`](Self::advance).
    pub fn schedule_in(&mut self, delay: Duration, action: A) {
        let entry = Entry {
            due: self.now + delay,
            seq: self.next_seq,
            action,
        };
        self.next_seq += 1;
        self.pending.push(Reverse(entry));
    }

    /// Moves the clock forward by `dt` and returns every action now due,
    /// earliest first.
    pub fn advance(&mut self, dt: Duration) -> Vec<A> {
        self.now += dt;
        let mut due = Vec::new();
        while self
            .pending
            .peek()
            .is_some_and(|Reverse(entry)| entry.due <= self.now)
        {
            if let Some(Reverse(entry)) = self.pending.pop() {
                due.push(entry.action);
            }
        }
        due
    }

    /// Drops every pending action. The clock keeps its value.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_releases_in_due_order() {
        let mut t = Timeline::new();
        t.schedule_in(30 * MS, "c");
        t.schedule_in(10 * MS, "a");
        t.schedule_in(20 * MS, "b");

        assert!(t.advance(5 * MS).is_empty());
        assert_eq!(t.advance(20 * MS), vec!["a", "b"]);
        assert_eq!(t.advance(5 * MS), vec!["c"]);
        assert!(t.is_empty());
    }

    #[test]
    fn test_ties_keep_scheduling_order() {
        let mut t = Timeline::new();
        for i in 0..5 {
            t.schedule_in(10 * MS, i);
        }
        assert_eq!(t.advance(10 * MS), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_delay_fires_on_next_advance() {
        let mut t = Timeline::new();
        t.schedule_in(Duration::ZERO, ());
        assert_eq!(t.advance(Duration::ZERO).len(), 1);
    }

    #[test]
    fn test_delay_is_relative_to_current_time() {
        let mut t = Timeline::new();
        t.advance(100 * MS);
        t.schedule_in(10 * MS, "x");
        assert!(t.advance(9 * MS).is_empty());
        assert_eq!(t.advance(MS), vec!["x"]);
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut t = Timeline::new();
        t.schedule_in(MS, 1);
        t.schedule_in(2 * MS, 2);
        t.clear();
        assert!(t.is_empty());
        assert!(t.advance(10 * MS).is_empty());

        // The clock kept running through the clear.
        t.schedule_in(5 * MS, 3);
        assert!(t.advance(4 * MS).is_empty());
        assert_eq!(t.advance(MS), vec![3]);
    }
}
