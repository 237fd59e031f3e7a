//! Filtering of positional updates from the unreliable channel.
//!
//! Datagrams can arrive late, twice, or out of order. Updates that carry a
//! `seq` are only accepted if they are newer than the last accepted one for
//! the same actor; updates without one are always accepted.

use std::collections::HashMap;

use cardlink_protocol::{ActorId, PositionUpdate};
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct LastSeen {
    x: f32,
    y: f32,
    seq: Option<u32>,
}

/// Last known position per actor.
#[derive(Debug)]
pub struct PositionTracker {
    validate_seq: bool,
    actors: HashMap<ActorId, LastSeen>,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PositionTracker {
    /// With `validate_seq` off every update is accepted.
    pub fn new(validate_seq: bool) -> Self {
        Self {
            validate_seq,
            actors: HashMap::new(),
        }
    }

    /// Records `update` if it should be shown. Returns `false` for stale
    /// or duplicate updates.
    pub fn accept(&mut self, update: &PositionUpdate) -> bool {
        let previous = self.actors.get(&update.actor_id).and_then(|l| l.seq);
        if self.validate_seq {
            if let (Some(last), Some(seq)) = (previous, update.seq) {
                if !is_newer(seq, last) {
                    trace!(actor = %update.actor_id, seq, last, "stale position dropped");
                    return false;
                }
            }
        }
        self.actors.insert(
            update.actor_id.clone(),
            LastSeen {
                x: update.x,
                y: update.y,
                seq: update.seq.or(previous),
            },
        );
        true
    }

    /// Forgets an actor that left the world.
    pub fn remove(&mut self, actor: &ActorId) -> bool {
        self.actors.remove(actor).is_some()
    }

    pub fn position(&self, actor: &ActorId) -> Option<(f32, f32)> {
        self.actors.get(actor).map(|l| (l.x, l.y))
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

/// Serial-number comparison: `seq` is newer if it's less than half the
/// sequence space ahead of `last`.
fn is_newer(seq: u32, last: u32) -> bool {
    (seq.wrapping_sub(last) as i32) > 0
}
