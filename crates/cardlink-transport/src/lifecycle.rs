//! State shared by a connection handle and its background tasks.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use tokio::sync::watch;

use crate::{ConnectionId, ConnectionState};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

const CONNECTING: u8 = 0;
const CONNECTED: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle state plus the shutdown signal both I/O loops select on.
pub(crate) struct Lifecycle {
    id: ConnectionId,
    state: AtomicU8,
    shutdown: watch::Sender<bool>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            state: AtomicU8::new(CONNECTING),
            shutdown,
        }
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    /// `Connecting → Connected`. No effect if already closed.
    pub(crate) fn mark_connected(&self) {
        let _ = self
            .state
            .compare_exchange(CONNECTING, CONNECTED, Ordering::AcqRel, Ordering::Acquire);
    }

    pub(crate) fn state(&self) -> ConnectionState {
        match self.state.load(Ordering::Acquire) {
            CONNECTING => ConnectionState::Connecting,
            CONNECTED => ConnectionState::Connected,
            _ => ConnectionState::Closed,
        }
    }

    /// A receiver that observes `true` once the connection starts closing.
    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Moves to `Closed` and signals the loops.
    ///
    /// Returns `true` only for the call that performed the transition;
    /// that caller owns emitting the `Closed` event.
    pub(crate) fn close(&self) -> bool {
        if self.state.swap(CLOSED, Ordering::AcqRel) == CLOSED {
            return false;
        }
        self.shutdown.send_replace(true);
        true
    }
}

/// Resolves once `rx` observes the shutdown flag (or its sender is gone).
pub(crate) async fn shutdown_signalled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|closing| *closing).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_transitions_once() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), ConnectionState::Connecting);
        lc.mark_connected();
        assert_eq!(lc.state(), ConnectionState::Connected);

        assert!(lc.close());
        assert!(!lc.close());
        assert_eq!(lc.state(), ConnectionState::Closed);

        lc.mark_connected();
        assert_eq!(lc.state(), ConnectionState::Closed, "closed is terminal");
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Lifecycle::new().id(), Lifecycle::new().id());
    }

    #[tokio::test]
    async fn test_subscribers_see_shutdown() {
        let lc = Lifecycle::new();
        let mut rx = lc.subscribe();
        lc.close();
        shutdown_signalled(&mut rx).await;
        assert!(*rx.borrow());
    }
}
