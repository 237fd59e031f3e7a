//! Dispatch queues: the only thing producers and the consumer share.
//!
//! ```text
//!  receive task ──enqueue──┐
//!  receive task ──enqueue──┼──→ [ unbounded mpsc ] ──drain (once per tick)──→ consumer
//!  close()      ──enqueue──┘
//! ```
//!
//! Producers never call consumer code; they only push. The consumer pops
//! whatever was queued when its drain started, so a chatty producer can't
//! keep one tick running forever.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Creates a producer/consumer pair for one channel.
///
/// `name` shows up in logs (`"control"`, `"datagram"`, ...).
pub fn dispatch_queue<E>(name: &str) -> (Dispatcher<E>, DispatchQueue<E>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let name: Arc<str> = Arc::from(name);
    (
        Dispatcher {
            name: Arc::clone(&name),
            tx,
        },
        DispatchQueue { name, rx },
    )
}

// ---------------------------------------------------------------------------
// Producer side
// ---------------------------------------------------------------------------

/// The producer handle. Cheap to clone; usable from any task or thread.
pub struct Dispatcher<E> {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<E>,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
        }
    }
}

impl<E> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").field("name", &self.name).finish()
    }
}

impl<E> Dispatcher<E> {
    /// Queues an event for the consumer. Never blocks.
    ///
    /// Returns `false` if the consumer is gone; the event is dropped.
    pub fn enqueue(&self, event: E) -> bool {
        if self.tx.send(event).is_err() {
            trace!(queue = %self.name, "consumer gone, event dropped");
            return false;
        }
        true
    }

    /// `true` once the [`DispatchQueue`] has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Consumer side
// ---------------------------------------------------------------------------

/// What a single [`DispatchQueue::drain`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Items whose handler returned `Ok`.
    pub handled: usize,
    /// Items whose handler returned `Err` or panicked.
    pub failed: usize,
}

impl DrainReport {
    pub fn total(&self) -> usize {
        self.handled + self.failed
    }
}

/// The consumer handle. Owned by exactly one consumer.
pub struct DispatchQueue<E> {
    name: Arc<str>,
    rx: mpsc::UnboundedReceiver<E>,
}

impl<E> fmt::Debug for DispatchQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("name", &self.name)
            .field("pending", &self.rx.len())
            .finish()
    }
}

impl<E> DispatchQueue<E> {
    /// Runs `handler` on every item queued before this call, in arrival
    /// order.
    ///
    /// Items enqueued while the drain is running wait for the next call.
    /// A handler that returns `Err` or panics is logged and counted as
    /// failed; the remaining items are still delivered.
    pub fn drain<F, Er>(&mut self, mut handler: F) -> DrainReport
    where
        F: FnMut(E) -> Result<(), Er>,
        Er: fmt::Display,
    {
        let mut report = DrainReport::default();
        let pending = self.rx.len();

        for _ in 0..pending {
            let Ok(event) = self.rx.try_recv() else {
                break;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => report.handled += 1,
                Ok(Err(e)) => {
                    warn!(queue = %self.name, error = %e, "handler failed");
                    report.failed += 1;
                }
                Err(payload) => {
                    warn!(
                        queue = %self.name,
                        panic = panic_message(payload.as_ref()),
                        "handler panicked"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.total() > 0 {
            trace!(
                queue = %self.name,
                handled = report.handled,
                failed = report.failed,
                "drained"
            );
        }
        report
    }

    /// Waits for the next item. `None` once every [`Dispatcher`] is gone
    /// and the queue is empty.
    ///
    /// For request/response flows (login) that run before the tick loop
    /// starts.
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    /// Number of items waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}
