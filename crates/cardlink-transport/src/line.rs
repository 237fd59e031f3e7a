//! The reliable control channel: newline-delimited commands over TCP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cardlink_protocol::{Command, decode};
use cardlink_tick::Dispatcher;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::lifecycle::{Lifecycle, shutdown_signalled};
use crate::{CloseReason, Connection, ConnectionId, ConnectionState, TransportError};

/// Longest line accepted from the server, without its newline. A peer that
/// sends more without a newline gets its connection closed.
const MAX_LINE: usize = 64 * 1024;

/// What a [`LineConnection`] hands to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// One decoded line, in the order the server sent it.
    Command(Command),
    /// Always the last event for the connection, emitted exactly once.
    Closed { reason: CloseReason },
}

/// Everything the handle and both loops share.
struct Shared {
    lifecycle: Lifecycle,
    peer: SocketAddr,
    events: Dispatcher<LineEvent>,
}

impl Shared {
    fn finish(&self, reason: CloseReason) {
        if !self.lifecycle.close() {
            return;
        }
        let id = self.lifecycle.id();
        match &reason {
            CloseReason::Error(e) => {
                warn!(%id, peer = %self.peer, error = %e, "control connection failed")
            }
            _ => info!(%id, peer = %self.peer, %reason, "control connection closed"),
        }
        self.events.enqueue(LineEvent::Closed { reason });
    }
}

/// A TCP connection speaking one command per line.
///
/// Owns a receive task (socket → decode → dispatcher) and a send task
/// (outbound queue → socket). Dropping the handle does not close the
/// connection; call [`close`](Connection::close).
pub struct LineConnection {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<String>,
}

impl LineConnection {
    /// Connects to `addr`, giving up after `timeout`.
    ///
    /// On success the receive and send tasks are already running and
    /// decoded commands start arriving on `events`.
    ///
    /// # Errors
    /// [`TransportError::ConnectTimeout`], [`TransportError::ConnectRefused`]
    /// or [`TransportError::ConnectError`].
    pub async fn connect(
        addr: &str,
        timeout: Duration,
        events: Dispatcher<LineEvent>,
    ) -> Result<Self, TransportError> {
        let lifecycle = Lifecycle::new();
        debug!(id = %lifecycle.id(), addr, ?timeout, "connecting control channel");

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(TransportError::connect(addr, e)),
            Err(_) => {
                return Err(TransportError::ConnectTimeout {
                    addr: addr.to_string(),
                    timeout,
                });
            }
        };
        // Commands are small and latency matters more than packing.
        let _ = stream.set_nodelay(true);
        let peer = stream
            .peer_addr()
            .map_err(|e| TransportError::connect(addr, e))?;

        let (read, write) = stream.into_split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            lifecycle,
            peer,
            events,
        });

        tokio::spawn(receive_loop(
            Arc::clone(&shared),
            read,
            shared.lifecycle.subscribe(),
        ));
        tokio::spawn(send_loop(
            Arc::clone(&shared),
            write,
            outbound_rx,
            shared.lifecycle.subscribe(),
        ));
        shared.lifecycle.mark_connected();

        info!(id = %shared.lifecycle.id(), %peer, "control connection established");
        Ok(Self { shared, outbound })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.shared.peer
    }
}

impl Connection for LineConnection {
    fn send_line(&self, line: String) -> Result<(), TransportError> {
        if self.shared.lifecycle.state() == ConnectionState::Closed {
            return Err(TransportError::Closed);
        }
        trace!(id = %self.shared.lifecycle.id(), %line, "queue line");
        // Unbounded: a peer that stops reading makes this grow without limit.
        self.outbound.send(line).map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        self.shared.finish(CloseReason::LocalClose);
    }

    fn state(&self) -> ConnectionState {
        self.shared.lifecycle.state()
    }

    fn id(&self) -> ConnectionId {
        self.shared.lifecycle.id()
    }
}

// ---------------------------------------------------------------------------
// Background loops
// ---------------------------------------------------------------------------

async fn receive_loop(
    shared: Arc<Shared>,
    read: OwnedReadHalf,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut reader = BufReader::new(read);
    let mut frame = Vec::with_capacity(256);

    loop {
        frame.clear();
        let mut limited = (&mut reader).take(MAX_LINE as u64 + 1);
        let read = tokio::select! {
            biased;
            _ = shutdown_signalled(&mut shutdown) => return,
            read = limited.read_until(b'\n', &mut frame) => read,
        };

        match read {
            Ok(0) => {
                shared.finish(CloseReason::PeerClosed);
                return;
            }
            Ok(n) if n > MAX_LINE && !frame.ends_with(b"\n") => {
                shared.finish(CloseReason::Error(format!(
                    "line exceeds {MAX_LINE} bytes"
                )));
                return;
            }
            Ok(_) => {
                let text = String::from_utf8_lossy(&frame);
                let line = text.strip_suffix('\n').unwrap_or(text.as_ref());
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.is_empty() {
                    continue;
                }
                trace!(id = %shared.lifecycle.id(), %line, "recv line");
                if !shared.events.enqueue(LineEvent::Command(decode(line))) {
                    // Nobody is consuming any more.
                    shared.finish(CloseReason::LocalClose);
                    return;
                }
            }
            Err(e) => {
                shared.finish(CloseReason::Error(e.to_string()));
                return;
            }
        }
    }
}

async fn send_loop(
    shared: Arc<Shared>,
    mut write: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown_signalled(&mut shutdown) => return,
            next = outbound.recv() => match next {
                Some(line) => line,
                None => break,
            },
        };

        // close() interrupts a write the peer never drains.
        let written = tokio::select! {
            biased;
            _ = shutdown_signalled(&mut shutdown) => return,
            written = write_frame(&mut write, &line) => written,
        };
        if let Err(e) = written {
            shared.finish(CloseReason::Error(e.to_string()));
            return;
        }
        trace!(id = %shared.lifecycle.id(), %line, "sent line");
    }
    // The handle is gone. Returning early drops `write`, which also sends EOF.
    tokio::select! {
        biased;
        _ = shutdown_signalled(&mut shutdown) => {}
        _ = write.shutdown() => {}
    }
}

async fn write_frame(write: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    let mut frame = Vec::with_capacity(line.len() + 1);
    frame.extend_from_slice(line.as_bytes());
    frame.push(b'\n');
    write.write_all(&frame).await?;
    write.flush().await
}
