//! The unreliable positional channel: `MOVE` out, `ACTOR_POS` in, over UDP.
//!
//! Nothing here is guaranteed. Datagrams may be lost, duplicated or
//! reordered; the session layer's position tracker copes with that. This
//! module only makes sure a garbled datagram never reaches the consumer.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use cardlink_protocol::{Outbound, PositionUpdate, decode, names};
use cardlink_tick::Dispatcher;
use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::lifecycle::{Lifecycle, shutdown_signalled};
use crate::{CloseReason, Connection, ConnectionId, ConnectionState, TransportError};

/// Large enough for any realistic batch of `ACTOR_POS` lines.
const RECV_BUFFER: usize = 65_507;

/// What a [`DatagramConnection`] hands to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum DatagramEvent {
    Position(PositionUpdate),
    /// Emitted exactly once, as the last event.
    Closed { reason: CloseReason },
}

struct Shared {
    lifecycle: Lifecycle,
    socket: UdpSocket,
    remote: SocketAddr,
    events: Dispatcher<DatagramEvent>,
}

impl Shared {
    fn finish(&self, reason: CloseReason) {
        if self.lifecycle.close() {
            info!(id = %self.lifecycle.id(), remote = %self.remote, %reason, "datagram channel closed");
            self.events.enqueue(DatagramEvent::Closed { reason });
        }
    }
}

/// A connected UDP socket plus its receive task.
pub struct DatagramConnection {
    shared: Arc<Shared>,
    /// Next `MOVE` sequence number.
    seq: AtomicU32,
}

impl DatagramConnection {
    /// Binds an ephemeral local port, connects it to `addr`, and sends
    /// `hello` (if any) as the first datagram.
    ///
    /// # Errors
    /// [`TransportError::ConnectError`] if resolving, binding or
    /// connecting fails; [`TransportError::SendFailed`] if the hello can't
    /// be sent.
    pub async fn connect(
        addr: &str,
        hello: Option<String>,
        events: Dispatcher<DatagramEvent>,
    ) -> Result<Self, TransportError> {
        let connect_err = |e| TransportError::connect(addr, e);

        let remote = lookup_host(addr)
            .await
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| {
                connect_err(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "address resolved to nothing",
                ))
            })?;
        let local = if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).await.map_err(connect_err)?;
        socket.connect(remote).await.map_err(connect_err)?;

        let lifecycle = Lifecycle::new();
        debug!(
            id = %lifecycle.id(),
            local = ?socket.local_addr().ok(),
            %remote,
            "datagram socket bound"
        );

        if let Some(hello) = hello {
            socket
                .send(hello.as_bytes())
                .await
                .map_err(TransportError::SendFailed)?;
            trace!(id = %lifecycle.id(), line = %hello, "sent hello");
        }

        let shared = Arc::new(Shared {
            lifecycle,
            socket,
            remote,
            events,
        });
        tokio::spawn(receive_loop(
            Arc::clone(&shared),
            shared.lifecycle.subscribe(),
        ));
        shared.lifecycle.mark_connected();

        info!(id = %shared.lifecycle.id(), %remote, "datagram channel open");
        Ok(Self {
            shared,
            seq: AtomicU32::new(0),
        })
    }

    /// Sends `MOVE seq=... x=... y=...` and returns the sequence used.
    ///
    /// Each call takes exactly one sequence number, starting at 0, whether
    /// or not the datagram makes it out.
    pub fn send_move(&self, x: f32, y: f32) -> Result<u32, TransportError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.send_line(Outbound::Move { seq, x, y }.to_line())?;
        Ok(seq)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared.socket.local_addr().ok()
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.shared.remote
    }
}

impl Connection for DatagramConnection {
    /// Fire-and-forget: a send that fails (full buffer, ICMP error) is
    /// logged and otherwise ignored.
    fn send_line(&self, line: String) -> Result<(), TransportError> {
        if self.shared.lifecycle.state() == ConnectionState::Closed {
            return Err(TransportError::Closed);
        }
        match self.shared.socket.try_send(line.as_bytes()) {
            Ok(_) => trace!(id = %self.shared.lifecycle.id(), %line, "sent datagram"),
            Err(e) => debug!(id = %self.shared.lifecycle.id(), error = %e, "datagram dropped"),
        }
        Ok(())
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
// Receive loop
// ---------------------------------------------------------------------------

async fn receive_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut buf = vec![0u8; RECV_BUFFER];

    loop {
        let received = tokio::select! {
            biased;
            _ = shutdown_signalled(&mut shutdown) => return,
            received = shared.socket.recv(&mut buf) => received,
        };

        match received {
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]);
                for update in parse_datagram(&text, n == buf.len()) {
                    if !shared.events.enqueue(DatagramEvent::Position(update)) {
                        shared.finish(CloseReason::LocalClose);
                        return;
                    }
                }
            }
            // An earlier send bounced (nothing listening yet). Not fatal.
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
                ) =>
            {
                debug!(id = %shared.lifecycle.id(), error = %e, "ignoring icmp error");
            }
            Err(e) => {
                warn!(id = %shared.lifecycle.id(), error = %e, "datagram receive failed");
                shared.finish(CloseReason::Error(e.to_string()));
                return;
            }
        }
    }
}

/// Splits one datagram into lines and keeps the well-formed `ACTOR_POS`
/// updates.
///
/// A datagram that filled the buffer may have been cut short; its last
/// line is dropped unless it ends in `\n`.
fn parse_datagram(text: &str, truncated: bool) -> Vec<PositionUpdate> {
    let text = match text.rfind('\n') {
        Some(end) if truncated => &text[..end],
        None if truncated => "",
        _ => text,
    };
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let cmd = decode(line);
            if cmd.name() != names::ACTOR_POS {
                trace!(name = cmd.name(), "ignoring datagram command");
                return None;
            }
            match PositionUpdate::parse(&cmd) {
                Ok(update) => Some(update),
                Err(e) => {
                    debug!(error = %e, "dropping malformed position");
                    None
                }
            }
        })
        .collect()
}
