//! `Client` builder and consumer loop.
//!
//! This is the entry point for a game frontend. It ties the layers
//! together: transport → dispatch queues → session machine → view.
//!
//! ```text
//!  TCP receive task ──┐                      ┌──→ SessionMachine ──→ View
//!                     ├──→ dispatch queues ──┤        │
//!  UDP receive task ──┘    (drained per tick)          └──→ LineConnection (send task)
//! ```

use std::sync::Arc;
use std::time::Duration;

use cardlink_protocol::WorldInfo;
use cardlink_session::{
    LoginFlow, LoginStep, SessionContext, SessionError, SessionMachine, SessionStatus, View,
};
use cardlink_tick::{DispatchQueue, DrainReport, TickInfo, TickScheduler, dispatch_queue};
use cardlink_transport::{
    Connection, DatagramConnection, DatagramEvent, LineConnection, LineEvent,
};
use tracing::{debug, info, warn};

use crate::{CardlinkError, ClientConfig};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and connecting a [`Client`].
///
/// # Example
///
/// ```rust,ignore
/// let client = Client::builder()
///     .control_addr("127.0.0.1:7100")
///     .world_udp_addr("127.0.0.1:9001")
///     .user_id("alice")
///     .connect(Vec::<ViewEvent>::new())
///     .await?;
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    context: Option<SessionContext>,
}

impl ClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            context: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn control_addr(mut self, addr: &str) -> Self {
        self.config.control_addr = addr.to_string();
        self
    }

    pub fn world_udp_addr(mut self, addr: &str) -> Self {
        self.config.world_udp_addr = addr.to_string();
        self
    }

    pub fn user_id(mut self, user_id: &str) -> Self {
        self.config.user_id = user_id.to_string();
        self
    }

    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    /// Uses the identity from a gateway [`login`] instead of the config's
    /// `user_id`/`token`/`world_udp_addr`.
    pub fn context(mut self, context: SessionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Opens the positional channel, then the control channel, and sends
    /// `HELLO` on both.
    ///
    /// # Errors
    /// Any [`TransportError`](cardlink_transport::TransportError) from
    /// connecting. The positional channel is closed again if the control
    /// channel can't be opened.
    pub async fn connect<V: View>(self, view: V) -> Result<Client<V>, CardlinkError> {
        let config = self.config.validated();
        let context = self.context.unwrap_or_else(|| config.direct_context());

        let (datagram_tx, datagram_events) = dispatch_queue("datagram");
        let (control_tx, control_events) = dispatch_queue("control");

        let datagram = DatagramConnection::connect(
            &context.world_udp_addr,
            Some(context.udp_hello_line()),
            datagram_tx,
        )
        .await?;

        let control =
            match LineConnection::connect(&config.control_addr, config.connect_timeout(), control_tx)
                .await
            {
                Ok(conn) => Arc::new(conn),
                Err(e) => {
                    datagram.close();
                    return Err(e.into());
                }
            };
        control.send_line(context.hello_line())?;

        info!(
            actor = %context.actor_id,
            control = %config.control_addr,
            world = %context.world_udp_addr,
            "client connected"
        );

        let machine = SessionMachine::new(
            context,
            Arc::clone(&control) as Arc<dyn Connection>,
            view,
            config.session_settings(),
        );

        Ok(Client {
            machine,
            control,
            datagram,
            control_events,
            datagram_events,
            scheduler: TickScheduler::new(config.tick_config()),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// What one [`Client::pump`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub control: DrainReport,
    pub datagram: DrainReport,
}

/// A connected client: both channels plus the session they feed.
///
/// The client is the consumer. Nothing reaches the session except through
/// [`pump`](Self::pump), which the tick loop calls once per tick.
pub struct Client<V: View> {
    machine: SessionMachine<V>,
    control: Arc<LineConnection>,
    datagram: DatagramConnection,
    control_events: DispatchQueue<LineEvent>,
    datagram_events: DispatchQueue<DatagramEvent>,
    scheduler: TickScheduler,
}

impl<V: View> Client<V> {
    /// Creates a new builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn session(&self) -> &SessionMachine<V> {
        &self.machine
    }

    /// For outbound actions (`create_room`, `flip`, ...).
    pub fn session_mut(&mut self) -> &mut SessionMachine<V> {
        &mut self.machine
    }

    pub fn status(&self) -> SessionStatus {
        self.machine.status()
    }

    /// Drains both dispatch queues into the session, then advances board
    /// time by `dt`.
    pub fn pump(&mut self, dt: Duration) -> PumpReport {
        let machine = &mut self.machine;
        let control = self
            .control_events
            .drain(|event| machine.handle_line_event(event));
        let datagram = self
            .datagram_events
            .drain(|event| machine.handle_datagram_event(event));
        if let Err(e) = machine.tick(dt) {
            warn!(error = %e, "tick failed");
        }
        PumpReport { control, datagram }
    }

    /// Waits for the next tick and pumps once.
    pub async fn step(&mut self) -> TickInfo {
        let info = self.scheduler.wait_for_tick().await;
        // Skipped ticks still count as elapsed board time.
        let elapsed = info.dt * (1 + info.ticks_skipped as u32);
        self.pump(elapsed);
        self.scheduler.record_tick_end();
        info
    }

    /// Runs the tick loop until the control channel closes.
    pub async fn run_until_closed(&mut self) -> Result<(), CardlinkError> {
        info!(rate_hz = self.scheduler.tick_rate_hz(), "consumer loop running");
        while self.machine.status() != SessionStatus::Left {
            self.step().await;
        }
        // Anything left on the positional queue is stale now.
        self.datagram.close();
        debug!(ticks = self.scheduler.tick_count(), "consumer loop stopped");
        Ok(())
    }

    /// Sends our position on the positional channel. Returns the sequence
    /// number used.
    pub fn send_move(&self, x: f32, y: f32) -> Result<u32, CardlinkError> {
        Ok(self.datagram.send_move(x, y)?)
    }

    /// Closes both channels. The session sees `Closed` on the next pump.
    pub fn close(&self) {
        self.datagram.close();
        self.control.close();
    }
}

// ---------------------------------------------------------------------------
// Gateway login
// ---------------------------------------------------------------------------

/// Logs in through the gateway at `config.gateway_addr` and returns the
/// identity to connect to the world with.
///
/// `choose` picks a world id from the gateway's list; returning `None`
/// aborts the login.
///
/// # Errors
/// - [`CardlinkError::Config`] if no gateway is configured;
/// - [`CardlinkError::LoginTimeout`] if the gateway stays silent for a
///   whole connect timeout;
/// - [`SessionError::DuplicateId`] (as [`CardlinkError::Session`]) if the
///   id is already logged in;
/// - [`CardlinkError::NoWorld`] if there's nothing to enter.
pub async fn login<F>(config: &ClientConfig, mut choose: F) -> Result<SessionContext, CardlinkError>
where
    F: FnMut(&[WorldInfo]) -> Option<String>,
{
    let addr = config
        .gateway_addr
        .as_deref()
        .ok_or_else(|| CardlinkError::Config("no gateway_addr configured".into()))?;
    let timeout = config.connect_timeout();

    let (tx, mut replies) = dispatch_queue("gateway");
    let conn = LineConnection::connect(addr, timeout, tx).await?;
    let mut flow = LoginFlow::new(config.user_id.clone());

    let result = drive_login(&conn, &mut replies, &mut flow, timeout, &mut choose).await;
    conn.close();
    result
}

async fn drive_login<F>(
    conn: &LineConnection,
    replies: &mut DispatchQueue<LineEvent>,
    flow: &mut LoginFlow,
    timeout: Duration,
    choose: &mut F,
) -> Result<SessionContext, CardlinkError>
where
    F: FnMut(&[WorldInfo]) -> Option<String>,
{
    conn.send_line(flow.start().to_line())?;
    loop {
        let event = tokio::time::timeout(timeout, replies.recv())
            .await
            .map_err(|_| CardlinkError::LoginTimeout(timeout))?;
        let cmd = match event {
            Some(LineEvent::Command(cmd)) => cmd,
            Some(LineEvent::Closed { reason }) => {
                warn!(%reason, "gateway closed during login");
                return Err(SessionError::NotConnected.into());
            }
            None => return Err(SessionError::NotConnected.into()),
        };
        match flow.handle(&cmd)? {
            LoginStep::Wait => {}
            LoginStep::ChooseWorld(worlds) => {
                let world = choose(&worlds).ok_or(CardlinkError::NoWorld)?;
                conn.send_line(flow.enter_world(&world)?.to_line())?;
            }
            LoginStep::Done(context) => return Ok(context),
        }
    }
}
