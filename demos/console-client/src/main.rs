//! A console client that plays on its own.
//!
//! ```text
//! console-client [config.json]
//! ```
//!
//! Logs every view event, opens a room once it reaches the lobby, starts
//! the match when the challenger is ready, and flips the first flippable
//! card whenever it's our turn. Set `RUST_LOG=debug` to see the wire.

use std::time::Duration;

use cardlink::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Ticks to wait after a request before sending the next one.
const COOLDOWN_TICKS: u32 = 30;

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ConsoleView {
    start_enabled: bool,
}

impl View for ConsoleView {
    fn on_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Heartbeat | ViewEvent::Position(_) => {}
            ViewEvent::StartEnabled(enabled) => {
                self.start_enabled = enabled;
                info!(enabled, "start button");
            }
            ViewEvent::GameEnded { winner } => info!(?winner, "game over"),
            ViewEvent::ServerError { code } => warn!(%code, "server error"),
            other => info!(event = ?other, "view"),
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };

    let mut builder = Client::<ConsoleView>::builder().config(config.clone());
    if config.gateway_addr.is_some() {
        let context = login(&config, |worlds| {
            for w in worlds {
                info!(id = %w.id, name = %w.name, "world");
            }
            worlds.first().map(|w| w.id.clone())
        })
        .await?;
        builder = builder.context(context);
    }

    let mut client = builder.connect(ConsoleView::default()).await?;
    let mut room_requested = false;
    let mut cooldown = 0u32;

    while client.status() != SessionStatus::Left {
        client.step().await;
        cooldown = cooldown.saturating_sub(1);

        let status = client.status();
        let session = client.session_mut();
        let result = match status {
            SessionStatus::Lobby if !room_requested => {
                room_requested = true;
                session.create_room("console", config.default_rows, config.default_cols)
            }
            SessionStatus::InRoom(Phase::Ready) if session.view().start_enabled && cooldown == 0 => {
                cooldown = COOLDOWN_TICKS;
                session.start_game()
            }
            SessionStatus::InRoom(Phase::Playing) if session.is_my_turn() && cooldown == 0 => {
                let board = session.board();
                match (0..board.len()).find(|&i| board.check_flippable(i).is_ok()) {
                    Some(index) => {
                        cooldown = COOLDOWN_TICKS;
                        session.flip(index)
                    }
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(error = %e, "action refused");
        }
    }

    client.close();
    // Give the send task a moment to flush before the runtime goes away.
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!("disconnected");
    Ok(())
}
