//! Client configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "control_addr": "10.0.0.5:7100", "user_id": "alice" }
//! ```

use std::path::Path;
use std::time::Duration;

use cardlink_room::BoardConfig;
use cardlink_session::{SessionContext, SessionSettings};
use cardlink_tick::TickConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::CardlinkError;

/// Everything needed to connect a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Login gateway. `None` skips the gateway and connects straight to
    /// the world as `user_id`.
    pub gateway_addr: Option<String>,
    /// World server control channel (TCP).
    pub control_addr: String,
    /// World server positional channel (UDP). Replaced by the address the
    /// gateway hands out when logging in.
    pub world_udp_addr: String,
    /// Actor name used for `HELLO` (and for `LOGIN` at the gateway).
    pub user_id: String,
    /// Positional-channel token when the gateway is skipped.
    pub token: String,
    pub connect_timeout_ms: u64,
    pub tick_rate_hz: u32,
    pub reset_delay_ms: u64,
    pub fail_delay_ms: u64,
    pub validate_positions: bool,
    pub default_rows: usize,
    pub default_cols: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_addr: None,
            control_addr: "127.0.0.1:7100".to_string(),
            world_udp_addr: "127.0.0.1:9001".to_string(),
            user_id: "player".to_string(),
            token: String::new(),
            connect_timeout_ms: 3000,
            tick_rate_hz: TickConfig::DEFAULT_TICK_RATE_HZ,
            reset_delay_ms: 1000,
            fail_delay_ms: 500,
            validate_positions: true,
            default_rows: 4,
            default_cols: 4,
        }
    }
}

impl ClientConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CardlinkError> {
        serde_json::from_str(json).map_err(|e| CardlinkError::Config(e.to_string()))
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CardlinkError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CardlinkError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Returns a copy with out-of-range values replaced, logging a warning
    /// for each.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.connect_timeout_ms == 0 {
            warn!(default = defaults.connect_timeout_ms, "connect_timeout_ms is 0, using default");
            self.connect_timeout_ms = defaults.connect_timeout_ms;
        }

        let rate = self
            .tick_rate_hz
            .clamp(TickConfig::MIN_TICK_RATE_HZ, TickConfig::MAX_TICK_RATE_HZ);
        if rate != self.tick_rate_hz {
            warn!(requested = self.tick_rate_hz, clamped = rate, "tick_rate_hz out of range");
            self.tick_rate_hz = rate;
        }

        if BoardConfig::check_dimensions(self.default_rows, self.default_cols).is_err() {
            warn!(
                rows = self.default_rows,
                cols = self.default_cols,
                max_slots = BoardConfig::MAX_SLOTS,
                "default board is not playable, using 4x4"
            );
            self.default_rows = defaults.default_rows;
            self.default_cols = defaults.default_cols;
        }

        if self.user_id.trim().is_empty() {
            warn!("user_id is empty, using default");
            self.user_id = defaults.user_id;
        }
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn tick_config(&self) -> TickConfig {
        TickConfig::with_rate(self.tick_rate_hz)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            fail_delay: Duration::from_millis(self.fail_delay_ms),
            reset_delay: Duration::from_millis(self.reset_delay_ms),
            validate_positions: self.validate_positions,
            default_rows: self.default_rows,
            default_cols: self.default_cols,
        }
    }

    /// Identity for connecting without the gateway.
    pub fn direct_context(&self) -> SessionContext {
        SessionContext::new(
            self.user_id.as_str(),
            self.token.clone(),
            self.world_udp_addr.clone(),
        )
    }
}
