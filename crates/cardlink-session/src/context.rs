//! Who we are in the world, and where to find it.

use cardlink_protocol::{ActorId, Outbound};

/// Identity handed from login to the world session.
///
/// Built by [`LoginFlow`](crate::LoginFlow) from `ENTER_OK`, or directly
/// when the gateway is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub actor_id: ActorId,
    /// Token that identifies us on the positional channel.
    pub token: String,
    /// `host:port` of the world's UDP endpoint.
    pub world_udp_addr: String,
}

impl SessionContext {
    pub fn new(
        actor_id: impl Into<ActorId>,
        token: impl Into<String>,
        world_udp_addr: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            token: token.into(),
            world_udp_addr: world_udp_addr.into(),
        }
    }

    /// `HELLO actor=...` for the control channel.
    pub fn hello_line(&self) -> String {
        Outbound::Hello {
            actor: self.actor_id.clone(),
        }
        .to_line()
    }

    /// `HELLO token=... actor=...` for the positional channel.
    pub fn udp_hello_line(&self) -> String {
        Outbound::UdpHello {
            token: self.token.clone(),
            actor: self.actor_id.clone(),
        }
        .to_line()
    }
}
