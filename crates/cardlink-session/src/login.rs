//! Gateway login: from a user id to a [`SessionContext`].
//!
//! ```text
//! Idle ──start──→ AwaitingLogin ──LOGIN_OK──→ ReceivingWorlds ──WORLD × n──→ WorldsListed
//!                      │                                                          │
//!                      └──ERR_ID_EXSIT──→ Rejected               enter_world ─────┘
//!                                                                     ↓
//!                                         Entered ←──ENTER_OK── AwaitingEnter
//! ```
//!
//! The flow is pure: it consumes decoded commands and returns what to send
//! next. The caller owns the connection.

use cardlink_protocol::{ActorId, Command, GatewayReply, Outbound, WorldInfo};
use tracing::{debug, info, warn};

use crate::{SessionContext, SessionError};

/// Where the login handshake is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    AwaitingLogin,
    ReceivingWorlds { expected: usize },
    WorldsListed,
    AwaitingEnter { world: String },
    Entered(SessionContext),
    Rejected,
}

/// What the caller should do after [`LoginFlow::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    /// Nothing yet; keep reading.
    Wait,
    /// The world list is complete; pick one and call
    /// [`LoginFlow::enter_world`].
    ChooseWorld(Vec<WorldInfo>),
    Done(SessionContext),
}

/// The gateway handshake for one user.
#[derive(Debug)]
pub struct LoginFlow {
    user_id: String,
    token: Option<String>,
    worlds: Vec<WorldInfo>,
    state: LoginState,
}

impl LoginFlow {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: None,
            worlds: Vec::new(),
            state: LoginState::Idle,
        }
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    /// Worlds received so far.
    pub fn worlds(&self) -> &[WorldInfo] {
        &self.worlds
    }

    /// The gateway's login token, once `LOGIN_OK` arrived.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Begins (or restarts) the handshake. Returns the `LOGIN` request.
    pub fn start(&mut self) -> Outbound {
        self.token = None;
        self.worlds.clear();
        self.state = LoginState::AwaitingLogin;
        debug!(user = %self.user_id, "login requested");
        Outbound::Login {
            id: self.user_id.clone(),
        }
    }

    /// Feeds one gateway reply into the flow.
    ///
    /// # Errors
    /// [`SessionError::DuplicateId`] if the gateway rejects the id,
    /// [`SessionError::UnexpectedReply`] for a reply out of sequence, and
    /// protocol errors for malformed replies.
    pub fn handle(&mut self, cmd: &Command) -> Result<LoginStep, SessionError> {
        let reply = GatewayReply::parse(cmd)?;
        match (self.state.clone(), reply) {
            (_, GatewayReply::DuplicateId) => {
                warn!(user = %self.user_id, "id already logged in");
                self.state = LoginState::Rejected;
                Err(SessionError::DuplicateId)
            }
            (LoginState::AwaitingLogin, GatewayReply::LoginOk { token, world_count }) => {
                debug!(world_count, "login accepted");
                self.token = Some(token);
                self.worlds.clear();
                if world_count == 0 {
                    self.state = LoginState::WorldsListed;
                    return Ok(LoginStep::ChooseWorld(Vec::new()));
                }
                self.state = LoginState::ReceivingWorlds {
                    expected: world_count,
                };
                Ok(LoginStep::Wait)
            }
            (LoginState::ReceivingWorlds { expected }, GatewayReply::World(info)) => {
                debug!(world = %info.id, name = %info.name, "world listed");
                self.worlds.push(info);
                if self.worlds.len() < expected {
                    return Ok(LoginStep::Wait);
                }
                self.state = LoginState::WorldsListed;
                Ok(LoginStep::ChooseWorld(self.worlds.clone()))
            }
            (LoginState::AwaitingEnter { world }, GatewayReply::EnterOk {
                udp_host,
                udp_port,
                udp_token,
                actor,
            }) => {
                let world_udp_addr = format!("{udp_host}:{udp_port}");
                info!(%actor, %world, udp = %world_udp_addr, "entered world");
                let context = SessionContext {
                    actor_id: actor,
                    token: udp_token,
                    world_udp_addr,
                };
                self.state = LoginState::Entered(context.clone());
                Ok(LoginStep::Done(context))
            }
            (state, _) => {
                warn!(?state, command = cmd.name(), "gateway reply out of sequence");
                Err(SessionError::UnexpectedReply(cmd.name().to_string()))
            }
        }
    }

    /// Picks a world from the list. Returns the `ENTER_WORLD` request.
    ///
    /// # Errors
    /// [`SessionError::UnexpectedReply`] before the list is complete,
    /// [`SessionError::UnknownWorld`] if `world_id` wasn't listed.
    pub fn enter_world(&mut self, world_id: &str) -> Result<Outbound, SessionError> {
        if self.state != LoginState::WorldsListed {
            return Err(SessionError::UnexpectedReply(format!(
                "world list incomplete ({:?})",
                self.state
            )));
        }
        if !self.worlds.iter().any(|w| w.id == world_id) {
            return Err(SessionError::UnknownWorld(world_id.to_string()));
        }
        self.state = LoginState::AwaitingEnter {
            world: world_id.to_string(),
        };
        Ok(Outbound::EnterWorld {
            actor: ActorId::new(self.user_id.clone()),
            world: world_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardlink_protocol::decode;

    fn world_line(id: &str, port: u16) -> Command {
        decode(&format!(
            "WORLD id={id} name=World-{id} udp_host=127.0.0.1 udp_port={port}"
        ))
    }

    #[test]
    fn test_full_handshake() {
        let mut flow = LoginFlow::new("alice");
        assert_eq!(flow.start(), Outbound::Login { id: "alice".into() });

        let step = flow.handle(&decode("LOGIN_OK token=abc worldCount=2")).unwrap();
        assert_eq!(step, LoginStep::Wait);
        assert_eq!(flow.token(), Some("abc"));

        assert_eq!(flow.handle(&world_line("w1", 9001)).unwrap(), LoginStep::Wait);
        let LoginStep::ChooseWorld(worlds) = flow.handle(&world_line("w2", 9002)).unwrap() else {
            panic!("expected world list");
        };
        assert_eq!(worlds.len(), 2);
        assert_eq!(worlds[1].udp_port, 9002);

        let out = flow.enter_world("w2").unwrap();
        assert_eq!(
            out,
            Outbound::EnterWorld {
                actor: ActorId::from("alice"),
                world: "w2".into()
            }
        );

        let step = flow
            .handle(&decode(
                "ENTER_OK udp_host=127.0.0.1 udp_port=9002 udp_token=t0k actor=alice",
            ))
            .unwrap();
        let expected = SessionContext::new(ActorId::from("alice"), "t0k", "127.0.0.1:9002");
        assert_eq!(step, LoginStep::Done(expected.clone()));
        assert_eq!(flow.state(), &LoginState::Entered(expected));
    }

    #[test]
    fn test_duplicate_id_rejects() {
        let mut flow = LoginFlow::new("alice");
        flow.start();
        let err = flow.handle(&decode("ERR_ID_EXSIT")).unwrap_err();
        assert!(matches!(err, SessionError::DuplicateId));
        assert_eq!(flow.state(), &LoginState::Rejected);
    }

    #[test]
    fn test_unknown_world_refused() {
        let mut flow = LoginFlow::new("alice");
        flow.start();
        flow.handle(&decode("LOGIN_OK token=abc worldCount=1")).unwrap();
        flow.handle(&world_line("w1", 9001)).unwrap();
        assert!(matches!(
            flow.enter_world("w9"),
            Err(SessionError::UnknownWorld(_))
        ));
        assert!(flow.enter_world("w1").is_ok());
    }

    #[test]
    fn test_reply_out_of_sequence() {
        let mut flow = LoginFlow::new("alice");
        flow.start();
        let err = flow.handle(&world_line("w1", 9001)).unwrap_err();
        assert!(matches!(err, SessionError::UnexpectedReply(name) if name == "WORLD"));
    }

    #[test]
    fn test_enter_before_list_complete() {
        let mut flow = LoginFlow::new("alice");
        flow.start();
        flow.handle(&decode("LOGIN_OK token=abc worldCount=2")).unwrap();
        flow.handle(&world_line("w1", 9001)).unwrap();
        assert!(flow.enter_world("w1").is_err());
    }
}
