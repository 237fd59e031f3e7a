//! End-to-end tests for the client facade.
//!
//! A loopback TCP listener and UDP socket play the world server; a second
//! listener plays the gateway.

use std::net::SocketAddr;
use std::time::Duration;

use cardlink::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, UdpSocket};

const TIMEOUT: Duration = Duration::from_secs(2);
const DT: Duration = Duration::from_millis(16);

// =========================================================================
// Fake world server
// =========================================================================

struct FakeWorld {
    control: BufReader<OwnedReadHalf>,
    control_tx: OwnedWriteHalf,
    udp: UdpSocket,
    client_udp: SocketAddr,
}

impl FakeWorld {
    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        tokio::time::timeout(TIMEOUT, self.control.read_line(&mut line))
            .await
            .expect("line should arrive")
            .unwrap();
        line.trim_end().to_string()
    }

    async fn write_line(&mut self, line: &str) {
        self.control_tx
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    async fn recv_datagram(&self) -> String {
        let mut buf = [0u8; 512];
        let (n, _) = tokio::time::timeout(TIMEOUT, self.udp.recv_from(&mut buf))
            .await
            .expect("datagram should arrive")
            .unwrap();
        String::from_utf8_lossy(&buf[..n]).trim_end().to_string()
    }
}

/// Connects a client as `alice` to a fresh fake world and returns both
/// ends, with the UDP hello already consumed.
async fn connected() -> (Client<Vec<ViewEvent>>, FakeWorld, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let config = ClientConfig {
        control_addr: listener.local_addr().unwrap().to_string(),
        world_udp_addr: udp.local_addr().unwrap().to_string(),
        user_id: "alice".into(),
        token: "t0k".into(),
        ..ClientConfig::default()
    };

    let (client, accepted) = tokio::join!(
        Client::<Vec<ViewEvent>>::builder().config(config).connect(Vec::new()),
        listener.accept()
    );
    let client = client.expect("client should connect");
    let (stream, _) = accepted.unwrap();
    let (read, write) = stream.into_split();

    let mut buf = [0u8; 512];
    let (n, client_udp) = tokio::time::timeout(TIMEOUT, udp.recv_from(&mut buf))
        .await
        .expect("udp hello should arrive")
        .unwrap();
    let udp_hello = String::from_utf8_lossy(&buf[..n]).trim_end().to_string();

    let world = FakeWorld {
        control: BufReader::new(read),
        control_tx: write,
        udp,
        client_udp,
    };
    (client, world, udp_hello)
}

/// Pumps until `done` holds or the timeout runs out.
async fn pump_until<F>(client: &mut Client<Vec<ViewEvent>>, mut done: F)
where
    F: FnMut(&Client<Vec<ViewEvent>>) -> bool,
{
    tokio::time::timeout(TIMEOUT, async {
        while !done(&*client) {
            client.pump(DT);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition should be reached");
}

// =========================================================================
// Connect
// =========================================================================

#[tokio::test]
async fn test_connect_says_hello_on_both_channels() {
    let (client, mut world, udp_hello) = connected().await;

    assert!(udp_hello.starts_with("HELLO "));
    assert!(udp_hello.contains("token=t0k"));
    assert!(udp_hello.contains("actor=alice"));
    assert_eq!(world.read_line().await, "HELLO actor=alice");
    assert_eq!(client.status(), SessionStatus::Disconnected);
}

#[tokio::test]
async fn test_connect_fails_without_control_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = Client::<Vec<ViewEvent>>::builder()
        .control_addr(&addr)
        .world_udp_addr("127.0.0.1:9")
        .connect(Vec::<ViewEvent>::new())
        .await;
    assert!(matches!(result, Err(CardlinkError::Transport(_))));
}

// =========================================================================
// Session through the pump
// =========================================================================

#[tokio::test]
async fn test_pump_drives_session_into_room() {
    let (mut client, mut world, _) = connected().await;
    world.read_line().await;

    world.write_line("HELLO_OK actor=alice").await;
    pump_until(&mut client, |c| c.status() == SessionStatus::Lobby).await;

    client.session_mut().create_room("Foo", 4, 4).unwrap();
    assert_eq!(world.read_line().await, "REQ_CREATE_ROOM title=Foo rows=4 cols=4");

    world
        .write_line("RES_CREATE_ROOM roomId=r1 master=alice title=Foo")
        .await;
    pump_until(&mut client, |c| {
        matches!(c.status(), SessionStatus::InRoom(_))
    })
    .await;

    let room = client.session().room().expect("in a room");
    assert_eq!(room.room_id().as_str(), "r1");
    assert!(
        client
            .session()
            .view()
            .iter()
            .any(|e| matches!(e, ViewEvent::RoomOpened { .. }))
    );
}

#[tokio::test]
async fn test_positions_reach_session() {
    let (mut client, world, _) = connected().await;

    world
        .udp
        .send_to(b"ACTOR_POS id=bob x=1.5 y=2 seq=1", world.client_udp)
        .await
        .unwrap();
    pump_until(&mut client, |c| !c.session().positions().is_empty()).await;

    let pos = client.session().positions().position(&ActorId::from("bob"));
    assert_eq!(pos, Some((1.5, 2.0)));
}

#[tokio::test]
async fn test_send_move_numbers_datagrams() {
    let (client, world, _) = connected().await;

    assert_eq!(client.send_move(1.0, 2.0).unwrap(), 0);
    assert_eq!(client.send_move(3.0, 4.0).unwrap(), 1);
    assert_eq!(world.recv_datagram().await, "MOVE seq=0 x=1.000 y=2.000");
    assert_eq!(world.recv_datagram().await, "MOVE seq=1 x=3.000 y=4.000");
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_server_close_ends_run_loop() {
    let (mut client, world, _) = connected().await;
    drop(world);

    tokio::time::timeout(TIMEOUT, client.run_until_closed())
        .await
        .expect("loop should stop")
        .unwrap();
    assert_eq!(client.status(), SessionStatus::Left);
    assert!(
        client
            .session()
            .view()
            .iter()
            .any(|e| matches!(e, ViewEvent::Disconnected { .. }))
    );
}

#[tokio::test]
async fn test_local_close_is_terminal() {
    let (mut client, _world, _) = connected().await;
    client.close();
    pump_until(&mut client, |c| c.status() == SessionStatus::Left).await;
    assert!(client.send_move(0.0, 0.0).is_err());
}

// =========================================================================
// Gateway login
// =========================================================================

async fn gateway(script: &'static [&'static str]) -> (ClientConfig, tokio::task::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = ClientConfig {
        gateway_addr: Some(listener.local_addr().unwrap().to_string()),
        user_id: "alice".into(),
        connect_timeout_ms: 1000,
        ..ClientConfig::default()
    };

    // Replies to each request line with the next batch of the script.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut received = Vec::new();
        for batch in script {
            let Ok(Some(line)) = lines.next_line().await else {
                break;
            };
            received.push(line);
            write.write_all(batch.as_bytes()).await.unwrap();
        }
        received
    });
    (config, server)
}

#[tokio::test]
async fn test_login_enters_first_world() {
    let (config, server) = gateway(&[
        "LOGIN_OK token=abc worldCount=2\n\
         WORLD id=w1 name=One udp_host=127.0.0.1 udp_port=9001\n\
         WORLD id=w2 name=Two udp_host=127.0.0.1 udp_port=9002\n",
        "ENTER_OK udp_host=127.0.0.1 udp_port=9001 udp_token=u1 actor=alice\n",
    ])
    .await;

    let context = login(&config, |worlds| worlds.first().map(|w| w.id.clone()))
        .await
        .unwrap();
    assert_eq!(context.actor_id.as_str(), "alice");
    assert_eq!(context.token, "u1");
    assert_eq!(context.world_udp_addr, "127.0.0.1:9001");

    let received = server.await.unwrap();
    assert_eq!(received[0], "LOGIN id=alice");
    assert_eq!(received[1], "ENTER_WORLD actor=alice world=w1");
}

#[tokio::test]
async fn test_login_duplicate_id() {
    let (config, _server) = gateway(&["ERR_ID_EXSIT\n"]).await;
    let err = login(&config, |_| None).await.unwrap_err();
    assert!(matches!(err, CardlinkError::Session(SessionError::DuplicateId)));
}

#[tokio::test]
async fn test_login_with_no_choice_aborts() {
    let (config, _server) = gateway(&["LOGIN_OK token=abc worldCount=0\n"]).await;
    let err = login(&config, |_| None).await.unwrap_err();
    assert!(matches!(err, CardlinkError::NoWorld));
}

#[tokio::test]
async fn test_login_needs_gateway_addr() {
    let err = login(&ClientConfig::default(), |_| None).await.unwrap_err();
    assert!(matches!(err, CardlinkError::Config(_)));
}
