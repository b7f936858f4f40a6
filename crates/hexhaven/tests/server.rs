//! Integration tests for the Hexhaven server: handshake, routing, and a
//! full reconnect over real WebSockets.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hexhaven::prelude::*;
use hexhaven_protocol::{ConnectionStatus, ErrorKind, PROTOCOL_VERSION, SnapshotReason};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = HexhavenServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, payload: ClientMessage) {
    let text = serde_json::to_string(&Envelope::new(0, 0, payload)).expect("encode");
    ws.send(Message::text(text)).await.expect("send");
}

async fn recv(ws: &mut ClientWs) -> ServerMessage {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for server")
        .expect("stream ended")
        .expect("recv");
    let envelope: Envelope<ServerMessage> =
        serde_json::from_slice(&msg.into_data()).expect("decode");
    envelope.payload
}

/// Reads until a message matches, skipping the rest.
async fn recv_until(ws: &mut ClientWs, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
    loop {
        let message = recv(ws).await;
        if pred(&message) {
            return message;
        }
    }
}

/// Connects and completes the `hello` / `welcome` exchange.
async fn greeted(addr: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    send(&mut ws, ClientMessage::Hello { version: PROTOCOL_VERSION }).await;
    let welcome = recv(&mut ws).await;
    assert!(matches!(welcome, ServerMessage::Welcome { .. }), "got {welcome:?}");
    ws
}

fn join_ack(message: ServerMessage) -> (RoomCode, PlayerId, bool) {
    match message {
        ServerMessage::JoinAck {
            accepted: true,
            room_code: Some(code),
            player_id: Some(player_id),
            reconnected,
            ..
        } => (code, player_id, reconnected),
        other => panic!("expected accepted join_ack, got {other:?}"),
    }
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_welcome() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, ClientMessage::Hello { version: PROTOCOL_VERSION }).await;

    match recv(&mut ws).await {
        ServerMessage::Welcome {
            protocol_version,
            server_time,
        } => {
            assert_eq!(protocol_version, PROTOCOL_VERSION);
            assert!(server_time > 0);
        }
        other => panic!("expected welcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_version_mismatch() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, ClientMessage::Hello { version: 999 }).await;

    match recv(&mut ws).await {
        ServerMessage::Error { code, message } => {
            assert_eq!(code, ErrorKind::Validation);
            assert!(message.contains("version mismatch"));
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_non_hello_first_message() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, ClientMessage::Heartbeat { client_time: 0 }).await;

    assert!(matches!(
        recv(&mut ws).await,
        ServerMessage::Error { code: ErrorKind::Validation, .. }
    ));
}

// =========================================================================
// Routing
// =========================================================================

#[tokio::test]
async fn test_heartbeat_response() {
    let addr = start_server().await;
    let mut ws = greeted(&addr).await;
    send(&mut ws, ClientMessage::Heartbeat { client_time: 12345 }).await;

    match recv(&mut ws).await {
        ServerMessage::HeartbeatAck { client_time, .. } => assert_eq!(client_time, 12345),
        other => panic!("expected heartbeat_ack, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_envelope_reported_and_skipped() {
    let addr = start_server().await;
    let mut ws = greeted(&addr).await;

    ws.send(Message::text("not json")).await.expect("send");
    assert!(matches!(
        recv(&mut ws).await,
        ServerMessage::Error { code: ErrorKind::Validation, .. }
    ));

    // The connection is still usable.
    send(&mut ws, ClientMessage::Heartbeat { client_time: 999 }).await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::HeartbeatAck { .. }));
}

#[tokio::test]
async fn test_request_before_join_rejected() {
    let addr = start_server().await;
    let mut ws = greeted(&addr).await;
    send(&mut ws, ClientMessage::EndTurn).await;

    match recv(&mut ws).await {
        ServerMessage::Rejected { request, kind, .. } => {
            assert_eq!(request, "end_turn");
            assert_eq!(kind, ErrorKind::Validation);
        }
        other => panic!("expected rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_unknown_room() {
    let addr = start_server().await;
    let mut ws = greeted(&addr).await;
    send(
        &mut ws,
        ClientMessage::JoinRoom {
            room_code: "ZZZZZZ".into(),
            nickname: "Ana".into(),
            player_id: None,
        },
    )
    .await;

    match recv(&mut ws).await {
        ServerMessage::JoinAck {
            accepted: false,
            reason: Some(reason),
            ..
        } => assert!(reason.contains("not found")),
        other => panic!("expected refused join_ack, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_room_unknown_scenario() {
    let addr = start_server().await;
    let mut ws = greeted(&addr).await;
    send(
        &mut ws,
        ClientMessage::CreateRoom {
            scenario_id: "nowhere".into(),
            nickname: "Ana".into(),
            player_id: None,
        },
    )
    .await;

    assert!(matches!(
        recv(&mut ws).await,
        ServerMessage::JoinAck { accepted: false, .. }
    ));
}

// =========================================================================
// End to end
// =========================================================================

#[tokio::test]
async fn test_game_start_and_reconnect() {
    let addr = start_server().await;

    let mut ws1 = greeted(&addr).await;
    send(
        &mut ws1,
        ClientMessage::CreateRoom {
            scenario_id: "black-barrow".into(),
            nickname: "Ana".into(),
            player_id: None,
        },
    )
    .await;
    let (code, p1, _) = join_ack(recv(&mut ws1).await);

    let mut ws2 = greeted(&addr).await;
    send(
        &mut ws2,
        ClientMessage::JoinRoom {
            room_code: code.as_str().to_lowercase(),
            nickname: "Bo".into(),
            player_id: None,
        },
    )
    .await;
    let (joined, p2, reconnected) = join_ack(recv(&mut ws2).await);
    assert_eq!(joined, code);
    assert!(!reconnected);

    send(&mut ws1, ClientMessage::ChooseCharacter { character_id: "brute".into() }).await;
    send(&mut ws2, ClientMessage::ChooseCharacter { character_id: "tinkerer".into() }).await;
    recv_until(&mut ws1, |m| {
        matches!(m, ServerMessage::LobbyUpdate { players, .. }
            if players.iter().all(|p| p.character_id.is_some()))
    })
    .await;

    send(&mut ws1, ClientMessage::StartGame).await;
    for (ws, player) in [(&mut ws1, &p1), (&mut ws2, &p2)] {
        let started = recv_until(ws, |m| matches!(m, ServerMessage::GameStarted { .. })).await;
        let ServerMessage::GameStarted { delivery_id, reason, snapshot } = started else {
            unreachable!();
        };
        assert_eq!(reason, SnapshotReason::GameStarted);
        assert_eq!(snapshot.room_code, code);
        assert!(snapshot.characters.iter().any(|c| &c.owner == player));
        send(ws, ClientMessage::SnapshotAck { delivery_id, ok: true }).await;
    }

    // P2's tab reloads: the old socket drops, a new one rejoins by id.
    drop(ws2);
    let left = recv_until(&mut ws1, |m| matches!(m, ServerMessage::PlayerDisconnected { .. })).await;
    assert!(matches!(
        left,
        ServerMessage::PlayerDisconnected { ref player_id, status: ConnectionStatus::Disconnected, .. }
            if *player_id == p2
    ));

    let mut ws3 = greeted(&addr).await;
    send(
        &mut ws3,
        ClientMessage::JoinRoom {
            room_code: code.to_string(),
            nickname: "Bo".into(),
            player_id: Some(p2.clone()),
        },
    )
    .await;
    let (_, again, reconnected) = join_ack(recv(&mut ws3).await);
    assert_eq!(again, p2);
    assert!(reconnected);

    match recv_until(&mut ws3, |m| matches!(m, ServerMessage::GameStarted { .. })).await {
        ServerMessage::GameStarted { reason, snapshot, .. } => {
            assert_eq!(reason, SnapshotReason::Reconnected);
            assert_eq!(snapshot.players.len(), 2);
        }
        other => panic!("expected snapshot, got {other:?}"),
    }
    assert!(matches!(
        recv_until(&mut ws1, |m| matches!(m, ServerMessage::PlayerReconnected { .. })).await,
        ServerMessage::PlayerReconnected { status: ConnectionStatus::Connected, .. }
    ));
}

async fn create_room(ws: &mut ClientWs) -> (RoomCode, PlayerId) {
    send(
        ws,
        ClientMessage::CreateRoom {
            scenario_id: "black-barrow".into(),
            nickname: "Ana".into(),
            player_id: None,
        },
    )
    .await;
    let (code, player_id, _) = join_ack(recv(ws).await);
    (code, player_id)
}

#[tokio::test]
async fn test_rejoin_on_live_socket_resends_snapshot() {
    let addr = start_server().await;
    let mut ws = greeted(&addr).await;
    let (code, p1) = create_room(&mut ws).await;

    send(&mut ws, ClientMessage::ChooseCharacter { character_id: "brute".into() }).await;
    send(&mut ws, ClientMessage::StartGame).await;
    let ServerMessage::GameStarted { delivery_id, .. } =
        recv_until(&mut ws, |m| matches!(m, ServerMessage::GameStarted { .. })).await
    else {
        unreachable!();
    };
    send(&mut ws, ClientMessage::SnapshotAck { delivery_id, ok: true }).await;

    // The page changed but the socket stayed open.
    send(
        &mut ws,
        ClientMessage::JoinRoom {
            room_code: code.to_string(),
            nickname: "Ana".into(),
            player_id: Some(p1.clone()),
        },
    )
    .await;
    let (again, player_id, reconnected) =
        join_ack(recv_until(&mut ws, |m| matches!(m, ServerMessage::JoinAck { .. })).await);
    assert_eq!(again, code);
    assert_eq!(player_id, p1);
    assert!(!reconnected);

    match recv_until(&mut ws, |m| {
        matches!(m, ServerMessage::GameStarted { .. } | ServerMessage::Rejected { .. })
    })
    .await
    {
        ServerMessage::GameStarted { reason, snapshot, .. } => {
            assert_eq!(reason, SnapshotReason::Attached);
            assert_eq!(snapshot.room_code, code);
        }
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_other_room_while_seated_rejected() {
    let addr = start_server().await;
    let mut other = greeted(&addr).await;
    let (elsewhere, _) = create_room(&mut other).await;

    let mut ws = greeted(&addr).await;
    create_room(&mut ws).await;
    send(
        &mut ws,
        ClientMessage::JoinRoom {
            room_code: elsewhere.to_string(),
            nickname: "Ana".into(),
            player_id: None,
        },
    )
    .await;
    let rejected = recv_until(&mut ws, |m| matches!(m, ServerMessage::Rejected { .. })).await;
    assert!(matches!(
        rejected,
        ServerMessage::Rejected { kind: ErrorKind::Conflict, .. }
    ));
}

#[tokio::test]
async fn test_replaced_socket_is_unseated() {
    let addr = start_server().await;
    let mut ws1 = greeted(&addr).await;
    let (code, p1) = create_room(&mut ws1).await;

    let mut ws2 = greeted(&addr).await;
    send(
        &mut ws2,
        ClientMessage::JoinRoom {
            room_code: code.to_string(),
            nickname: "Ana".into(),
            player_id: Some(p1.clone()),
        },
    )
    .await;
    join_ack(recv(&mut ws2).await);

    assert!(matches!(
        recv_until(&mut ws1, |m| matches!(m, ServerMessage::SessionReplaced { .. })).await,
        ServerMessage::SessionReplaced { room_code } if room_code == code
    ));

    // The old tab no longer speaks for the player.
    send(&mut ws1, ClientMessage::LeaveRoom).await;
    match recv_until(&mut ws1, |m| matches!(m, ServerMessage::Rejected { .. })).await {
        ServerMessage::Rejected { request, kind, .. } => {
            assert_eq!(request, "leave_room");
            assert_eq!(kind, ErrorKind::Validation);
        }
        other => panic!("expected rejected, got {other:?}"),
    }

    send(&mut ws2, ClientMessage::Heartbeat { client_time: 1 }).await;
    recv_until(&mut ws2, |m| matches!(m, ServerMessage::HeartbeatAck { .. })).await;
}
