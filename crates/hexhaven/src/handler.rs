//! Per-connection handler: handshake and message routing.
//!
//! Each accepted socket gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `hello` → validate version → send `welcome`
//!   2. Loop: socket frames in, room broadcasts out
//!   3. `create_room` / `join_room` seat the socket in a room; every later
//!      in-room request is forwarded to that room's actor
//!
//! The handler never touches game state. It owns the socket and an
//! outbound queue; the room only ever holds a weak link to that queue.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hexhaven_protocol::{
    ClientMessage, Codec, Envelope, ErrorKind, PROTOCOL_VERSION, PlayerId, ProtocolError,
    RoomCode, ServerMessage,
};
use hexhaven_room::{JoinAccepted, Outbound, PlayerLink, RoomError, RoomHandle};
use hexhaven_transport::{Connection, SocketId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::HexhavenError;
use crate::server::ServerState;

/// The room this socket is seated in.
struct Seat {
    room: RoomHandle,
    player_id: PlayerId,
}

/// Drop guard that tells the room the socket is gone when the handler
/// exits, including on error or panic. `Drop` is synchronous, so the
/// detach is a fire-and-forget task.
struct DetachGuard {
    socket_id: SocketId,
    seat: Option<Seat>,
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        let Some(Seat { room, player_id }) = self.seat.take() else {
            return;
        };
        let socket_id = self.socket_id;
        tokio::spawn(async move {
            let _ = room.detach(player_id, socket_id).await;
        });
    }
}

/// Per-socket writer: sequence numbers and encoding.
struct Outgoing<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    codec: &'a C,
    seq: u64,
}

impl<C: Codec> Outgoing<'_, C> {
    async fn send(&mut self, message: &ServerMessage) -> Result<(), HexhavenError> {
        let envelope = Envelope::new(self.seq, now_ms(), message);
        self.seq += 1;
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn error(&mut self, code: ErrorKind, message: impl Into<String>) -> Result<(), HexhavenError> {
        self.send(&ServerMessage::Error {
            code,
            message: message.into(),
        })
        .await
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), HexhavenError> {
    let socket_id = conn.id();
    tracing::debug!(%socket_id, peer = %conn.peer_addr(), "handling new connection");

    let mut out = Outgoing {
        conn: &conn,
        codec: &state.codec,
        seq: 1,
    };

    perform_handshake(&conn, &state, &mut out).await?;

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
    let mut guard = DetachGuard {
        socket_id,
        seat: None,
    };

    let idle_timeout = state.config.idle_timeout();
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            received = conn.recv() => {
                let data = match received {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%socket_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%socket_id, error = %e, "recv error");
                        break;
                    }
                };
                last_seen = Instant::now();

                let envelope: Envelope<ClientMessage> = match state.codec.decode(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::warn!(%socket_id, error = %e, "failed to decode envelope");
                        out.error(ErrorKind::Validation, format!("invalid message: {e}")).await?;
                        continue;
                    }
                };

                let mut ctx = Context {
                    state: &state,
                    socket_id,
                    outbound_tx: &outbound_tx,
                    seat: &mut guard.seat,
                    out: &mut out,
                };
                ctx.dispatch(envelope.payload).await?;
            }
            Some(message) = outbound_rx.recv() => {
                if let ServerMessage::SessionReplaced { room_code } = message.as_ref() {
                    tracing::info!(%socket_id, %room_code, "seat taken over by another socket");
                    guard.seat = None;
                }
                out.send(&message).await?;
            }
            () = tokio::time::sleep_until(last_seen + idle_timeout) => {
                tracing::info!(%socket_id, "connection timed out");
                break;
            }
        }
    }

    // guard drops here → room detach fires.
    let _ = conn.close().await;
    Ok(())
}

/// Receives `hello` and answers `welcome`.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    out: &mut Outgoing<'_, C>,
) -> Result<(), HexhavenError> {
    let data = match tokio::time::timeout(state.config.handshake_timeout(), conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before hello".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let version = match state.codec.decode::<Envelope<ClientMessage>>(&data) {
        Ok(Envelope {
            payload: ClientMessage::Hello { version },
            ..
        }) => version,
        _ => {
            out.error(ErrorKind::Validation, "expected hello").await?;
            return Err(ProtocolError::InvalidMessage("first message must be hello".into()).into());
        }
    };

    if version != PROTOCOL_VERSION {
        out.error(
            ErrorKind::Validation,
            format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    out.send(&ServerMessage::Welcome {
        server_time: now_ms(),
        protocol_version: PROTOCOL_VERSION,
    })
    .await
}

/// Everything one dispatch needs from the connection loop.
struct Context<'a, 'o, C: Codec> {
    state: &'a ServerState<C>,
    socket_id: SocketId,
    outbound_tx: &'a mpsc::UnboundedSender<Outbound>,
    seat: &'a mut Option<Seat>,
    out: &'a mut Outgoing<'o, C>,
}

impl<C: Codec> Context<'_, '_, C> {
    async fn dispatch(&mut self, message: ClientMessage) -> Result<(), HexhavenError> {
        let request = message.name();
        tracing::debug!(socket_id = %self.socket_id, request, "client message");

        match message {
            ClientMessage::Heartbeat { client_time } => {
                self.out
                    .send(&ServerMessage::HeartbeatAck {
                        client_time,
                        server_time: now_ms(),
                    })
                    .await
            }
            ClientMessage::Hello { .. } => {
                self.reject(request, ErrorKind::Conflict, "already greeted").await
            }
            ClientMessage::CreateRoom {
                scenario_id,
                nickname,
                player_id,
            } => {
                if self.seat.is_some() {
                    return self.reject(request, ErrorKind::Conflict, "already in a room").await;
                }
                let result = match self.state.registry.create_room(&scenario_id) {
                    Ok(room) => self.join(room, player_id, nickname).await,
                    Err(e) => Err(e),
                };
                self.finish_join(result).await
            }
            ClientMessage::JoinRoom {
                room_code,
                nickname,
                player_id,
            } => {
                let code = match RoomCode::parse(&room_code) {
                    Ok(code) => code,
                    Err(e) => {
                        let err = RoomError::InvalidInput(e.to_string());
                        return self.finish_join(Err(err)).await;
                    }
                };
                let result = match self.seat.as_ref() {
                    // Asking again for the room this socket already sits in
                    // re-attaches it, which resends the snapshot.
                    Some(seat) if seat.room.room_code() == &code => {
                        let room = seat.room.clone();
                        let player_id = seat.player_id.clone();
                        self.join(room, Some(player_id), nickname).await
                    }
                    Some(_) => {
                        return self.reject(request, ErrorKind::Conflict, "already in another room").await;
                    }
                    None => match self.state.registry.get(&code) {
                        Ok(room) => self.join(room, player_id, nickname).await,
                        Err(e) => Err(e),
                    },
                };
                self.finish_join(result).await
            }
            ClientMessage::LeaveRoom => {
                let Some(seat) = self.seat.take() else {
                    return self.reject(request, ErrorKind::Validation, "not in a room").await;
                };
                if let Err(e) = seat.room.leave(seat.player_id.clone(), self.socket_id).await {
                    tracing::debug!(player_id = %seat.player_id, error = %e, "leave room failed");
                    return self.reject(request, e.kind(), e.to_string()).await;
                }
                Ok(())
            }
            other => {
                let Some(seat) = self.seat.as_ref() else {
                    return self.reject(request, ErrorKind::Validation, "join a room first").await;
                };
                let room = seat.room.clone();
                let player_id = seat.player_id.clone();
                match room.request(player_id, other).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        if matches!(e, RoomError::Unavailable(_)) {
                            *self.seat = None;
                        }
                        self.reject(request, e.kind(), e.to_string()).await
                    }
                }
            }
        }
    }

    async fn join(
        &mut self,
        room: RoomHandle,
        player_id: Option<PlayerId>,
        nickname: String,
    ) -> Result<JoinAccepted, RoomError> {
        let link = PlayerLink::new(self.socket_id, self.outbound_tx);
        let accepted = room.join(player_id, nickname, link).await?;
        *self.seat = Some(Seat {
            room,
            player_id: accepted.player_id.clone(),
        });
        Ok(accepted)
    }

    /// The room queues the positive `join_ack` itself so it lands ahead of
    /// any snapshot. Only a refusal is answered here.
    async fn finish_join(&mut self, result: Result<JoinAccepted, RoomError>) -> Result<(), HexhavenError> {
        match result {
            Ok(accepted) => {
                tracing::info!(
                    socket_id = %self.socket_id,
                    room_code = %accepted.room_code,
                    player_id = %accepted.player_id,
                    reconnected = accepted.reconnected,
                    "socket seated"
                );
                Ok(())
            }
            Err(e) => {
                tracing::debug!(socket_id = %self.socket_id, error = %e, "join refused");
                self.out
                    .send(&ServerMessage::JoinAck {
                        accepted: false,
                        reason: Some(e.to_string()),
                        room_code: None,
                        player_id: None,
                        reconnected: false,
                    })
                    .await
            }
        }
    }

    async fn reject(
        &mut self,
        request: &str,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Result<(), HexhavenError> {
        let message = message.into();
        tracing::warn!(socket_id = %self.socket_id, request, ?kind, %message, "request rejected");
        self.out
            .send(&ServerMessage::rejected(request, kind, message))
            .await
    }
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
