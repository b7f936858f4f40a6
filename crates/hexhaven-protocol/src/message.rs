//! Client and server message enums.
//!
//! Both directions are closed, internally tagged enums:
//!
//! ```json
//! { "type": "execute_action", "card_id": "trample", "position": "top" }
//! ```
//!
//! Adding a message means adding a variant, and every `match` over the enum
//! must handle it.

use std::sync::Arc;

use hexhaven_rules::{CardId, CardPosition, ElementalInfusion, TurnSlot};
use serde::{Deserialize, Serialize};

use crate::{
    ConnectionStatus, DeliveryId, ErrorKind, GameSnapshot, PlayerId,
    PlayerSummary, RoomCode, RoomStatus, TurnEntity,
};

/// Protocol version exchanged in the `hello`/`welcome` handshake.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message on every socket.
    Hello { version: u32 },
    Heartbeat { client_time: u64 },

    CreateRoom {
        scenario_id: String,
        nickname: String,
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    /// Joins a room, or re-attaches to it when `player_id` names an
    /// existing member.
    JoinRoom {
        room_code: String,
        nickname: String,
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    LeaveRoom,
    ChooseCharacter { character_id: String },
    StartGame,

    SelectCards {
        card_ids: Vec<CardId>,
        initiative_card_id: CardId,
    },
    ExecuteAction {
        card_id: CardId,
        position: CardPosition,
    },
    EndTurn,
    /// Element keys stay raw strings here; the rules crate parses them.
    InfuseElement { element: String },
    ConsumeElement { element: String },

    SnapshotAck { delivery_id: DeliveryId, ok: bool },
    RequestSnapshot,
    DeclareOutcome { victory: bool },
}

impl ClientMessage {
    /// The wire tag, used when echoing a rejection back to the sender.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Heartbeat { .. } => "heartbeat",
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom => "leave_room",
            Self::ChooseCharacter { .. } => "choose_character",
            Self::StartGame => "start_game",
            Self::SelectCards { .. } => "select_cards",
            Self::ExecuteAction { .. } => "execute_action",
            Self::EndTurn => "end_turn",
            Self::InfuseElement { .. } => "infuse_element",
            Self::ConsumeElement { .. } => "consume_element",
            Self::SnapshotAck { .. } => "snapshot_ack",
            Self::RequestSnapshot => "request_snapshot",
            Self::DeclareOutcome { .. } => "declare_outcome",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Why a snapshot is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotReason {
    GameStarted,
    /// The player came back after being marked disconnected.
    Reconnected,
    /// A fresh socket for a connected member (page navigation).
    Attached,
    Refresh,
}

/// Everything the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        server_time: u64,
        protocol_version: u32,
    },
    HeartbeatAck { client_time: u64, server_time: u64 },

    JoinAck {
        accepted: bool,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        room_code: Option<RoomCode>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        player_id: Option<PlayerId>,
        reconnected: bool,
    },
    LobbyUpdate {
        room_code: RoomCode,
        status: RoomStatus,
        host: Option<PlayerId>,
        players: Vec<PlayerSummary>,
    },

    /// Full snapshot; the client must answer with `snapshot_ack`. The
    /// payload is shared so every redelivery is the same value.
    GameStarted {
        delivery_id: DeliveryId,
        reason: SnapshotReason,
        snapshot: Arc<GameSnapshot>,
    },
    SnapshotFailed {
        delivery_id: DeliveryId,
        attempts: u32,
        message: String,
    },

    CardsSelected { player_id: PlayerId },
    RoundStarted {
        round_number: u32,
        turn_order: Vec<TurnSlot<TurnEntity>>,
        excluded: Vec<TurnEntity>,
    },
    TurnStarted { entity: TurnEntity, initiative: u32 },
    ActionExecuted {
        player_id: PlayerId,
        character_id: String,
        card_id: CardId,
        position: CardPosition,
        executed_count: usize,
    },
    ElementsChanged { elements: ElementalInfusion },
    TurnEnded { entity: TurnEntity },
    RoundEnded {
        round_number: u32,
        elements: ElementalInfusion,
    },

    PlayerDisconnected {
        player_id: PlayerId,
        nickname: String,
        status: ConnectionStatus,
    },
    PlayerReconnected {
        player_id: PlayerId,
        nickname: String,
        status: ConnectionStatus,
    },
    PlayerGone {
        player_id: PlayerId,
        nickname: String,
        status: ConnectionStatus,
    },

    GameCompleted { victory: bool, round_number: u32 },
    RoomFaulted { reason: String },
    /// Sent to a socket whose seat was taken over by a newer socket of the
    /// same player. The old socket is no longer seated.
    SessionReplaced { room_code: RoomCode },

    /// A request was refused. Sent only to the requesting client.
    Rejected {
        request: String,
        kind: ErrorKind,
        message: String,
    },
    /// Connection-level failure outside any room (bad frame, handshake).
    Error { code: ErrorKind, message: String },
}

impl ServerMessage {
    pub fn rejected(request: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Rejected {
            request: request.to_string(),
            kind,
            message: message.into(),
        }
    }
}
