//! Session types: the record of one player's seat in a room.
//!
//! A session tracks:
//! - WHO the player is (`PlayerId`, nickname)
//! - WHAT state their connection is in (connected, disconnected, gone)
//! - WHEN they disconnected
//! - WHICH socket currently speaks for them (a weak link, never owned)

use std::time::{Duration, Instant};

use hexhaven_protocol::{ConnectionStatus, PlayerId};
use hexhaven_transport::SocketId;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a disconnected player keeps their seat before being
    /// marked gone.
    ///
    /// Default: 60 seconds.
    pub reconnect_grace_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_ms: 60_000,
        }
    }
}

impl SessionConfig {
    pub fn reconnect_grace(&self) -> Duration {
        Duration::from_millis(self.reconnect_grace_ms)
    }
}

// ---------------------------------------------------------------------------
// SocketLink
// ---------------------------------------------------------------------------

/// A non-owning handle to the socket currently attached for a player.
///
/// The connection handler owns the socket. The room only keeps a link it
/// can try to resolve; once the handler is gone `is_alive` turns false and
/// the session is treated as disconnected.
pub trait SocketLink: Clone + Send + 'static {
    fn socket_id(&self) -> SocketId;

    fn is_alive(&self) -> bool;
}

// ---------------------------------------------------------------------------
// PlayerSession
// ---------------------------------------------------------------------------

/// One player's seat in a room.
///
/// ```text
///   Connected ──(detach)──→ Disconnected ──(grace expiry)──→ Gone
///       ↑                        │
///       └──────(attach)──────────┘
/// ```
///
/// Only the [`ConnectionTracker`](crate::ConnectionTracker) mutates it.
#[derive(Debug, Clone)]
pub struct PlayerSession<L> {
    pub(crate) player_id: PlayerId,
    pub(crate) nickname: String,
    pub(crate) seat: u32,
    pub(crate) status: ConnectionStatus,
    pub(crate) disconnected_at: Option<Instant>,
    pub(crate) link: Option<L>,
}

impl<L: SocketLink> PlayerSession<L> {
    pub(crate) fn new(player_id: PlayerId, nickname: String, seat: u32, link: L) -> Self {
        Self {
            player_id,
            nickname,
            seat,
            status: ConnectionStatus::Connected,
            disconnected_at: None,
            link: Some(link),
        }
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Join order. Stable for the life of the room, even if earlier
    /// players leave.
    pub fn seat(&self) -> u32 {
        self.seat
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// When the player was last marked disconnected.
    pub fn disconnected_at(&self) -> Option<Instant> {
        self.disconnected_at
    }

    /// The attached socket, if it can still be reached.
    pub fn link(&self) -> Option<&L> {
        self.link.as_ref().filter(|link| link.is_alive())
    }

    pub fn socket_id(&self) -> Option<SocketId> {
        self.link.as_ref().map(SocketLink::socket_id)
    }
}

/// Generates a fresh player id: 16 random bytes as 32 hex characters.
///
/// Browsers store it and present it again on reconnect, so it doubles as
/// the reconnection credential.
pub fn generate_player_id() -> PlayerId {
    let bytes: [u8; 16] = rand::rng().random();
    PlayerId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
