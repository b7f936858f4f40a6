//! Identity types, status enums, and the envelope every message travels in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable identifier for a player.
///
/// Issued by the server on first join and kept by the browser (local
/// storage), so it survives page reloads and reconnects. Serialized as a
/// plain string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short human-shareable room code, e.g. `"K7QF2M"`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Allowed code length range.
    pub const MIN_LEN: usize = 4;
    pub const MAX_LEN: usize = 8;

    /// Normalizes user input (trim, uppercase) and rejects anything that
    /// is not 4–8 ASCII alphanumerics.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        let len_ok = (Self::MIN_LEN..=Self::MAX_LEN).contains(&code.len());
        if !len_ok || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ProtocolError::InvalidMessage(format!(
                "invalid room code '{raw}'"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one snapshot delivery attempt chain. Unique per room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeliveryId(pub u64);

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D-{}", self.0)
    }
}

/// An entity that can hold a slot in the turn order.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnEntity {
    /// The character controlled by this player.
    Character { player_id: PlayerId },
    /// A monster group from the scenario.
    Monster { group_id: String },
}

impl fmt::Display for TurnEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character { player_id } => write!(f, "character:{player_id}"),
            Self::Monster { group_id } => write!(f, "monster:{group_id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Lifecycle of a room. Only ever moves forward:
///
/// ```text
/// WAITING ──→ ACTIVE ──→ COMPLETED
///    │           │
///    └──────→ ABANDONED ←┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Waiting,
    Active,
    Completed,
    Abandoned,
}

impl RoomStatus {
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Active)
                | (Self::Waiting, Self::Abandoned)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::Abandoned)
        )
    }

    /// Completed and abandoned rooms accept nothing further.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "WAITING",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Abandoned => "ABANDONED",
        };
        f.write_str(s)
    }
}

/// Connection state of a player session as other players see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Gone,
}

/// Error category attached to every rejection.
///
/// Tells the client what to do next: fix the input and retry
/// (`validation`), resync state (`conflict`), wait for automatic retry
/// (`transport`), or give up on the room (`invariant`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    Transport,
    Invariant,
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who in a room receives a server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    Player(PlayerId),
    AllExcept(PlayerId),
}

impl Recipient {
    pub fn includes(&self, player_id: &PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(target) => target == player_id,
            Self::AllExcept(excluded) => excluded != player_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Top-level wire frame.
///
/// ```text
/// { "seq": 42, "timestamp": 15000, "payload": { "type": "end_turn" } }
/// ```
///
/// Clients may omit `seq` and `timestamp`; they default to 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    /// Per-direction sequence number.
    #[serde(default)]
    pub seq: u64,
    /// Milliseconds since the sender started.
    #[serde(default)]
    pub timestamp: u64,
    pub payload: M,
}

impl<M> Envelope<M> {
    pub fn new(seq: u64, timestamp: u64, payload: M) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::new("a1b2")).unwrap();
        assert_eq!(json, "\"a1b2\"");
    }

    #[test]
    fn test_room_code_parse_normalizes() {
        let code = RoomCode::parse("  k7qf2m ").unwrap();
        assert_eq!(code.as_str(), "K7QF2M");
    }

    #[test]
    fn test_room_code_parse_rejects_bad_input() {
        assert!(RoomCode::parse("abc").is_err());
        assert!(RoomCode::parse("ABCDEFGHI").is_err());
        assert!(RoomCode::parse("AB-CD").is_err());
    }

    #[test]
    fn test_room_status_only_moves_forward() {
        use RoomStatus::*;
        assert!(Waiting.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Abandoned));
        assert!(Waiting.can_transition_to(Abandoned));

        assert!(!Active.can_transition_to(Waiting));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Abandoned.can_transition_to(Waiting));
        assert!(!Waiting.can_transition_to(Completed));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_room_status_wire_form() {
        let json = serde_json::to_string(&RoomStatus::Active).unwrap();
        assert_eq!(json, "\"ACTIVE\"");
    }

    #[test]
    fn test_turn_entity_json_shape() {
        let entity = TurnEntity::Monster {
            group_id: "bandit-guard".into(),
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["kind"], "monster");
        assert_eq!(json["group_id"], "bandit-guard");
    }

    #[test]
    fn test_recipient_includes() {
        let p1 = PlayerId::new("p1");
        let p2 = PlayerId::new("p2");
        assert!(Recipient::All.includes(&p1));
        assert!(Recipient::Player(p1.clone()).includes(&p1));
        assert!(!Recipient::Player(p1.clone()).includes(&p2));
        assert!(!Recipient::AllExcept(p1.clone()).includes(&p1));
        assert!(Recipient::AllExcept(p1).includes(&p2));
    }

    #[test]
    fn test_envelope_seq_and_timestamp_default() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"payload":{"type":"end_turn"}}"#).unwrap();
        assert_eq!(env.seq, 0);
        assert_eq!(env.timestamp, 0);
    }
}
