//! Wire protocol for Hexhaven.
//!
//! This crate defines the language browsers and the server speak:
//!
//! - **Types** ([`Envelope`], [`PlayerId`], [`RoomCode`], [`RoomStatus`],
//!   [`ErrorKind`]) shared by every layer.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) as closed,
//!   `type`-tagged enums.
//! - **Snapshots** ([`GameSnapshot`] and its view types), the full state a
//!   client renders from.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) for bytes ↔ values.
//!
//! The protocol layer knows nothing about sockets or rooms.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope<ClientMessage>) → Room actor
//! ```

mod codec;
mod error;
mod message;
mod snapshot;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use message::{ClientMessage, PROTOCOL_VERSION, ServerMessage, SnapshotReason};
pub use snapshot::{
    AbilityCard, CharacterView, GameSnapshot, MonsterView, PlayerSummary, RoundPhase,
};
pub use types::{
    ConnectionStatus, DeliveryId, Envelope, ErrorKind, PlayerId, Recipient, RoomCode,
    RoomStatus, TurnEntity,
};
