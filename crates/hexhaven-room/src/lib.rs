//! Rooms for Hexhaven.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! lobby, its connection tracker, and, once started, the game state.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms and resolves room codes
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`GameState`]: authoritative game state, driven by the actor
//! - [`Catalog`]: read-only character and scenario source
//! - [`HistoryRecorder`]: receives a summary when a match completes
//! - [`PlayerLink`]: weak route from a room to one player's socket

mod broadcast;
mod catalog;
mod config;
mod error;
mod game;
mod history;
mod manager;
mod room;

pub use broadcast::{Outbound, OutboundSender, PlayerLink, fan_out};
pub use catalog::{Catalog, CharacterLoadout, InMemoryCatalog, MonsterGroupSetup, ScenarioSetup};
pub use config::RoomConfig;
pub use error::RoomError;
pub use game::{CharacterState, GameState, MonsterGroup, Outbox};
pub use history::{HistoryRecorder, MatchSummary, TracingRecorder};
pub use manager::RoomRegistry;
pub use room::{JoinAccepted, RoomHandle, RoomInfo};
