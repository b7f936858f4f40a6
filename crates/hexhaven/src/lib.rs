//! # Hexhaven
//!
//! Multiplayer session and turn-execution server for a cooperative
//! tactical board game.
//!
//! Browsers connect over WebSocket, create or join a room by short code,
//! and play scenario rounds: select two cards, act in initiative order,
//! infuse and consume elements. The server owns all game state. A player
//! who drops (page reload, navigation, flaky network) keeps their seat for
//! a grace period and gets a full snapshot, retried until acknowledged,
//! when they come back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hexhaven::prelude::*;
//!
//! # async fn run() -> Result<(), HexhavenError> {
//! let server = HexhavenServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .catalog(InMemoryCatalog::demo())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{BIND_ENV, ServerConfig};
pub use error::HexhavenError;
pub use server::{HexhavenServer, HexhavenServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{HexhavenError, HexhavenServer, ServerConfig};
    pub use hexhaven_protocol::{ClientMessage, Envelope, PlayerId, RoomCode, ServerMessage};
    pub use hexhaven_room::{
        Catalog, HistoryRecorder, InMemoryCatalog, MatchSummary, RoomConfig, TracingRecorder,
    };
}
