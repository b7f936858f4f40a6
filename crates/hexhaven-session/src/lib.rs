//! Player connection tracking for Hexhaven.
//!
//! This crate owns everything about *who is connected* to a room and *how
//! reliably they received state*:
//!
//! 1. **Connection tracking** ([`ConnectionTracker`]): per-player status,
//!    socket attach/detach, reconnection detection, stale-socket filtering.
//! 2. **Grace timers** ([`GraceTimers`]): how long a disconnected player
//!    keeps their seat.
//! 3. **Snapshot delivery** ([`DeliveryTracker`]): send, wait for an
//!    application-level ack, retry with backoff, report the outcome.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room actor (above)  ← owns one tracker of each kind per room
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol / Transport (below)  ← PlayerId, DeliveryId, SocketId
//! ```
//!
//! Nothing here is shared between tasks: every type is owned by a single
//! room actor. Timers and delivery tasks report back over channels.

mod delivery;
mod error;
mod grace;
mod session;
mod tracker;

pub use delivery::{DeliveryOutcome, DeliveryReport, DeliverySink, DeliveryTracker};
pub use error::SessionError;
pub use grace::{GraceExpired, GraceTimers};
pub use session::{PlayerSession, SessionConfig, SocketLink, generate_player_id};
pub use tracker::{AttachOutcome, ConnectionTracker, DetachOutcome};
