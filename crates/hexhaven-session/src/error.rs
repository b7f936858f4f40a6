//! Error types for the session layer.

use hexhaven_protocol::{ErrorKind, PlayerId};

/// Errors raised by the [`ConnectionTracker`](crate::ConnectionTracker).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The room already holds its maximum number of players.
    #[error("room is full ({max} players)")]
    RoomFull { max: usize },

    /// A join named a player id that is already seated in this room.
    #[error("player {0} is already in this room")]
    AlreadyMember(PlayerId),

    /// No session exists for this player in the room.
    #[error("player {0} is not in this room")]
    NotMember(PlayerId),

    /// The player's grace period ran out; their seat is gone.
    #[error("session for player {0} has expired")]
    SessionGone(PlayerId),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotMember(_) => ErrorKind::Validation,
            Self::RoomFull { .. } | Self::AlreadyMember(_) | Self::SessionGone(_) => {
                ErrorKind::Conflict
            }
        }
    }
}
