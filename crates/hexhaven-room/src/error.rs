//! Error types for the room layer.

use hexhaven_protocol::{ErrorKind, PlayerId, RoomCode, RoomStatus};
use hexhaven_rules::RulesError;
use hexhaven_session::SessionError;

/// Errors that can occur during room operations.
///
/// Every variant maps onto a wire [`ErrorKind`] through
/// [`RoomError::kind`], which tells the client how to react.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room with this code exists (or it was evicted).
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room is in a status that doesn't allow this operation.
    #[error("cannot {action} while room is {status}")]
    WrongStatus {
        action: &'static str,
        status: RoomStatus,
    },

    /// The request is valid only in the other round phase.
    #[error("{0}")]
    WrongPhase(String),

    /// Someone other than the active entity's owner tried to act.
    #[error("it is not your turn ({0} is active)")]
    NotYourTurn(String),

    #[error("only the host can {0}")]
    NotHost(&'static str),

    #[error("need at least {need} players to start, have {have}")]
    NotEnoughPlayers { have: usize, need: usize },

    #[error("player {0} has not chosen a character")]
    CharacterMissing(PlayerId),

    /// The request came from a socket that no longer holds the seat.
    #[error("player {0} is seated on another socket")]
    SeatMoved(PlayerId),

    #[error("character '{0}' is already taken")]
    CharacterTaken(String),

    #[error("unknown character '{0}'")]
    UnknownCharacter(String),

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    /// Malformed input that isn't covered by a more specific variant.
    #[error("{0}")]
    InvalidInput(String),

    /// The room detected an impossible state and refuses further moves.
    #[error("room {0} is faulted")]
    Faulted(RoomCode),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    #[error("catalog could not be loaded: {0}")]
    Catalog(#[source] serde_json::Error),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Rules(#[from] RulesError),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_)
            | Self::UnknownCharacter(_)
            | Self::UnknownScenario(_)
            | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::WrongStatus { .. }
            | Self::WrongPhase(_)
            | Self::NotYourTurn(_)
            | Self::NotHost(_)
            | Self::NotEnoughPlayers { .. }
            | Self::CharacterMissing(_)
            | Self::CharacterTaken(_)
            | Self::SeatMoved(_) => ErrorKind::Conflict,
            Self::Unavailable(_) => ErrorKind::Transport,
            Self::Faulted(_) | Self::Catalog(_) => ErrorKind::Invariant,
            Self::Session(err) => err.kind(),
            Self::Rules(err) if err.is_invariant() => ErrorKind::Invariant,
            Self::Rules(_) => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let code = RoomCode::parse("ABCD").unwrap();
        assert_eq!(RoomError::NotFound(code.clone()).kind(), ErrorKind::Validation);
        assert_eq!(RoomError::NotYourTurn("x".into()).kind(), ErrorKind::Conflict);
        assert_eq!(RoomError::SeatMoved(PlayerId::new("p1")).kind(), ErrorKind::Conflict);
        assert_eq!(RoomError::Unavailable(code.clone()).kind(), ErrorKind::Transport);
        assert_eq!(RoomError::Faulted(code).kind(), ErrorKind::Invariant);
        assert_eq!(
            RoomError::from(RulesError::Validation("bad".into())).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            RoomError::from(RulesError::Invariant("broken".into())).kind(),
            ErrorKind::Invariant
        );
        assert_eq!(
            RoomError::from(SessionError::RoomFull { max: 4 }).kind(),
            ErrorKind::Conflict
        );
    }
}
