//! Pure turn rules for Hexhaven.
//!
//! Nothing in this crate knows about rooms, sockets, or time. Each module
//! is a small state machine that the room actor drives:
//!
//! - [`element`]: six elemental infusions that decay every round
//! - [`action`]: which card halves a character may still play this turn
//! - [`initiative`]: who acts in which order
//!
//! Every check runs before any mutation, so a rejected request leaves the
//! state exactly as it was.

pub mod action;
pub mod element;
mod error;
pub mod initiative;

pub use action::{
    can_execute, CardId, CardPosition, CardSelection, CharacterTurnState,
    ExecutedAction, MAX_ACTIONS_PER_TURN,
};
pub use element::{Element, ElementalInfusion, Potency};
pub use error::RulesError;
pub use initiative::{Contender, EntityKind, TurnOrder, TurnSlot, TurnStep};
