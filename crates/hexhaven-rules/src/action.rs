//! Turn action validator: the card-pairing rule.
//!
//! Each round a character commits two ability cards. On their turn they may
//! perform at most two actions: one half (top or bottom) of one card, then
//! the *opposite* half of the *other* card. Using fewer actions is fine;
//! reusing a card or a half is not.
//!
//! ```text
//! selected [A, B]     executed          legal next
//! ----------------    --------------    ---------------------------
//!                     []                A.top A.bottom B.top B.bottom
//!                     [A.bottom]        B.top
//!                     [A.bottom, B.top] (nothing)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RulesError;

/// Maximum number of actions a character performs in one turn.
pub const MAX_ACTIONS_PER_TURN: usize = 2;

/// Identifier of an ability card in a character's deck.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Which half of an ability card an action uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPosition {
    Top,
    Bottom,
}

impl CardPosition {
    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }
}

impl fmt::Display for CardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => f.write_str("top"),
            Self::Bottom => f.write_str("bottom"),
        }
    }
}

/// One action already performed this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedAction {
    pub card_id: CardId,
    pub position: CardPosition,
}

/// The two cards a character committed to this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSelection {
    /// Unordered pair of distinct cards.
    pub card_ids: [CardId; 2],
    /// One of `card_ids`; its initiative value orders the character.
    pub initiative_card_id: CardId,
}

impl CardSelection {
    pub fn contains(&self, card_id: &CardId) -> bool {
        self.card_ids.contains(card_id)
    }
}

/// Returns `true` if `card_id`/`position` may be executed next.
///
/// Fails closed: with no selection nothing is legal.
pub fn can_execute(
    selected: Option<&[CardId; 2]>,
    executed: &[ExecutedAction],
    card_id: &CardId,
    position: CardPosition,
) -> bool {
    check_execute(selected, executed, card_id, position).is_ok()
}

/// Like [`can_execute`] but explains the rejection.
pub fn check_execute(
    selected: Option<&[CardId; 2]>,
    executed: &[ExecutedAction],
    card_id: &CardId,
    position: CardPosition,
) -> Result<(), RulesError> {
    let Some(pair) = selected else {
        return Err(RulesError::Validation(
            "no cards selected this round".into(),
        ));
    };
    if !pair.contains(card_id) {
        return Err(RulesError::Validation(format!(
            "card {card_id} is not one of the selected cards"
        )));
    }

    match executed {
        [] => Ok(()),
        [first] if first.card_id == *card_id => Err(RulesError::Validation(
            format!("card {card_id} was already used this turn"),
        )),
        [first] if first.position == position => {
            Err(RulesError::Validation(format!(
                "second action must use the {} half",
                first.position.opposite()
            )))
        }
        [_] => Ok(()),
        [_, _] => Err(RulesError::Validation(
            "both actions have already been executed this turn".into(),
        )),
        more => Err(RulesError::Invariant(format!(
            "{} actions recorded in one turn",
            more.len()
        ))),
    }
}

/// Per-character state for the current round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterTurnState {
    selection: Option<CardSelection>,
    executed: Vec<ExecutedAction>,
}

impl CharacterTurnState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits two cards from `hand` for this round.
    ///
    /// Re-selecting before acting replaces the previous choice. All checks
    /// run before anything is written.
    pub fn select(
        &mut self,
        card_ids: &[CardId],
        initiative_card_id: &CardId,
        hand: &[CardId],
    ) -> Result<(), RulesError> {
        if !self.executed.is_empty() {
            return Err(RulesError::Validation(
                "cards cannot change after acting this turn".into(),
            ));
        }
        let [first, second] = card_ids else {
            return Err(RulesError::Validation(format!(
                "exactly 2 cards must be selected, got {}",
                card_ids.len()
            )));
        };
        if first == second {
            return Err(RulesError::Validation(format!(
                "card {first} selected twice"
            )));
        }
        for card in [first, second] {
            if !hand.contains(card) {
                return Err(RulesError::Validation(format!(
                    "card {card} is not in hand"
                )));
            }
        }
        if initiative_card_id != first && initiative_card_id != second {
            return Err(RulesError::Validation(format!(
                "initiative card {initiative_card_id} must be one of the selected cards"
            )));
        }

        self.selection = Some(CardSelection {
            card_ids: [first.clone(), second.clone()],
            initiative_card_id: initiative_card_id.clone(),
        });
        Ok(())
    }

    pub fn selection(&self) -> Option<&CardSelection> {
        self.selection.as_ref()
    }

    pub fn selected_card_ids(&self) -> Option<&[CardId; 2]> {
        self.selection.as_ref().map(|s| &s.card_ids)
    }

    pub fn initiative_card_id(&self) -> Option<&CardId> {
        self.selection.as_ref().map(|s| &s.initiative_card_id)
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn executed(&self) -> &[ExecutedAction] {
        &self.executed
    }

    pub fn can_execute(&self, card_id: &CardId, position: CardPosition) -> bool {
        can_execute(self.selected_card_ids(), &self.executed, card_id, position)
    }

    pub fn check_execute(
        &self,
        card_id: &CardId,
        position: CardPosition,
    ) -> Result<(), RulesError> {
        check_execute(self.selected_card_ids(), &self.executed, card_id, position)
    }

    /// Records an action after checking it. On error nothing changes.
    pub fn add_executed(
        &mut self,
        card_id: CardId,
        position: CardPosition,
    ) -> Result<&ExecutedAction, RulesError> {
        self.check_execute(&card_id, position)?;
        self.executed.push(ExecutedAction { card_id, position });
        // check_execute rejects a third push, so last() is the one we added.
        self.executed.last().ok_or_else(|| {
            RulesError::Invariant("executed list empty after push".into())
        })
    }

    /// Clears selection, initiative choice, and executed actions together.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
