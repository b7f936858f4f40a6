//! Turn/initiative scheduler.
//!
//! At the start of every round each entity that chose an initiative value
//! is placed in a queue. Lower initiative acts first. Ties are broken by a
//! single fixed rule:
//!
//! 1. characters act before monsters on equal initiative;
//! 2. within the same kind, the lower seat acts first (seat = character
//!    join order, or the monster group's position in the scenario);
//! 3. as a last resort, the entity id.
//!
//! The resulting order is a total order over `(initiative, kind, seat, id)`
//! and never depends on the order contenders were passed in.

use serde::{Deserialize, Serialize};

/// Category of an entity in the turn order.
///
/// The declaration order is the tie-break rank: `Character < Monster`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Character,
    Monster,
}

/// An entity asking for a place in this round's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contender<Id> {
    pub id: Id,
    pub kind: EntityKind,
    pub seat: u32,
    /// `None` when the entity has not chosen an initiative card.
    pub initiative: Option<u32>,
}

/// A scheduled turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSlot<Id> {
    pub id: Id,
    pub kind: EntityKind,
    pub seat: u32,
    pub initiative: u32,
}

/// Result of [`TurnOrder::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStep<Id> {
    /// This entity acts now.
    Turn(TurnSlot<Id>),
    /// Every scheduled entity has acted. Collaborators run end-of-round
    /// effects (elemental decay, card recovery).
    RoundComplete,
}

/// The ordered queue for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOrder<Id> {
    slots: Vec<TurnSlot<Id>>,
    excluded: Vec<Id>,
    cursor: Option<usize>,
    complete: bool,
}

impl<Id: Clone + Ord> TurnOrder<Id> {
    /// Builds the round's queue. Contenders without initiative are left
    /// out (see [`excluded`](Self::excluded)) instead of stalling the round.
    pub fn schedule(contenders: impl IntoIterator<Item = Contender<Id>>) -> Self {
        let mut slots = Vec::new();
        let mut excluded = Vec::new();

        for contender in contenders {
            match contender.initiative {
                Some(initiative) => slots.push(TurnSlot {
                    id: contender.id,
                    kind: contender.kind,
                    seat: contender.seat,
                    initiative,
                }),
                None => excluded.push(contender.id),
            }
        }

        slots.sort_by(|a, b| {
            (a.initiative, a.kind, a.seat, &a.id)
                .cmp(&(b.initiative, b.kind, b.seat, &b.id))
        });
        excluded.sort();

        Self {
            slots,
            excluded,
            cursor: None,
            complete: false,
        }
    }

    /// Moves to the next entity. The first call yields the first turn.
    pub fn advance(&mut self) -> TurnStep<Id> {
        if self.complete {
            return TurnStep::RoundComplete;
        }
        let next = self.cursor.map_or(0, |i| i + 1);
        match self.slots.get(next) {
            Some(slot) => {
                self.cursor = Some(next);
                TurnStep::Turn(slot.clone())
            }
            None => {
                self.cursor = None;
                self.complete = true;
                TurnStep::RoundComplete
            }
        }
    }
}

impl<Id> TurnOrder<Id> {
    /// The entity whose turn it is, if the round is underway.
    pub fn current(&self) -> Option<&TurnSlot<Id>> {
        self.cursor.and_then(|i| self.slots.get(i))
    }

    /// Every scheduled slot, in acting order.
    pub fn slots(&self) -> &[TurnSlot<Id>] {
        &self.slots
    }

    /// Entities left out of this round for lack of initiative.
    pub fn excluded(&self) -> &[Id] {
        &self.excluded
    }

    /// Turns still to come after the current one.
    pub fn remaining(&self) -> usize {
        if self.complete {
            return 0;
        }
        match self.cursor {
            Some(i) => self.slots.len() - i - 1,
            None => self.slots.len(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(id: &str, seat: u32, initiative: Option<u32>) -> Contender<String> {
        Contender {
            id: id.to_string(),
            kind: EntityKind::Character,
            seat,
            initiative,
        }
    }

    fn monster(id: &str, seat: u32, initiative: u32) -> Contender<String> {
        Contender {
            id: id.to_string(),
            kind: EntityKind::Monster,
            seat,
            initiative: Some(initiative),
        }
    }

    fn ids(order: &TurnOrder<String>) -> Vec<&str> {
        order.slots().iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_schedule_lower_initiative_first() {
        let order = TurnOrder::schedule([
            character("brute", 0, Some(61)),
            monster("guard", 0, 15),
            character("tinkerer", 1, Some(30)),
        ]);
        assert_eq!(ids(&order), ["guard", "tinkerer", "brute"]);
    }

    #[test]
    fn test_schedule_tie_character_before_monster() {
        let order = TurnOrder::schedule([
            monster("guard", 0, 30),
            character("brute", 3, Some(30)),
        ]);
        assert_eq!(ids(&order), ["brute", "guard"]);
    }

    #[test]
    fn test_schedule_tie_same_kind_lower_seat_first() {
        let order = TurnOrder::schedule([
            character("b", 2, Some(40)),
            character("a", 1, Some(40)),
        ]);
        assert_eq!(ids(&order), ["a", "b"]);
    }

    #[test]
    fn test_schedule_independent_of_input_order() {
        let contenders = vec![
            character("a", 0, Some(20)),
            monster("m1", 0, 20),
            monster("m2", 1, 20),
            character("b", 1, Some(20)),
            character("c", 2, Some(5)),
        ];
        let forward = TurnOrder::schedule(contenders.clone());
        let backward = TurnOrder::schedule(contenders.into_iter().rev());
        assert_eq!(forward.slots(), backward.slots());
        assert_eq!(ids(&forward), ["c", "a", "b", "m1", "m2"]);
    }

    #[test]
    fn test_schedule_excludes_missing_initiative() {
        let order = TurnOrder::schedule([
            character("idle", 0, None),
            character("ready", 1, Some(50)),
        ]);
        assert_eq!(ids(&order), ["ready"]);
        assert_eq!(order.excluded(), ["idle".to_string()]);
    }

    #[test]
    fn test_advance_walks_queue_then_completes() {
        let mut order = TurnOrder::schedule([
            character("a", 0, Some(10)),
            monster("m", 0, 20),
        ]);
        assert!(order.current().is_none());
        assert_eq!(order.remaining(), 2);

        let TurnStep::Turn(first) = order.advance() else {
            panic!("expected a turn");
        };
        assert_eq!(first.id, "a");
        assert_eq!(order.current().map(|s| s.id.as_str()), Some("a"));
        assert_eq!(order.remaining(), 1);

        assert!(matches!(order.advance(), TurnStep::Turn(s) if s.id == "m"));
        assert_eq!(order.advance(), TurnStep::RoundComplete);
        assert!(order.is_complete());
        assert!(order.current().is_none());
        assert_eq!(order.advance(), TurnStep::RoundComplete);
    }

    #[test]
    fn test_advance_empty_round_completes_immediately() {
        let mut order: TurnOrder<String> =
            TurnOrder::schedule([character("idle", 0, None)]);
        assert_eq!(order.advance(), TurnStep::RoundComplete);
    }
}
