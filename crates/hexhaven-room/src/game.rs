//! Authoritative game state for one room.
//!
//! Everything here is synchronous and owned by the room actor. Each
//! operation validates first, mutates second, and returns the messages to
//! fan out as an [`Outbox`]. Nothing in this module touches a socket.
//!
//! A round alternates between two phases:
//!
//! ```text
//! card_selection ──(every connected character selected)──→ acting
//!       ↑                                                     │
//!       └──────(queue exhausted: decay, recovery, reset)──────┘
//! ```

use hexhaven_protocol::{
    CharacterView, GameSnapshot, MonsterView, PlayerId, PlayerSummary, Recipient,
    RoomCode, RoomStatus, RoundPhase, ServerMessage, TurnEntity,
};
use hexhaven_rules::{
    CardId, CardPosition, CharacterTurnState, Contender, Element, ElementalInfusion,
    EntityKind, MAX_ACTIONS_PER_TURN, RulesError, TurnOrder, TurnSlot, TurnStep,
};

use crate::{CharacterLoadout, MonsterGroupSetup, RoomError, ScenarioSetup};

/// Messages produced by one operation, in send order.
pub type Outbox = Vec<(Recipient, ServerMessage)>;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One player's character.
#[derive(Debug, Clone)]
pub struct CharacterState {
    owner: PlayerId,
    loadout: CharacterLoadout,
    seat: u32,
    health: u32,
    hand: Vec<CardId>,
    discard: Vec<CardId>,
    turn: CharacterTurnState,
}

impl CharacterState {
    fn new(owner: PlayerId, seat: u32, loadout: CharacterLoadout) -> Self {
        let hand = loadout.hand.iter().map(|card| card.id.clone()).collect();
        Self {
            owner,
            seat,
            health: loadout.max_health,
            hand,
            discard: Vec::new(),
            turn: CharacterTurnState::new(),
            loadout,
        }
    }

    pub fn owner(&self) -> &PlayerId {
        &self.owner
    }

    pub fn hand(&self) -> &[CardId] {
        &self.hand
    }

    pub fn discard(&self) -> &[CardId] {
        &self.discard
    }

    pub fn turn(&self) -> &CharacterTurnState {
        &self.turn
    }

    /// Initiative of the chosen initiative card, if cards are selected.
    pub fn initiative(&self) -> Option<u32> {
        self.turn
            .initiative_card_id()
            .and_then(|id| self.loadout.card(id))
            .map(|card| card.initiative)
    }

    /// End-of-round card recovery: the two played cards go to the discard
    /// pile, and a hand too small for another round takes the pile back.
    fn recover(&mut self) {
        if let Some(pair) = self.turn.selected_card_ids().cloned() {
            self.hand.retain(|card| !pair.contains(card));
            self.discard.extend(pair);
        }
        if self.hand.len() < 2 {
            self.hand.append(&mut self.discard);
        }
        self.turn.reset();
    }

    fn view(&self) -> CharacterView {
        CharacterView {
            owner: self.owner.clone(),
            character_id: self.loadout.id.clone(),
            name: self.loadout.name.clone(),
            class: self.loadout.class.clone(),
            seat: self.seat,
            health: self.health,
            max_health: self.loadout.max_health,
            hand: self
                .hand
                .iter()
                .filter_map(|id| self.loadout.card(id).cloned())
                .collect(),
            discard: self.discard.clone(),
            selected_cards: self.turn.selected_card_ids().cloned(),
            initiative: self.initiative(),
            executed: self.turn.executed().to_vec(),
        }
    }
}

/// One monster group from the scenario.
#[derive(Debug, Clone)]
pub struct MonsterGroup {
    group_id: String,
    setup: MonsterGroupSetup,
    seat: u32,
    initiative: Option<u32>,
}

impl MonsterGroup {
    /// The deck is drawn in order and wraps around.
    fn draw_initiative(&self, round_number: u32) -> Option<u32> {
        let deck = &self.setup.initiative_deck;
        if deck.is_empty() {
            return None;
        }
        let index = (round_number.saturating_sub(1) as usize) % deck.len();
        deck.get(index).copied()
    }

    fn view(&self) -> MonsterView {
        MonsterView {
            group_id: self.group_id.clone(),
            monster_type: self.setup.monster_type.clone(),
            level: self.setup.level,
            seat: self.seat,
            positions: self.setup.positions.clone(),
            initiative: self.initiative,
        }
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// Board and round state of a running scenario.
#[derive(Debug, Clone)]
pub struct GameState {
    scenario_id: String,
    scenario_name: String,
    map_layout: serde_json::Value,
    round_number: u32,
    phase: RoundPhase,
    characters: Vec<CharacterState>,
    monsters: Vec<MonsterGroup>,
    elements: ElementalInfusion,
    order: Option<TurnOrder<TurnEntity>>,
}

impl GameState {
    /// Sets up round 1. `party` is `(owner, seat, loadout)` per character.
    pub fn new(
        scenario: ScenarioSetup,
        party: impl IntoIterator<Item = (PlayerId, u32, CharacterLoadout)>,
    ) -> Self {
        let characters = party
            .into_iter()
            .map(|(owner, seat, loadout)| CharacterState::new(owner, seat, loadout))
            .collect();
        let monsters = scenario
            .monsters
            .into_iter()
            .zip(0u32..)
            .map(|(setup, seat)| MonsterGroup {
                group_id: format!("{}-{seat}", setup.monster_type),
                setup,
                seat,
                initiative: None,
            })
            .collect();

        Self {
            scenario_id: scenario.id,
            scenario_name: scenario.name,
            map_layout: scenario.map_layout,
            round_number: 1,
            phase: RoundPhase::CardSelection,
            characters,
            monsters,
            elements: ElementalInfusion::new(),
            order: None,
        }
    }

    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn elements(&self) -> ElementalInfusion {
        self.elements
    }

    pub fn character(&self, owner: &PlayerId) -> Option<&CharacterState> {
        self.characters.iter().find(|c| &c.owner == owner)
    }

    /// The slot currently acting, if the acting phase is underway.
    pub fn active(&self) -> Option<&TurnSlot<TurnEntity>> {
        self.order.as_ref().and_then(TurnOrder::current)
    }

    // -- Card selection ---------------------------------------------------

    /// Commits a player's two cards for the coming round.
    ///
    /// # Errors
    /// Conflict outside the card-selection phase; validation for any
    /// card-pairing problem.
    pub fn select_cards(
        &mut self,
        player_id: &PlayerId,
        card_ids: &[CardId],
        initiative_card_id: &CardId,
    ) -> Result<Outbox, RoomError> {
        self.require_phase(RoundPhase::CardSelection, "cards are chosen before the round starts")?;
        let character = self.character_mut(player_id)?;
        character
            .turn
            .select(card_ids, initiative_card_id, &character.hand)?;

        Ok(vec![(
            Recipient::All,
            ServerMessage::CardsSelected {
                player_id: player_id.clone(),
            },
        )])
    }

    /// True once every character whose owner is connected has selected,
    /// and at least one character has.
    pub fn ready_to_begin(&self, is_connected: impl Fn(&PlayerId) -> bool) -> bool {
        if self.phase != RoundPhase::CardSelection {
            return false;
        }
        let waiting = self
            .characters
            .iter()
            .any(|c| is_connected(&c.owner) && !c.turn.has_selection());
        let any_selected = self.characters.iter().any(|c| c.turn.has_selection());
        !waiting && any_selected
    }

    /// Orders this round's queue and hands the first turn out.
    pub fn begin_round(&mut self) -> Outbox {
        let round_number = self.round_number;
        for monster in &mut self.monsters {
            monster.initiative = monster.draw_initiative(round_number);
        }

        let characters = self.characters.iter().map(|c| Contender {
            id: TurnEntity::Character {
                player_id: c.owner.clone(),
            },
            kind: EntityKind::Character,
            seat: c.seat,
            initiative: c.initiative(),
        });
        let monsters = self.monsters.iter().map(|m| Contender {
            id: TurnEntity::Monster {
                group_id: m.group_id.clone(),
            },
            kind: EntityKind::Monster,
            seat: m.seat,
            initiative: m.initiative,
        });
        let order = TurnOrder::schedule(characters.chain(monsters));

        tracing::debug!(
            round_number,
            scheduled = order.slots().len(),
            excluded = order.excluded().len(),
            "round started"
        );
        let mut outbox = vec![(
            Recipient::All,
            ServerMessage::RoundStarted {
                round_number,
                turn_order: order.slots().to_vec(),
                excluded: order.excluded().to_vec(),
            },
        )];
        self.order = Some(order);
        self.phase = RoundPhase::Acting;
        outbox.extend(self.advance_turn());
        outbox
    }

    // -- Acting -----------------------------------------------------------

    /// Performs one card half on the player's turn.
    ///
    /// # Errors
    /// Conflict when it isn't the player's turn; validation when the
    /// pairing rule forbids the action.
    pub fn execute_action(
        &mut self,
        player_id: &PlayerId,
        card_id: CardId,
        position: CardPosition,
    ) -> Result<Outbox, RoomError> {
        self.require_own_turn(player_id)?;
        let character = self.character_mut(player_id)?;
        character.turn.add_executed(card_id.clone(), position)?;
        let executed_count = character.turn.executed().len();
        let character_id = character.loadout.id.clone();

        Ok(vec![(
            Recipient::All,
            ServerMessage::ActionExecuted {
                player_id: player_id.clone(),
                character_id,
                card_id,
                position,
                executed_count,
            },
        )])
    }

    /// Ends the active turn. Legal with 0, 1, or 2 actions executed.
    ///
    /// The owner ends their own character's turn. A monster turn, or the
    /// turn of a character whose owner is not connected, may be ended by
    /// anyone in the room.
    pub fn end_turn(
        &mut self,
        player_id: &PlayerId,
        is_connected: impl Fn(&PlayerId) -> bool,
    ) -> Result<Outbox, RoomError> {
        self.require_phase(RoundPhase::Acting, "no turn is in progress")?;
        let entity = self
            .active()
            .map(|slot| slot.id.clone())
            .ok_or_else(|| RoomError::WrongPhase("no turn is in progress".into()))?;

        let allowed = match &entity {
            TurnEntity::Character { player_id: owner } => {
                owner == player_id || !is_connected(owner)
            }
            TurnEntity::Monster { .. } => true,
        };
        if !allowed {
            return Err(RoomError::NotYourTurn(entity.to_string()));
        }

        let mut outbox = vec![(Recipient::All, ServerMessage::TurnEnded { entity })];
        outbox.extend(self.advance_turn());
        Ok(outbox)
    }

    pub fn infuse_element(&mut self, player_id: &PlayerId, key: &str) -> Result<Outbox, RoomError> {
        let element: Element = key.parse()?;
        self.require_own_turn(player_id)?;
        self.elements = self.elements.generate(element);
        Ok(self.elements_changed())
    }

    /// # Errors
    /// Validation if the element is inert; there is nothing to consume.
    pub fn consume_element(&mut self, player_id: &PlayerId, key: &str) -> Result<Outbox, RoomError> {
        let element: Element = key.parse()?;
        self.require_own_turn(player_id)?;
        if !self.elements.can_consume(element) {
            return Err(RoomError::InvalidInput(format!("{element} is inert")));
        }
        self.elements = self.elements.consume(element);
        Ok(self.elements_changed())
    }

    // -- Views ------------------------------------------------------------

    pub fn snapshot(
        &self,
        room_code: RoomCode,
        status: RoomStatus,
        players: Vec<PlayerSummary>,
    ) -> GameSnapshot {
        GameSnapshot {
            room_code,
            status,
            scenario_id: self.scenario_id.clone(),
            scenario_name: self.scenario_name.clone(),
            round_number: self.round_number,
            phase: self.phase,
            map_layout: self.map_layout.clone(),
            characters: self.characters.iter().map(CharacterState::view).collect(),
            monsters: self.monsters.iter().map(MonsterGroup::view).collect(),
            elements: self.elements,
            turn_order: self
                .order
                .as_ref()
                .map(|order| order.slots().to_vec())
                .unwrap_or_default(),
            active: self.active().map(|slot| slot.id.clone()),
            players,
        }
    }

    /// Cross-checks state the validators should make impossible.
    ///
    /// # Errors
    /// [`RulesError::Invariant`] describing the first violation.
    pub fn check_invariants(&self) -> Result<(), RulesError> {
        if (self.phase == RoundPhase::Acting) != self.order.is_some() {
            return Err(RulesError::Invariant(format!(
                "phase {:?} disagrees with turn queue",
                self.phase
            )));
        }
        for character in &self.characters {
            if character.turn.executed().len() > MAX_ACTIONS_PER_TURN {
                return Err(RulesError::Invariant(format!(
                    "{} executed {} actions",
                    character.owner,
                    character.turn.executed().len()
                )));
            }
            if let Some(pair) = character.turn.selected_card_ids() {
                if let Some(missing) = pair.iter().find(|&card| !character.hand.contains(card)) {
                    return Err(RulesError::Invariant(format!(
                        "{} selected {missing} which is not in hand",
                        character.owner
                    )));
                }
            }
        }
        Ok(())
    }

    // -- Internals --------------------------------------------------------

    fn advance_turn(&mut self) -> Outbox {
        let Some(order) = self.order.as_mut() else {
            return Vec::new();
        };
        match order.advance() {
            TurnStep::Turn(slot) => vec![(
                Recipient::All,
                ServerMessage::TurnStarted {
                    entity: slot.id,
                    initiative: slot.initiative,
                },
            )],
            TurnStep::RoundComplete => self.end_round(),
        }
    }

    fn end_round(&mut self) -> Outbox {
        self.elements = self.elements.decay();
        for character in &mut self.characters {
            character.recover();
        }
        for monster in &mut self.monsters {
            monster.initiative = None;
        }
        self.order = None;
        self.phase = RoundPhase::CardSelection;

        let finished = self.round_number;
        self.round_number += 1;
        tracing::debug!(round_number = finished, "round ended");

        vec![(
            Recipient::All,
            ServerMessage::RoundEnded {
                round_number: finished,
                elements: self.elements,
            },
        )]
    }

    fn elements_changed(&self) -> Outbox {
        vec![(
            Recipient::All,
            ServerMessage::ElementsChanged {
                elements: self.elements,
            },
        )]
    }

    fn character_mut(&mut self, owner: &PlayerId) -> Result<&mut CharacterState, RoomError> {
        self.characters
            .iter_mut()
            .find(|c| &c.owner == owner)
            .ok_or_else(|| RoomError::InvalidInput(format!("player {owner} has no character")))
    }

    fn require_phase(&self, phase: RoundPhase, message: &str) -> Result<(), RoomError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(RoomError::WrongPhase(message.to_string()))
        }
    }

    fn require_own_turn(&self, player_id: &PlayerId) -> Result<(), RoomError> {
        self.require_phase(RoundPhase::Acting, "no turn is in progress")?;
        match self.active().map(|slot| &slot.id) {
            Some(TurnEntity::Character { player_id: owner }) if owner == player_id => Ok(()),
            Some(entity) => Err(RoomError::NotYourTurn(entity.to_string())),
            None => Err(RoomError::WrongPhase("no turn is in progress".into())),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use hexhaven_protocol::{AbilityCard, ErrorKind};
    use hexhaven_rules::Potency;

    use super::*;
    use crate::{Catalog, InMemoryCatalog};

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn card(id: &str) -> CardId {
        CardId::new(id)
    }

    /// p1 plays the Brute, p2 the Tinkerer, in Black Barrow.
    fn two_player_game() -> GameState {
        let catalog = InMemoryCatalog::demo();
        GameState::new(
            catalog.scenario("black-barrow").unwrap(),
            [
                (pid("p1"), 0, catalog.character("brute").unwrap()),
                (pid("p2"), 1, catalog.character("tinkerer").unwrap()),
            ],
        )
    }

    fn everyone(_: &PlayerId) -> bool {
        true
    }

    /// Round 1 order: bandit-guard 15, brute 18, tinkerer 20, living-bones 25.
    fn start_round(game: &mut GameState) -> Outbox {
        game.select_cards(&pid("p1"), &[card("trample"), card("eye-for-an-eye")], &card("eye-for-an-eye"))
            .unwrap();
        game.select_cards(&pid("p2"), &[card("hook-gun"), card("flamethrower")], &card("hook-gun"))
            .unwrap();
        assert!(game.ready_to_begin(everyone));
        game.begin_round()
    }

    #[test]
    fn test_begin_round_orders_by_initiative() {
        let mut game = two_player_game();
        let outbox = start_round(&mut game);

        let ServerMessage::RoundStarted { turn_order, excluded, round_number } = &outbox[0].1 else {
            panic!("expected round_started, got {:?}", outbox[0].1);
        };
        assert_eq!(*round_number, 1);
        assert!(excluded.is_empty());
        let initiatives: Vec<u32> = turn_order.iter().map(|s| s.initiative).collect();
        assert_eq!(initiatives, [15, 18, 20, 25]);
        assert_eq!(
            turn_order[0].id,
            TurnEntity::Monster { group_id: "bandit-guard-0".into() }
        );

        assert!(matches!(
            &outbox[1].1,
            ServerMessage::TurnStarted { initiative: 15, .. }
        ));
        assert_eq!(game.phase(), RoundPhase::Acting);
        assert!(game.check_invariants().is_ok());
    }

    #[test]
    fn test_ready_to_begin_ignores_disconnected_owner() {
        let mut game = two_player_game();
        game.select_cards(&pid("p1"), &[card("trample"), card("grab-and-go")], &card("trample"))
            .unwrap();
        assert!(!game.ready_to_begin(everyone));
        assert!(game.ready_to_begin(|p| p == &pid("p1")));
    }

    #[test]
    fn test_begin_round_excludes_unselected_character() {
        let mut game = two_player_game();
        game.select_cards(&pid("p1"), &[card("trample"), card("grab-and-go")], &card("trample"))
            .unwrap();
        let outbox = game.begin_round();
        let ServerMessage::RoundStarted { excluded, .. } = &outbox[0].1 else {
            panic!("expected round_started");
        };
        assert_eq!(
            excluded,
            &vec![TurnEntity::Character { player_id: pid("p2") }]
        );
    }

    #[test]
    fn test_select_cards_rejected_while_acting() {
        let mut game = two_player_game();
        start_round(&mut game);
        let err = game
            .select_cards(&pid("p1"), &[card("trample"), card("grab-and-go")], &card("trample"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_select_cards_card_not_in_hand() {
        let mut game = two_player_game();
        let err = game
            .select_cards(&pid("p1"), &[card("trample"), card("hook-gun")], &card("trample"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_execute_action_pairing_enforced() {
        let mut game = two_player_game();
        start_round(&mut game);
        // Monster turn first.
        game.end_turn(&pid("p2"), everyone).unwrap();

        let out = game
            .execute_action(&pid("p1"), card("trample"), CardPosition::Bottom)
            .unwrap();
        assert!(matches!(
            &out[0].1,
            ServerMessage::ActionExecuted { executed_count: 1, .. }
        ));

        let same_half = game
            .execute_action(&pid("p1"), card("eye-for-an-eye"), CardPosition::Bottom)
            .unwrap_err();
        assert_eq!(same_half.kind(), ErrorKind::Validation);

        game.execute_action(&pid("p1"), card("eye-for-an-eye"), CardPosition::Top)
            .unwrap();
        let third = game
            .execute_action(&pid("p1"), card("trample"), CardPosition::Top)
            .unwrap_err();
        assert_eq!(third.kind(), ErrorKind::Validation);
        assert!(game.check_invariants().is_ok());
    }

    #[test]
    fn test_execute_action_out_of_turn() {
        let mut game = two_player_game();
        start_round(&mut game);
        let err = game
            .execute_action(&pid("p1"), card("trample"), CardPosition::Top)
            .unwrap_err();
        assert!(matches!(err, RoomError::NotYourTurn(_)));
    }

    #[test]
    fn test_end_turn_by_other_player_rejected() {
        let mut game = two_player_game();
        start_round(&mut game);
        game.end_turn(&pid("p1"), everyone).unwrap(); // monster
        let err = game.end_turn(&pid("p2"), everyone).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_end_turn_for_disconnected_owner_allowed() {
        let mut game = two_player_game();
        start_round(&mut game);
        game.end_turn(&pid("p2"), everyone).unwrap(); // monster
        let only_p2 = |p: &PlayerId| p == &pid("p2");
        assert!(game.end_turn(&pid("p2"), only_p2).is_ok());
    }

    #[test]
    fn test_full_round_decays_and_recovers() {
        let mut game = two_player_game();
        start_round(&mut game);
        game.end_turn(&pid("p1"), everyone).unwrap(); // bandit guard
        game.infuse_element(&pid("p1"), "fire").unwrap();
        game.end_turn(&pid("p1"), everyone).unwrap(); // brute
        game.end_turn(&pid("p2"), everyone).unwrap(); // tinkerer
        let out = game.end_turn(&pid("p2"), everyone).unwrap(); // living bones

        let ServerMessage::RoundEnded { round_number, elements } = &out[1].1 else {
            panic!("expected round_ended, got {:?}", out);
        };
        assert_eq!(*round_number, 1);
        assert_eq!(elements.potency(Element::Fire), Potency::Waning);

        assert_eq!(game.round_number(), 2);
        assert_eq!(game.phase(), RoundPhase::CardSelection);
        let brute = game.character(&pid("p1")).unwrap();
        assert_eq!(brute.hand().len(), 4);
        assert_eq!(brute.discard().len(), 2);
        assert!(!brute.turn().has_selection());
        assert!(game.check_invariants().is_ok());
    }

    #[test]
    fn test_recover_returns_discard_when_hand_runs_low() {
        let small = CharacterLoadout {
            id: "scout".into(),
            name: "Scout".into(),
            class: "Vermling".into(),
            max_health: 6,
            hand: ["a", "b", "c"]
                .into_iter()
                .map(|id| AbilityCard {
                    id: card(id),
                    name: id.into(),
                    initiative: 30,
                })
                .collect(),
        };
        let mut character = CharacterState::new(pid("p1"), 0, small);
        let hand = character.hand.clone();
        character
            .turn
            .select(&[card("a"), card("b")], &card("a"), &hand)
            .unwrap();
        character.recover();
        assert_eq!(character.hand().len(), 3);
        assert!(character.discard().is_empty());
    }

    #[test]
    fn test_infuse_unknown_element_is_validation() {
        let mut game = two_player_game();
        start_round(&mut game);
        let err = game.infuse_element(&pid("p1"), "water").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_consume_inert_element_rejected() {
        let mut game = two_player_game();
        start_round(&mut game);
        game.end_turn(&pid("p1"), everyone).unwrap();
        let err = game.consume_element(&pid("p1"), "ice").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        game.infuse_element(&pid("p1"), "ice").unwrap();
        let out = game.consume_element(&pid("p1"), "ice").unwrap();
        let ServerMessage::ElementsChanged { elements } = &out[0].1 else {
            panic!("expected elements_changed");
        };
        assert!(elements.is_all_inert());
    }

    #[test]
    fn test_monster_initiative_cycles_deck() {
        let catalog = InMemoryCatalog::demo();
        let scenario = catalog.scenario("black-barrow").unwrap();
        let group = MonsterGroup {
            group_id: "living-bones-1".into(),
            setup: scenario.monsters[1].clone(),
            seat: 1,
            initiative: None,
        };
        assert_eq!(group.draw_initiative(1), Some(25));
        assert_eq!(group.draw_initiative(4), Some(81));
        assert_eq!(group.draw_initiative(5), Some(25));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut game = two_player_game();
        start_round(&mut game);
        let snapshot = game.snapshot(
            RoomCode::parse("ABCDEF").unwrap(),
            RoomStatus::Active,
            Vec::new(),
        );
        assert_eq!(snapshot.round_number, 1);
        assert_eq!(snapshot.characters.len(), 2);
        assert_eq!(snapshot.monsters.len(), 2);
        assert_eq!(snapshot.turn_order.len(), 4);
        assert_eq!(
            snapshot.active,
            Some(TurnEntity::Monster { group_id: "bandit-guard-0".into() })
        );
        assert_eq!(snapshot.characters[0].initiative, Some(18));
    }
}
