//! Character and scenario catalog.
//!
//! Character builds and scenario layouts are owned by an external content
//! service. Rooms only read them through the [`Catalog`] trait, once when
//! a character is chosen and once when a room is created.

use std::collections::BTreeMap;

use hexhaven_protocol::AbilityCard;
use hexhaven_rules::CardId;
use serde::{Deserialize, Serialize};

use crate::RoomError;

/// A playable character as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterLoadout {
    pub id: String,
    pub name: String,
    pub class: String,
    pub max_health: u32,
    pub hand: Vec<AbilityCard>,
}

impl CharacterLoadout {
    pub fn card(&self, card_id: &CardId) -> Option<&AbilityCard> {
        self.hand.iter().find(|card| &card.id == card_id)
    }
}

/// One monster group placed by a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterGroupSetup {
    #[serde(rename = "type")]
    pub monster_type: String,
    pub level: u32,
    pub positions: Vec<String>,
    /// Initiative values of the group's ability deck, drawn in order and
    /// cycled by round.
    pub initiative_deck: Vec<u32>,
}

/// Everything a room needs to start a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSetup {
    pub id: String,
    pub name: String,
    /// Hex list as authored: `[{id, x, y, terrain, features}, …]`.
    pub map_layout: serde_json::Value,
    pub monsters: Vec<MonsterGroupSetup>,
}

/// Read-only source of characters and scenarios.
pub trait Catalog: Send + Sync + 'static {
    fn character(&self, id: &str) -> Option<CharacterLoadout>;

    fn scenario(&self, id: &str) -> Option<ScenarioSetup>;
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    characters: Vec<CharacterLoadout>,
    #[serde(default)]
    scenarios: Vec<ScenarioSetup>,
}

/// Catalog held in memory, loaded from JSON or built in code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    characters: BTreeMap<String, CharacterLoadout>,
    scenarios: BTreeMap<String, ScenarioSetup>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_character(mut self, character: CharacterLoadout) -> Self {
        self.characters.insert(character.id.clone(), character);
        self
    }

    pub fn with_scenario(mut self, scenario: ScenarioSetup) -> Self {
        self.scenarios.insert(scenario.id.clone(), scenario);
        self
    }

    /// Parses `{"characters": [...], "scenarios": [...]}`.
    ///
    /// # Errors
    /// Returns [`RoomError::Catalog`] if the JSON doesn't match.
    pub fn from_json(json: &str) -> Result<Self, RoomError> {
        let file: CatalogFile = serde_json::from_str(json).map_err(RoomError::Catalog)?;
        let catalog = file
            .characters
            .into_iter()
            .fold(Self::new(), Self::with_character);
        Ok(file
            .scenarios
            .into_iter()
            .fold(catalog, Self::with_scenario))
    }

    /// Three starter characters and one small scenario.
    pub fn demo() -> Self {
        Self::new()
            .with_character(loadout(
                "brute",
                "Brute",
                "Inox",
                10,
                &[
                    ("trample", "Trample", 72),
                    ("eye-for-an-eye", "Eye for an Eye", 18),
                    ("sweeping-blow", "Sweeping Blow", 64),
                    ("provoking-roar", "Provoking Roar", 10),
                    ("overwhelming-assault", "Overwhelming Assault", 61),
                    ("grab-and-go", "Grab and Go", 87),
                ],
            ))
            .with_character(loadout(
                "tinkerer",
                "Tinkerer",
                "Quatryl",
                8,
                &[
                    ("proximity-mine", "Proximity Mine", 62),
                    ("harmless-contraption", "Harmless Contraption", 74),
                    ("enhancement-field", "Enhancement Field", 61),
                    ("flamethrower", "Flamethrower", 47),
                    ("hook-gun", "Hook Gun", 20),
                    ("stun-shot", "Stun Shot", 20),
                ],
            ))
            .with_character(loadout(
                "spellweaver",
                "Spellweaver",
                "Orchid",
                6,
                &[
                    ("fire-orbs", "Fire Orbs", 69),
                    ("impaling-eruption", "Impaling Eruption", 80),
                    ("reviving-ether", "Reviving Ether", 77),
                    ("freezing-nova", "Freezing Nova", 21),
                    ("mana-bolt", "Mana Bolt", 7),
                    ("frost-armor", "Frost Armor", 20),
                ],
            ))
            .with_scenario(ScenarioSetup {
                id: "black-barrow".into(),
                name: "Black Barrow".into(),
                map_layout: serde_json::json!([
                    { "id": "h0", "x": 0, "y": 0, "terrain": "floor", "features": [] },
                    { "id": "h1", "x": 1, "y": 0, "terrain": "floor", "features": [] },
                    { "id": "h2", "x": 2, "y": 0, "terrain": "floor", "features": ["trap"] },
                    { "id": "h3", "x": 0, "y": 1, "terrain": "floor", "features": [] },
                    { "id": "h4", "x": 1, "y": 1, "terrain": "floor", "features": [] },
                    { "id": "h5", "x": 2, "y": 1, "terrain": "obstacle", "features": [] },
                    { "id": "h6", "x": 0, "y": 2, "terrain": "floor", "features": ["treasure"] }
                ]),
                monsters: vec![
                    MonsterGroupSetup {
                        monster_type: "bandit-guard".into(),
                        level: 1,
                        positions: vec!["h3".into(), "h4".into()],
                        initiative_deck: vec![15, 30, 35, 50, 55, 70],
                    },
                    MonsterGroupSetup {
                        monster_type: "living-bones".into(),
                        level: 1,
                        positions: vec!["h6".into()],
                        initiative_deck: vec![25, 45, 64, 81],
                    },
                ],
            })
    }
}

impl Catalog for InMemoryCatalog {
    fn character(&self, id: &str) -> Option<CharacterLoadout> {
        self.characters.get(id).cloned()
    }

    fn scenario(&self, id: &str) -> Option<ScenarioSetup> {
        self.scenarios.get(id).cloned()
    }
}

fn loadout(
    id: &str,
    name: &str,
    class: &str,
    max_health: u32,
    cards: &[(&str, &str, u32)],
) -> CharacterLoadout {
    CharacterLoadout {
        id: id.into(),
        name: name.into(),
        class: class.into(),
        max_health,
        hand: cards
            .iter()
            .map(|&(id, name, initiative)| AbilityCard {
                id: CardId::new(id),
                name: name.into(),
                initiative,
            })
            .collect(),
    }
}
