//! Snapshot view types.
//!
//! A [`GameSnapshot`] is the complete, authoritative state of one room as a
//! client needs it to render the board. It is consumed wholesale: the
//! client replaces its local state with the snapshot rather than merging.

use hexhaven_rules::{CardId, ElementalInfusion, ExecutedAction, TurnSlot};
use serde::{Deserialize, Serialize};

use crate::{ConnectionStatus, PlayerId, RoomCode, RoomStatus, TurnEntity};

/// Which half of the round the room is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Characters are choosing their two cards.
    CardSelection,
    /// Entities take turns in initiative order.
    Acting,
}

/// An ability card as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityCard {
    pub id: CardId,
    pub name: String,
    pub initiative: u32,
}

/// One character on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterView {
    pub owner: PlayerId,
    pub character_id: String,
    pub name: String,
    pub class: String,
    pub seat: u32,
    pub health: u32,
    pub max_health: u32,
    pub hand: Vec<AbilityCard>,
    pub discard: Vec<CardId>,
    /// The two cards chosen this round, if any.
    pub selected_cards: Option<[CardId; 2]>,
    pub initiative: Option<u32>,
    pub executed: Vec<ExecutedAction>,
}

/// One monster group on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterView {
    pub group_id: String,
    pub monster_type: String,
    pub level: u32,
    pub seat: u32,
    /// Hex ids the group's standees occupy.
    pub positions: Vec<String>,
    pub initiative: Option<u32>,
}

/// Lobby/roster entry for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub nickname: String,
    pub status: ConnectionStatus,
    pub character_id: Option<String>,
    pub is_host: bool,
}

/// Full authoritative room state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub room_code: RoomCode,
    pub status: RoomStatus,
    pub scenario_id: String,
    pub scenario_name: String,
    pub round_number: u32,
    pub phase: RoundPhase,
    /// Scenario board as authored; passed through untouched.
    pub map_layout: serde_json::Value,
    pub characters: Vec<CharacterView>,
    pub monsters: Vec<MonsterView>,
    pub elements: ElementalInfusion,
    pub turn_order: Vec<TurnSlot<TurnEntity>>,
    pub active: Option<TurnEntity>,
    pub players: Vec<PlayerSummary>,
}

#[cfg(test)]
mod tests {
    use hexhaven_rules::{Element, EntityKind};

    use super::*;

    fn sample() -> GameSnapshot {
        let owner = PlayerId::new("p1");
        GameSnapshot {
            room_code: RoomCode::parse("ABC123").unwrap(),
            status: RoomStatus::Active,
            scenario_id: "black-barrow".into(),
            scenario_name: "Black Barrow".into(),
            round_number: 1,
            phase: RoundPhase::Acting,
            map_layout: serde_json::json!([
                { "id": "h0", "x": 0, "y": 0, "terrain": "floor", "features": [] }
            ]),
            characters: vec![CharacterView {
                owner: owner.clone(),
                character_id: "brute".into(),
                name: "Brute".into(),
                class: "Inox".into(),
                seat: 0,
                health: 10,
                max_health: 10,
                hand: vec![AbilityCard {
                    id: CardId::new("trample"),
                    name: "Trample".into(),
                    initiative: 72,
                }],
                discard: Vec::new(),
                selected_cards: None,
                initiative: None,
                executed: Vec::new(),
            }],
            monsters: Vec::new(),
            elements: ElementalInfusion::new().generate(Element::Fire),
            turn_order: vec![TurnSlot {
                id: TurnEntity::Character {
                    player_id: owner.clone(),
                },
                kind: EntityKind::Character,
                seat: 0,
                initiative: 72,
            }],
            active: Some(TurnEntity::Character { player_id: owner }),
            players: Vec::new(),
        }
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["room_code"], "ABC123");
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["phase"], "acting");
        assert_eq!(json["map_layout"][0]["terrain"], "floor");
        assert_eq!(json["elements"]["fire"], "STRONG");
        assert_eq!(json["turn_order"][0]["id"]["kind"], "character");
        assert_eq!(json["characters"][0]["hand"][0]["initiative"], 72);
    }

    #[test]
    fn test_snapshot_survives_wire() {
        let snapshot = sample();
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let back: GameSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, snapshot);
    }
}
