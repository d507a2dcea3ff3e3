use super::manager::ClueGameManager;
use crate::belief::BeliefMetrics;
use crate::model::category::Category;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardProbability {
    pub card: String,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySnapshot {
    pub category: Category,
    pub cards: Vec<CardProbability>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSnapshot {
    pub name: String,
    pub hand_size: usize,
    pub known_has: Vec<String>,
    pub known_not_has: Vec<String>,
    pub cards: Vec<CardProbability>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnownCardEntry {
    pub card: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SolutionSnapshot {
    pub suspect: String,
    pub weapon: String,
    pub room: String,
}

/// Committed state of a game with every card and player named, ready to be
/// handed to a presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSnapshot {
    pub suggestions_recorded: usize,
    pub envelope: Vec<CategorySnapshot>,
    pub players: Vec<PlayerSnapshot>,
    pub known_cards: Vec<KnownCardEntry>,
    pub solved: bool,
    pub solution: Option<SolutionSnapshot>,
    pub metrics: BeliefMetrics,
}

impl GameSnapshot {
    pub fn capture(game: &ClueGameManager) -> Self {
        let universe = game.universe();
        let roster = game.roster();

        let envelope = game
            .envelope_distribution()
            .into_iter()
            .map(|distribution| CategorySnapshot {
                category: distribution.category,
                cards: distribution
                    .iter()
                    .map(|(card, probability)| CardProbability {
                        card: universe.name(*card).to_string(),
                        probability: *probability,
                    })
                    .collect(),
            })
            .collect();

        let players = roster
            .ids()
            .filter_map(|player| game.player_belief(player).ok())
            .map(|belief| PlayerSnapshot {
                name: roster.name(belief.player).to_string(),
                hand_size: roster.hand_size(belief.player),
                known_has: belief
                    .known_has
                    .iter()
                    .map(|card| universe.name(*card).to_string())
                    .collect(),
                known_not_has: belief
                    .known_not_has
                    .iter()
                    .map(|card| universe.name(*card).to_string())
                    .collect(),
                cards: belief
                    .probabilities
                    .iter()
                    .map(|(card, probability)| CardProbability {
                        card: universe.name(*card).to_string(),
                        probability: *probability,
                    })
                    .collect(),
            })
            .collect();

        let known_cards = game
            .known_cards()
            .iter()
            .map(|(card, location)| KnownCardEntry {
                card: universe.name(card).to_string(),
                location: location.label(roster),
            })
            .collect();

        let solution = game.envelope_solution().map(|solution| SolutionSnapshot {
            suspect: universe.name(solution.suspect).to_string(),
            weapon: universe.name(solution.weapon).to_string(),
            room: universe.name(solution.room).to_string(),
        });

        GameSnapshot {
            suggestions_recorded: game.suggestions().len(),
            envelope,
            players,
            known_cards,
            solved: game.is_solved(),
            solution,
            metrics: game.metrics(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Envelope probability of the card named `card`, matched case-insensitively.
    pub fn envelope_probability(&self, card: &str) -> Option<f64> {
        self.envelope
            .iter()
            .flat_map(|category| category.cards.iter())
            .find(|entry| entry.card.eq_ignore_ascii_case(card))
            .map(|entry| entry.probability)
    }

    pub fn player(&self, name: &str) -> Option<&PlayerSnapshot> {
        self.players
            .iter()
            .find(|player| player.name.eq_ignore_ascii_case(name))
    }
}
