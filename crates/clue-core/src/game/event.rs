use crate::error::ClueError;
use crate::model::card::Card;
use crate::model::category::Category;
use crate::model::player::{PlayerId, Roster};
use crate::model::universe::CardUniverse;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// What one asked player did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOutcome {
    CouldNotRefute,
    /// `shown` is set when the observer saw which card was shown.
    Refuted { shown: Option<Card> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub player: PlayerId,
    pub outcome: ResponseOutcome,
}

/// A suggestion and every response it received, in the order players were asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionEvent {
    pub suggester: PlayerId,
    pub cards: [Card; 3],
    pub responses: Vec<Response>,
}

impl SuggestionEvent {
    pub fn new(suggester: PlayerId, cards: [Card; 3]) -> Self {
        Self {
            suggester,
            cards,
            responses: Vec::new(),
        }
    }

    pub fn passed(mut self, player: PlayerId) -> Self {
        self.responses.push(Response {
            player,
            outcome: ResponseOutcome::CouldNotRefute,
        });
        self
    }

    pub fn refuted(mut self, player: PlayerId, shown: Option<Card>) -> Self {
        self.responses.push(Response {
            player,
            outcome: ResponseOutcome::Refuted { shown },
        });
        self
    }

    /// Players who were asked and could not refute.
    pub fn passers(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.responses
            .iter()
            .filter(|response| response.outcome == ResponseOutcome::CouldNotRefute)
            .map(|response| response.player)
    }

    /// Checks the event against the table and classifies its outcome.
    ///
    /// Asked players must be exactly the players seated after the suggester,
    /// in turn order, up to and including the refuter. A suggestion nobody
    /// refuted must have asked everyone.
    pub fn classify(&self, universe: &CardUniverse, roster: &Roster) -> Result<Outcome, ClueError> {
        if !roster.contains(self.suggester) {
            return Err(ClueError::invalid_event(format!(
                "suggester {} is not seated",
                self.suggester
            )));
        }
        self.validate_cards(universe)?;

        let order = roster.response_order(self.suggester);
        if self.responses.len() > order.len() {
            return Err(ClueError::invalid_event(format!(
                "{} responses recorded but only {} players can be asked",
                self.responses.len(),
                order.len()
            )));
        }

        for (position, response) in self.responses.iter().enumerate() {
            let expected = order[position];
            if response.player != expected {
                let reason = if !roster.contains(response.player) {
                    format!("responder {} is not seated", response.player)
                } else if response.player == self.suggester {
                    format!(
                        "{} cannot respond to their own suggestion",
                        roster.name(self.suggester)
                    )
                } else if self.responses[..position]
                    .iter()
                    .any(|earlier| earlier.player == response.player)
                {
                    format!("{} was asked twice", roster.name(response.player))
                } else {
                    format!(
                        "{} answered out of turn; {} is asked next",
                        roster.name(response.player),
                        roster.name(expected)
                    )
                };
                return Err(ClueError::invalid_event(reason));
            }

            let is_last = position + 1 == self.responses.len();
            if let ResponseOutcome::Refuted { shown } = response.outcome {
                if !is_last {
                    return Err(ClueError::invalid_event(format!(
                        "players were asked after {} refuted",
                        roster.name(response.player)
                    )));
                }
                return match shown {
                    Some(card) if !self.cards.contains(&card) => {
                        Err(ClueError::invalid_event(format!(
                            "{} showed {}, which was not suggested",
                            roster.name(response.player),
                            universe.name(card)
                        )))
                    }
                    Some(card) => Ok(Outcome::KnownCardShown {
                        refuter: response.player,
                        card,
                    }),
                    None => Ok(Outcome::AmbiguousRefutation {
                        refuter: response.player,
                    }),
                };
            }
        }

        if self.responses.len() < order.len() {
            return Err(ClueError::invalid_event(format!(
                "nobody refuted but {} of {} players were asked",
                self.responses.len(),
                order.len()
            )));
        }
        Ok(Outcome::NoRefutation)
    }

    fn validate_cards(&self, universe: &CardUniverse) -> Result<(), ClueError> {
        if let Some(card) = self.cards.iter().find(|card| !universe.contains(**card)) {
            return Err(ClueError::invalid_event(format!(
                "{card} is not part of this deck"
            )));
        }
        let mut categories: Vec<Category> = self.cards.iter().map(|card| card.category).collect();
        categories.sort();
        if categories != Category::ALL {
            return Err(ClueError::invalid_event(
                "a suggestion names exactly one suspect, one weapon and one room",
            ));
        }
        Ok(())
    }
}

/// Classified result of a suggestion, deciding which update rules fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NoRefutation,
    AmbiguousRefutation { refuter: PlayerId },
    KnownCardShown { refuter: PlayerId, card: Card },
}

/// History entry. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSuggestion {
    pub sequence: u32,
    pub recorded_at: SystemTime,
    pub event: SuggestionEvent,
    pub outcome: Outcome,
}
