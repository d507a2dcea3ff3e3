use crate::model::card::Card;
use crate::model::category::Category;
use crate::model::location::Location;
use crate::model::player::{PlayerId, Roster};
use crate::model::universe::CardUniverse;
use thiserror::Error;

/// Failures surfaced by the engine. None of them leave a game half-updated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClueError {
    #[error("invalid suggestion: {reason}")]
    InvalidEvent { reason: String },
    #[error("constraint violation: {conflict}")]
    ConstraintViolation { conflict: Conflict },
    #[error("degenerate {category} distribution: every card was ruled out of the envelope")]
    DegenerateDistribution { category: Category },
    #[error("invalid game setup: {message}")]
    InvalidSetup { message: String },
    #[error("invalid belief configuration: {field}: {message}")]
    InvalidConfig { field: String, message: String },
    #[error("unknown card '{name}'")]
    UnknownCard { name: String },
    #[error("unknown player '{name}'")]
    UnknownPlayer { name: String },
    #[error("the envelope has not been solved")]
    NotSolved,
}

impl ClueError {
    pub(crate) fn invalid_event(reason: impl Into<String>) -> Self {
        ClueError::InvalidEvent {
            reason: reason.into(),
        }
    }

    pub(crate) fn violation(conflict: Conflict) -> Self {
        ClueError::ConstraintViolation { conflict }
    }

    /// Human-readable message with card and player names resolved.
    pub fn describe(&self, universe: &CardUniverse, roster: &Roster) -> String {
        match self {
            ClueError::ConstraintViolation { conflict } => {
                format!("constraint violation: {}", conflict.describe(universe, roster))
            }
            other => other.to_string(),
        }
    }
}

/// The facts that could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("{card} is proven to be both in {first} and in {second}")]
    TwoLocations {
        card: Card,
        first: Location,
        second: Location,
    },
    #[error("{card} has been ruled out of every location")]
    NoLocation { card: Card },
    #[error("{card} was ruled out of the envelope but is now proven to be in it")]
    EnvelopeRuledOut { card: Card },
    #[error("{card} is proven to be in the envelope and cannot be ruled out of it")]
    EnvelopeConfirmed { card: Card },
    #[error("the envelope already holds {existing}, so it cannot hold {incoming}")]
    EnvelopeCategoryTaken { existing: Card, incoming: Card },
    #[error("{player} is proven both to hold and to lack {card}")]
    HeldAndExcluded { player: PlayerId, card: Card },
    #[error("{player} holds {known} known cards but only has {hand_size}")]
    HandOverflow {
        player: PlayerId,
        hand_size: usize,
        known: usize,
    },
    #[error("{player} can hold at most {possible} cards but must hold {hand_size}")]
    HandUnderflow {
        player: PlayerId,
        hand_size: usize,
        possible: usize,
    },
    #[error("{player} refuted a suggestion but can hold none of {cards:?}")]
    UnsatisfiableRefutation { player: PlayerId, cards: [Card; 3] },
}

impl Conflict {
    pub fn describe(&self, universe: &CardUniverse, roster: &Roster) -> String {
        match self {
            Conflict::TwoLocations {
                card,
                first,
                second,
            } => format!(
                "{} is proven to be both in {} and in {}",
                universe.name(*card),
                first.label(roster),
                second.label(roster)
            ),
            Conflict::NoLocation { card } => {
                format!("{} has been ruled out of every location", universe.name(*card))
            }
            Conflict::EnvelopeRuledOut { card } => format!(
                "{} was ruled out of the envelope but is now proven to be in it",
                universe.name(*card)
            ),
            Conflict::EnvelopeConfirmed { card } => format!(
                "{} is proven to be in the envelope and cannot be ruled out of it",
                universe.name(*card)
            ),
            Conflict::EnvelopeCategoryTaken { existing, incoming } => format!(
                "the envelope already holds {}, so it cannot hold {}",
                universe.name(*existing),
                universe.name(*incoming)
            ),
            Conflict::HeldAndExcluded { player, card } => format!(
                "{} is proven both to hold and to lack {}",
                roster.name(*player),
                universe.name(*card)
            ),
            Conflict::HandOverflow {
                player,
                hand_size,
                known,
            } => format!(
                "{} holds {known} known cards but only has {hand_size}",
                roster.name(*player)
            ),
            Conflict::HandUnderflow {
                player,
                hand_size,
                possible,
            } => format!(
                "{} can hold at most {possible} cards but must hold {hand_size}",
                roster.name(*player)
            ),
            Conflict::UnsatisfiableRefutation { player, cards } => {
                let names: Vec<&str> = cards.iter().map(|card| universe.name(*card)).collect();
                format!(
                    "{} refuted a suggestion but can hold none of {}",
                    roster.name(*player),
                    names.join(", ")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_resolves_names() {
        let universe = CardUniverse::standard();
        let roster = Roster::new(
            vec![("You".to_string(), 9), ("Alice".to_string(), 9)],
            PlayerId(0),
        )
        .unwrap();
        let scarlett = universe.card("Scarlett").unwrap();
        let err = ClueError::violation(Conflict::TwoLocations {
            card: scarlett,
            first: Location::Envelope,
            second: Location::Player(PlayerId(1)),
        });
        assert_eq!(
            err.describe(&universe, &roster),
            "constraint violation: Miss Scarlett is proven to be both in envelope and in Alice"
        );
        assert!(err.to_string().contains("suspect#0"));
    }
}
