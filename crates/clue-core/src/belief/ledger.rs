use crate::error::{ClueError, Conflict};
use crate::model::card::Card;
use crate::model::category::Category;
use crate::model::location::Location;
use std::collections::BTreeMap;

/// Append-only record of every card whose location has been proven.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownCards {
    entries: BTreeMap<Card, Location>,
}

impl KnownCards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `card` at `location`. Re-recording the same fact is a no-op; a
    /// different location for an already-recorded card is a conflict.
    pub fn record(&mut self, card: Card, location: Location) -> Result<bool, ClueError> {
        match self.entries.get(&card) {
            Some(existing) if *existing == location => Ok(false),
            Some(existing) => Err(ClueError::violation(Conflict::TwoLocations {
                card,
                first: *existing,
                second: location,
            })),
            None => {
                self.entries.insert(card, location);
                Ok(true)
            }
        }
    }

    pub fn location(&self, card: Card) -> Option<Location> {
        self.entries.get(&card).copied()
    }

    pub fn contains(&self, card: Card) -> bool {
        self.entries.contains_key(&card)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Card, Location)> + '_ {
        self.entries.iter().map(|(card, location)| (*card, *location))
    }

    pub fn envelope_cards(&self) -> Vec<Card> {
        self.iter()
            .filter(|(_, location)| *location == Location::Envelope)
            .map(|(card, _)| card)
            .collect()
    }

    pub fn envelope_card(&self, category: Category) -> Option<Card> {
        self.envelope_cards()
            .into_iter()
            .find(|card| card.category == category)
    }
}
