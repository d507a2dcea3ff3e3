//! Per-category probability that each card is the one sealed in the envelope.

use super::config::TOLERANCE;
use crate::error::{ClueError, Conflict};
use crate::model::card::Card;
use crate::model::category::Category;
use crate::model::universe::CardUniverse;
use std::sync::Arc;

/// Evidence the envelope model knows how to absorb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeEvidence {
    /// The card was seen outside the envelope.
    NotInEnvelope(Card),
    /// The card is proven to be the envelope card of its category.
    InEnvelope(Card),
    /// Nobody could refute the suggestion: all three cards are the envelope.
    NoRefutation([Card; 3]),
    /// Someone refuted, but the shown card was not observed.
    AmbiguousRefutation { cards: [Card; 3], factor: f64 },
    /// A player is proven not to hold `card`; `hand_mass` is the probability
    /// that player held it before the fact was recorded.
    HandExclusion { card: Card, hand_mass: f64 },
}

/// Snapshot of one category's envelope distribution, in universe order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDistribution {
    pub category: Category,
    pub entries: Vec<(Card, f64)>,
}

impl CategoryDistribution {
    pub fn probability(&self, card: Card) -> f64 {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == card)
            .map(|(_, prob)| *prob)
            .unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, prob)| prob).sum()
    }

    /// Highest-probability card; ties resolve to the earliest card.
    pub fn most_likely(&self) -> Option<(Card, f64)> {
        self.entries.iter().copied().fold(None, |best, entry| match best {
            Some((_, prob)) if prob >= entry.1 => best,
            _ => Some(entry),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Card, f64)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone)]
pub struct EnvelopeProbabilityEngine {
    universe: Arc<CardUniverse>,
    probs: Vec<f64>,
    ruled_out: Vec<bool>,
    confirmed: [Option<Card>; 3],
}

impl EnvelopeProbabilityEngine {
    /// Uniform prior within every category.
    pub fn new(universe: Arc<CardUniverse>) -> Self {
        let probs = universe
            .cards()
            .map(|card| 1.0 / universe.category_len(card.category) as f64)
            .collect();
        let ruled_out = vec![false; universe.len()];
        Self {
            universe,
            probs,
            ruled_out,
            confirmed: [None; 3],
        }
    }

    pub fn universe(&self) -> &CardUniverse {
        &self.universe
    }

    pub fn probability(&self, card: Card) -> f64 {
        self.probs[self.universe.id(card)]
    }

    pub fn is_ruled_out(&self, card: Card) -> bool {
        self.ruled_out[self.universe.id(card)]
    }

    /// The envelope card of `category`, once proven.
    pub fn confirmed(&self, category: Category) -> Option<Card> {
        self.confirmed[category.index()]
    }

    pub fn is_confirmed(&self, card: Card) -> bool {
        self.confirmed(card.category) == Some(card)
    }

    pub fn is_resolved(&self, category: Category) -> bool {
        self.confirmed(category).is_some()
    }

    /// Cards of `category` that have not been ruled out.
    pub fn candidates(&self, category: Category) -> Vec<Card> {
        self.universe
            .cards_in(category)
            .filter(|card| !self.is_ruled_out(*card))
            .collect()
    }

    pub fn distribution(&self, category: Category) -> CategoryDistribution {
        CategoryDistribution {
            category,
            entries: self
                .universe
                .cards_in(category)
                .map(|card| (card, self.probability(card)))
                .collect(),
        }
    }

    pub fn distributions(&self) -> [CategoryDistribution; 3] {
        Category::ALL.map(|category| self.distribution(category))
    }

    /// Applies one piece of evidence and returns the categories it touched.
    ///
    /// On error the engine is left exactly as it was.
    pub fn apply_evidence(
        &mut self,
        evidence: &EnvelopeEvidence,
    ) -> Result<Vec<CategoryDistribution>, ClueError> {
        let touched = match *evidence {
            EnvelopeEvidence::NotInEnvelope(card) => self.rule_out(card)?,
            EnvelopeEvidence::InEnvelope(card) => self.confirm(card)?,
            EnvelopeEvidence::NoRefutation(cards) => {
                let mut staged = self.clone();
                let mut touched = Vec::new();
                for card in cards {
                    for category in staged.confirm(card)? {
                        if !touched.contains(&category) {
                            touched.push(category);
                        }
                    }
                }
                *self = staged;
                touched
            }
            EnvelopeEvidence::AmbiguousRefutation { cards, factor } => {
                self.discount(cards, factor)?
            }
            EnvelopeEvidence::HandExclusion { card, hand_mass } => {
                self.condition_on_exclusion(card, hand_mass)?
            }
        };
        Ok(touched
            .into_iter()
            .map(|category| self.distribution(category))
            .collect())
    }

    fn rule_out(&mut self, card: Card) -> Result<Vec<Category>, ClueError> {
        let id = self.universe.id(card);
        if self.ruled_out[id] {
            return Ok(Vec::new());
        }
        let category = card.category;
        if self.is_confirmed(card) {
            return Err(ClueError::violation(Conflict::EnvelopeConfirmed { card }));
        }
        let others: f64 = self
            .universe
            .cards_in(category)
            .filter(|other| *other != card && !self.is_ruled_out(*other))
            .map(|other| self.probability(other))
            .sum();
        if others <= 0.0 || !others.is_finite() {
            return Err(ClueError::DegenerateDistribution { category });
        }

        self.ruled_out[id] = true;
        self.probs[id] = 0.0;
        self.renormalize(category)?;
        Ok(vec![category])
    }

    fn confirm(&mut self, card: Card) -> Result<Vec<Category>, ClueError> {
        let category = card.category;
        match self.confirmed(category) {
            Some(existing) if existing == card => return Ok(Vec::new()),
            Some(existing) => {
                return Err(ClueError::violation(Conflict::EnvelopeCategoryTaken {
                    existing,
                    incoming: card,
                }));
            }
            None => {}
        }
        if self.is_ruled_out(card) {
            return Err(ClueError::violation(Conflict::EnvelopeRuledOut { card }));
        }

        for other in self.universe.cards_in(category) {
            let id = self.universe.id(other);
            if other == card {
                self.probs[id] = 1.0;
            } else {
                self.probs[id] = 0.0;
                self.ruled_out[id] = true;
            }
        }
        self.confirmed[category.index()] = Some(card);
        Ok(vec![category])
    }

    fn discount(&mut self, cards: [Card; 3], factor: f64) -> Result<Vec<Category>, ClueError> {
        if !(factor > 0.0 && factor < 1.0) {
            return Err(ClueError::InvalidConfig {
                field: "decrease_factor".to_string(),
                message: format!("must lie in (0, 1), got {factor}"),
            });
        }

        let mut touched = Vec::new();
        for card in cards {
            if self.is_resolved(card.category) || self.is_ruled_out(card) {
                continue;
            }
            let id = self.universe.id(card);
            self.probs[id] *= factor;
            if !touched.contains(&card.category) {
                touched.push(card.category);
            }
        }
        for category in &touched {
            self.renormalize(*category)?;
        }
        Ok(touched)
    }

    fn condition_on_exclusion(
        &mut self,
        card: Card,
        hand_mass: f64,
    ) -> Result<Vec<Category>, ClueError> {
        if self.is_resolved(card.category) || self.is_ruled_out(card) {
            return Ok(Vec::new());
        }
        let remaining = 1.0 - hand_mass;
        if hand_mass <= 0.0 || remaining <= TOLERANCE {
            return Ok(Vec::new());
        }

        let id = self.universe.id(card);
        self.probs[id] = (self.probs[id] / remaining).min(1.0);
        self.renormalize(card.category)?;
        Ok(vec![card.category])
    }

    /// Divides the category by its sum. Skipped when the sum is already one.
    fn renormalize(&mut self, category: Category) -> Result<(), ClueError> {
        let ids: Vec<usize> = self
            .universe
            .cards_in(category)
            .map(|card| self.universe.id(card))
            .collect();
        let total: f64 = ids.iter().map(|id| self.probs[*id]).sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(ClueError::DegenerateDistribution { category });
        }
        if (total - 1.0).abs() <= TOLERANCE {
            return Ok(());
        }
        for id in ids {
            self.probs[id] /= total;
        }
        Ok(())
    }
}
