//! Per-player hand beliefs: hard known-has / known-not-has sets plus the soft
//! weights that share a card's non-envelope mass among the players.

use super::config::TOLERANCE;
use crate::error::{ClueError, Conflict};
use crate::model::card::Card;
use crate::model::location::Location;
use crate::model::player::{PlayerId, Roster};
use crate::model::universe::CardUniverse;
use std::collections::BTreeSet;
use std::sync::Arc;

const MAX_FIT_ROUNDS: usize = 500;

/// "`player` holds at least one of `cards`", left behind by a refutation whose
/// shown card was not observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefutationClause {
    pub player: PlayerId,
    pub cards: [Card; 3],
}

/// Read-only view of one player's hand.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerHandBelief {
    pub player: PlayerId,
    pub probabilities: Vec<(Card, f64)>,
    pub known_has: BTreeSet<Card>,
    pub known_not_has: BTreeSet<Card>,
}

impl PlayerHandBelief {
    pub fn probability(&self, card: Card) -> f64 {
        self.probabilities
            .iter()
            .find(|(candidate, _)| *candidate == card)
            .map(|(_, prob)| *prob)
            .unwrap_or(0.0)
    }

    /// Expected number of cards in the hand under the current beliefs.
    pub fn expected_cards(&self) -> f64 {
        self.probabilities.iter().map(|(_, prob)| prob).sum()
    }

    /// The `n` cards this player most likely holds, highest first. Ties keep
    /// deck order.
    pub fn most_likely_cards(&self, n: usize) -> Vec<(Card, f64)> {
        let mut ranked = self.probabilities.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// Cards held with probability at least `threshold`, highest first.
    pub fn high_probability_cards(&self, threshold: f64) -> Vec<(Card, f64)> {
        let mut ranked: Vec<(Card, f64)> = self
            .probabilities
            .iter()
            .copied()
            .filter(|(_, prob)| *prob >= threshold)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

#[derive(Debug, Clone)]
pub struct PlayerCardTracker {
    universe: Arc<CardUniverse>,
    hand_sizes: Vec<usize>,
    weights: Vec<Vec<f64>>,
    known_has: Vec<BTreeSet<Card>>,
    known_not_has: Vec<BTreeSet<Card>>,
    clauses: Vec<RefutationClause>,
    refutations: Vec<Vec<u32>>,
}

impl PlayerCardTracker {
    /// Seeds every player's relative weight with their hand size, so a card's
    /// non-envelope mass starts out shared in proportion to hand sizes.
    pub fn new(universe: Arc<CardUniverse>, roster: &Roster) -> Self {
        let cards = universe.len();
        let weights = roster
            .ids()
            .map(|player| vec![roster.hand_size(player) as f64; cards])
            .collect();
        Self {
            universe,
            hand_sizes: roster.ids().map(|player| roster.hand_size(player)).collect(),
            weights,
            known_has: vec![BTreeSet::new(); roster.len()],
            known_not_has: vec![BTreeSet::new(); roster.len()],
            clauses: Vec::new(),
            refutations: vec![vec![0; cards]; roster.len()],
        }
    }

    pub fn player_count(&self) -> usize {
        self.known_has.len()
    }

    fn players(&self) -> impl Iterator<Item = PlayerId> {
        (0..self.player_count()).map(|index| PlayerId(index as u8))
    }

    pub fn has(&self, player: PlayerId, card: Card) -> bool {
        self.known_has[player.index()].contains(&card)
    }

    pub fn lacks(&self, player: PlayerId, card: Card) -> bool {
        self.known_not_has[player.index()].contains(&card)
    }

    pub fn known_has(&self, player: PlayerId) -> &BTreeSet<Card> {
        &self.known_has[player.index()]
    }

    pub fn known_not_has(&self, player: PlayerId) -> &BTreeSet<Card> {
        &self.known_not_has[player.index()]
    }

    /// The player proven to hold `card`, if any.
    pub fn holder(&self, card: Card) -> Option<PlayerId> {
        self.players().find(|player| self.has(*player, card))
    }

    /// Probability that `player` holds `card`, given each card's current
    /// envelope probability.
    pub fn probability(
        &self,
        player: PlayerId,
        card: Card,
        envelope: impl Fn(Card) -> f64,
    ) -> f64 {
        if self.has(player, card) {
            return 1.0;
        }
        if self.lacks(player, card) || self.holder(card).is_some() {
            return 0.0;
        }
        self.probability_in(&self.hand_probabilities(envelope), player, card)
    }

    /// Reads one entry of a matrix built by [`Self::hand_probabilities`].
    pub fn probability_in(&self, matrix: &[Vec<f64>], player: PlayerId, card: Card) -> f64 {
        matrix
            .get(player.index())
            .and_then(|row| row.get(self.universe.id(card)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Hand probabilities for every seat, indexed by seat then card id.
    ///
    /// Each open card's non-envelope mass is shared out by relative weight,
    /// then any hand expected to hold more open cards than it has free slots
    /// is scaled down and the columns refitted. Columns always end exact;
    /// rows end within [`TOLERANCE`] of their slots whenever the envelope
    /// admits it.
    pub fn hand_probabilities(&self, envelope: impl Fn(Card) -> f64) -> Vec<Vec<f64>> {
        let mut matrix = vec![vec![0.0; self.universe.len()]; self.player_count()];
        let mut open = Vec::new();
        for card in self.universe.cards() {
            let id = self.universe.id(card);
            if let Some(holder) = self.holder(card) {
                matrix[holder.index()][id] = 1.0;
                continue;
            }
            let mut eligible = false;
            for player in self.players() {
                if !self.lacks(player, card) {
                    matrix[player.index()][id] = self.weights[player.index()][id];
                    eligible = true;
                }
            }
            if eligible {
                open.push((id, (1.0 - envelope(card)).max(0.0)));
            }
        }

        let free: Vec<f64> = self
            .players()
            .map(|player| {
                self.hand_sizes[player.index()].saturating_sub(self.known_has(player).len()) as f64
            })
            .collect();

        for _ in 0..MAX_FIT_ROUNDS {
            fit_columns(&mut matrix, &open);
            let mut settled = true;
            for (row, slots) in matrix.iter_mut().zip(&free) {
                let mass: f64 = open.iter().map(|(id, _)| row[*id]).sum();
                if mass > slots + TOLERANCE {
                    let scale = slots / mass;
                    for (id, _) in &open {
                        row[*id] *= scale;
                    }
                    settled = false;
                }
            }
            if settled {
                return matrix;
            }
        }
        fit_columns(&mut matrix, &open);
        matrix
    }

    /// Records that `player` was seen holding `card`.
    ///
    /// Returns `false` when the fact was already known.
    pub fn record_shown_card(&mut self, player: PlayerId, card: Card) -> Result<bool, ClueError> {
        if self.has(player, card) {
            return Ok(false);
        }
        if self.lacks(player, card) {
            return Err(ClueError::violation(Conflict::HeldAndExcluded { player, card }));
        }
        if let Some(other) = self.holder(card) {
            return Err(ClueError::violation(Conflict::TwoLocations {
                card,
                first: Location::Player(other),
                second: Location::Player(player),
            }));
        }
        self.known_has[player.index()].insert(card);
        Ok(true)
    }

    /// Records that `player` cannot hold `card`. Returns `false` when already known.
    pub fn record_lacks(&mut self, player: PlayerId, card: Card) -> Result<bool, ClueError> {
        if self.has(player, card) {
            return Err(ClueError::violation(Conflict::HeldAndExcluded { player, card }));
        }
        Ok(self.known_not_has[player.index()].insert(card))
    }

    /// Records that `player` could not refute a suggestion of `cards`.
    ///
    /// Either every card is recorded or none is. Returns the newly excluded cards.
    pub fn record_could_not_show(
        &mut self,
        player: PlayerId,
        cards: &[Card],
    ) -> Result<Vec<Card>, ClueError> {
        if let Some(card) = cards.iter().copied().find(|card| self.has(player, *card)) {
            return Err(ClueError::violation(Conflict::HeldAndExcluded { player, card }));
        }
        let mut added = Vec::new();
        for card in cards {
            if self.known_not_has[player.index()].insert(*card) {
                added.push(*card);
            }
        }
        Ok(added)
    }

    /// Stores the refutation clause and shifts the refuter's relative weight
    /// toward the suggested cards they might hold.
    pub fn record_refutation(&mut self, player: PlayerId, cards: [Card; 3], weight: f64) {
        let clause = RefutationClause { player, cards };
        if !self.clauses.contains(&clause) {
            self.clauses.push(clause);
        }
        for card in cards {
            let id = self.universe.id(card);
            self.refutations[player.index()][id] += 1;
            if !self.lacks(player, card) && weight > 0.0 {
                self.weights[player.index()][id] *= weight;
            }
        }
    }

    pub fn clauses(&self) -> &[RefutationClause] {
        &self.clauses
    }

    pub fn clauses_for(&self, player: PlayerId) -> impl Iterator<Item = [Card; 3]> + '_ {
        self.clauses
            .iter()
            .filter(move |clause| clause.player == player)
            .map(|clause| clause.cards)
    }

    /// How many unseen refutations by `player` involved `card`.
    pub fn refutation_count(&self, player: PlayerId, card: Card) -> u32 {
        self.refutations[player.index()][self.universe.id(card)]
    }

    /// Number of cards `player` has not been ruled out of holding.
    pub fn possible_count(&self, player: PlayerId) -> usize {
        self.universe.len() - self.known_not_has[player.index()].len()
    }

    pub fn belief(&self, player: PlayerId, envelope: impl Fn(Card) -> f64) -> PlayerHandBelief {
        let matrix = self.hand_probabilities(envelope);
        PlayerHandBelief {
            player,
            probabilities: self
                .universe
                .cards()
                .map(|card| (card, self.probability_in(&matrix, player, card)))
                .collect(),
            known_has: self.known_has[player.index()].clone(),
            known_not_has: self.known_not_has[player.index()].clone(),
        }
    }
}

/// Scales each open column to its non-envelope mass.
fn fit_columns(matrix: &mut [Vec<f64>], open: &[(usize, f64)]) {
    for &(id, target) in open {
        let total: f64 = matrix.iter().map(|row| row[id]).sum();
        if total <= 0.0 {
            continue;
        }
        let scale = target / total;
        for row in matrix.iter_mut() {
            row[id] *= scale;
        }
    }
}
