//! Hard-fact propagation across the envelope, every hand, and the ledger.
//!
//! Every certainty is applied through one of the `assign` / `exclude` /
//! `confirm_envelope` / `rule_out_envelope` / `place_face_up` entry points,
//! which update all three structures at once and queue the cards, players and
//! categories whose consistency has to be re-checked. [`ConstraintPropagator::run`]
//! drains that queue until nothing changes.

use super::config::BeliefConfig;
use super::envelope::{EnvelopeEvidence, EnvelopeProbabilityEngine};
use super::ledger::KnownCards;
use super::tracker::PlayerCardTracker;
use crate::error::{ClueError, Conflict};
use crate::model::card::Card;
use crate::model::category::Category;
use crate::model::location::Location;
use crate::model::player::{PlayerId, Roster};
use crate::model::universe::CardUniverse;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Card(Card),
    Category(Category),
    Player(PlayerId),
}

/// Counters for one propagation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Hard facts that were new when applied.
    pub facts_added: usize,
    /// Queue items examined.
    pub checks: usize,
}

pub struct ConstraintPropagator<'a> {
    universe: &'a CardUniverse,
    roster: &'a Roster,
    envelope: &'a mut EnvelopeProbabilityEngine,
    tracker: &'a mut PlayerCardTracker,
    ledger: &'a mut KnownCards,
    queue: VecDeque<Pending>,
    stats: PropagationStats,
}

impl<'a> ConstraintPropagator<'a> {
    pub fn new(
        universe: &'a CardUniverse,
        roster: &'a Roster,
        envelope: &'a mut EnvelopeProbabilityEngine,
        tracker: &'a mut PlayerCardTracker,
        ledger: &'a mut KnownCards,
    ) -> Self {
        Self {
            universe,
            roster,
            envelope,
            tracker,
            ledger,
            queue: VecDeque::new(),
            stats: PropagationStats::default(),
        }
    }

    /// Queues every card, category and player for a full consistency sweep.
    pub fn enqueue_all(&mut self) {
        for card in self.universe.cards() {
            self.enqueue(Pending::Card(card));
        }
        for category in Category::ALL {
            self.enqueue(Pending::Category(category));
        }
        for player in self.roster.ids() {
            self.enqueue(Pending::Player(player));
        }
    }

    fn enqueue(&mut self, item: Pending) {
        if !self.queue.contains(&item) {
            self.queue.push_back(item);
        }
    }

    /// Proven location of `card`, including facts applied in this pass.
    pub fn location(&self, card: Card) -> Option<Location> {
        self.ledger.location(card)
    }

    fn note_fact(&mut self) {
        self.stats.facts_added += 1;
    }

    /// `player` is proven to hold `card`.
    pub fn assign(&mut self, player: PlayerId, card: Card) -> Result<bool, ClueError> {
        if self.tracker.has(player, card) {
            return Ok(false);
        }
        if let Some(existing) = self.ledger.location(card) {
            return Err(ClueError::violation(Conflict::TwoLocations {
                card,
                first: existing,
                second: Location::Player(player),
            }));
        }
        if self.envelope.is_confirmed(card) {
            return Err(ClueError::violation(Conflict::TwoLocations {
                card,
                first: Location::Envelope,
                second: Location::Player(player),
            }));
        }

        self.tracker.record_shown_card(player, card)?;
        self.ledger.record(card, Location::Player(player))?;
        self.note_fact();
        debug!(
            target: "clue_core::belief",
            card = %self.universe.name(card),
            holder = %self.roster.name(player),
            "card located in hand"
        );

        self.rule_out_envelope(card)?;
        for other in self.roster.ids() {
            if other != player {
                self.exclude(other, card)?;
            }
        }
        self.enqueue(Pending::Player(player));
        self.enqueue(Pending::Card(card));
        Ok(true)
    }

    /// `player` is proven not to hold `card`. The player's share of the card
    /// is handed to the remaining locations.
    pub fn exclude(&mut self, player: PlayerId, card: Card) -> Result<bool, ClueError> {
        if self.tracker.lacks(player, card) {
            return Ok(false);
        }
        if self.tracker.has(player, card) {
            return Err(ClueError::violation(Conflict::HeldAndExcluded { player, card }));
        }

        let envelope = &*self.envelope;
        let hand_mass = self
            .tracker
            .probability(player, card, |other| envelope.probability(other));
        self.tracker.record_lacks(player, card)?;
        self.envelope
            .apply_evidence(&EnvelopeEvidence::HandExclusion { card, hand_mass })?;
        self.note_fact();
        debug!(
            target: "clue_core::belief",
            card = %self.universe.name(card),
            player = %self.roster.name(player),
            hand_mass,
            "card excluded from hand"
        );

        self.enqueue(Pending::Card(card));
        self.enqueue(Pending::Category(card.category));
        self.enqueue(Pending::Player(player));
        Ok(true)
    }

    /// `card` is proven to be the envelope card of its category.
    pub fn confirm_envelope(&mut self, card: Card) -> Result<bool, ClueError> {
        if self.envelope.is_confirmed(card) {
            return Ok(false);
        }
        if let Some(existing) = self.ledger.location(card) {
            return Err(ClueError::violation(Conflict::TwoLocations {
                card,
                first: existing,
                second: Location::Envelope,
            }));
        }
        if let Some(holder) = self.tracker.holder(card) {
            return Err(ClueError::violation(Conflict::TwoLocations {
                card,
                first: Location::Player(holder),
                second: Location::Envelope,
            }));
        }

        self.envelope
            .apply_evidence(&EnvelopeEvidence::InEnvelope(card))?;
        self.ledger.record(card, Location::Envelope)?;
        self.note_fact();
        debug!(
            target: "clue_core::belief",
            card = %self.universe.name(card),
            "card located in envelope"
        );

        for player in self.roster.ids() {
            self.exclude(player, card)?;
        }
        let siblings: Vec<Card> = self.universe.cards_in(card.category).collect();
        for sibling in siblings {
            self.enqueue(Pending::Card(sibling));
        }
        self.enqueue(Pending::Category(card.category));
        Ok(true)
    }

    /// `card` is proven not to be in the envelope.
    pub fn rule_out_envelope(&mut self, card: Card) -> Result<bool, ClueError> {
        if self.envelope.is_ruled_out(card) {
            return Ok(false);
        }
        self.envelope
            .apply_evidence(&EnvelopeEvidence::NotInEnvelope(card))?;
        self.note_fact();
        debug!(
            target: "clue_core::belief",
            card = %self.universe.name(card),
            "card ruled out of envelope"
        );
        self.enqueue(Pending::Card(card));
        self.enqueue(Pending::Category(card.category));
        Ok(true)
    }

    /// `card` lies face up on the table: nobody holds it and it is not sealed.
    pub fn place_face_up(&mut self, card: Card) -> Result<bool, ClueError> {
        if self.tracker.holder(card).is_some() || self.envelope.is_confirmed(card) {
            let first = self
                .tracker
                .holder(card)
                .map(Location::Player)
                .unwrap_or(Location::Envelope);
            return Err(ClueError::violation(Conflict::TwoLocations {
                card,
                first,
                second: Location::FaceUp,
            }));
        }
        if !self.ledger.record(card, Location::FaceUp)? {
            return Ok(false);
        }
        self.note_fact();
        self.rule_out_envelope(card)?;
        for player in self.roster.ids() {
            self.exclude(player, card)?;
        }
        Ok(true)
    }

    /// Soft update for a refutation whose shown card was not observed.
    ///
    /// Leaves the refutation clause for `refuter` behind. Does nothing when the
    /// refuter is already known to hold one of the cards.
    pub fn record_unseen_refutation(
        &mut self,
        refuter: PlayerId,
        cards: [Card; 3],
        config: &BeliefConfig,
    ) -> Result<bool, ClueError> {
        if cards.iter().any(|card| self.tracker.has(refuter, *card)) {
            return Ok(false);
        }
        self.envelope
            .apply_evidence(&EnvelopeEvidence::AmbiguousRefutation {
                cards,
                factor: config.decrease_factor,
            })?;
        self.tracker
            .record_refutation(refuter, cards, config.refuter_weight);
        debug!(
            target: "clue_core::belief",
            refuter = %self.roster.name(refuter),
            factor = config.decrease_factor,
            "unseen refutation applied"
        );
        self.enqueue(Pending::Player(refuter));
        Ok(true)
    }

    /// Drains the queue until a fixed point is reached.
    pub fn run(&mut self) -> Result<PropagationStats, ClueError> {
        while let Some(item) = self.queue.pop_front() {
            self.stats.checks += 1;
            match item {
                Pending::Card(card) => self.settle_card(card)?,
                Pending::Category(category) => self.settle_category(category)?,
                Pending::Player(player) => self.settle_player(player)?,
            }
        }
        Ok(self.stats)
    }

    /// A card with a single location left is placed there.
    fn settle_card(&mut self, card: Card) -> Result<(), ClueError> {
        if self.ledger.contains(card) {
            return Ok(());
        }
        let envelope_open = !self.envelope.is_ruled_out(card);
        let open_players: Vec<PlayerId> = self
            .roster
            .ids()
            .filter(|player| !self.tracker.lacks(*player, card))
            .collect();

        match (envelope_open, open_players.as_slice()) {
            (false, []) => Err(ClueError::violation(Conflict::NoLocation { card })),
            (true, []) => self.confirm_envelope(card).map(|_| ()),
            (false, [player]) => self.assign(*player, card).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// A category with a single envelope candidate left has found its card.
    fn settle_category(&mut self, category: Category) -> Result<(), ClueError> {
        if self.envelope.is_resolved(category) {
            return Ok(());
        }
        match self.envelope.candidates(category).as_slice() {
            [] => Err(ClueError::DegenerateDistribution { category }),
            [only] => self.confirm_envelope(*only).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Hand-size bookkeeping and refutation clauses for one player.
    fn settle_player(&mut self, player: PlayerId) -> Result<(), ClueError> {
        let hand_size = self.roster.hand_size(player);
        let known = self.tracker.known_has(player).len();
        if known > hand_size {
            return Err(ClueError::violation(Conflict::HandOverflow {
                player,
                hand_size,
                known,
            }));
        }
        let possible = self.tracker.possible_count(player);
        if possible < hand_size {
            return Err(ClueError::violation(Conflict::HandUnderflow {
                player,
                hand_size,
                possible,
            }));
        }

        let open: Vec<Card> = self
            .universe
            .cards()
            .filter(|card| !self.tracker.lacks(player, *card) && !self.tracker.has(player, *card))
            .collect();
        if known == hand_size {
            for card in open {
                self.exclude(player, card)?;
            }
        } else if possible == hand_size {
            for card in open {
                self.assign(player, card)?;
            }
        }

        let clauses: Vec<[Card; 3]> = self.tracker.clauses_for(player).collect();
        for cards in clauses {
            if cards.iter().any(|card| self.tracker.has(player, *card)) {
                continue;
            }
            let candidates: Vec<Card> = cards
                .iter()
                .copied()
                .filter(|card| !self.tracker.lacks(player, *card))
                .collect();
            match candidates.as_slice() {
                [] => {
                    return Err(ClueError::violation(Conflict::UnsatisfiableRefutation {
                        player,
                        cards,
                    }));
                }
                [only] => {
                    self.assign(player, *only)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}
