use super::event::{Outcome, RecordedSuggestion, SuggestionEvent};
use super::snapshot::GameSnapshot;
use crate::belief::{
    BeliefConfig, BeliefMetrics, CategoryDistribution, ConstraintPropagator,
    EnvelopeProbabilityEngine, KnownCards, PlayerCardTracker, PlayerHandBelief, PropagationStats,
};
use crate::error::ClueError;
use crate::model::card::Card;
use crate::model::category::Category;
use crate::model::location::Location;
use crate::model::player::{PlayerId, Roster};
use crate::model::universe::CardUniverse;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

/// Everything known at the start of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameSetup {
    /// Player names in turn order.
    pub players: Vec<String>,
    pub hand_sizes: BTreeMap<String, usize>,
    /// Seat of the player whose hand is `my_hand`.
    pub local_player: usize,
    pub my_hand: Vec<Card>,
    /// Cards dealt face up for everyone to see.
    pub face_up: Vec<Card>,
}

impl GameSetup {
    /// Deals every non-envelope card out, earlier seats taking the remainder.
    pub fn even_deal(players: Vec<String>, universe: &CardUniverse) -> Self {
        let dealt = universe.len().saturating_sub(3);
        let count = players.len().max(1);
        let hand_sizes = players
            .iter()
            .enumerate()
            .map(|(seat, name)| {
                let extra = usize::from(seat < dealt % count);
                (name.clone(), dealt / count + extra)
            })
            .collect();
        Self {
            players,
            hand_sizes,
            ..Self::default()
        }
    }

    pub fn with_local_hand(mut self, local_player: usize, my_hand: Vec<Card>) -> Self {
        self.local_player = local_player;
        self.my_hand = my_hand;
        self
    }

    pub fn with_face_up(mut self, face_up: Vec<Card>) -> Self {
        self.face_up = face_up;
        self
    }
}

/// The three envelope cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Solution {
    pub suspect: Card,
    pub weapon: Card,
    pub room: Card,
}

impl Solution {
    pub fn cards(&self) -> [Card; 3] {
        [self.suspect, self.weapon, self.room]
    }

    fn from_categories(cards: [Card; 3]) -> Self {
        let [suspect, weapon, room] = cards;
        Self {
            suspect,
            weapon,
            room,
        }
    }
}

#[derive(Debug, Clone)]
struct BeliefState {
    envelope: EnvelopeProbabilityEngine,
    tracker: PlayerCardTracker,
    ledger: KnownCards,
}

impl BeliefState {
    fn propagator<'a>(
        &'a mut self,
        universe: &'a CardUniverse,
        roster: &'a Roster,
    ) -> ConstraintPropagator<'a> {
        ConstraintPropagator::new(
            universe,
            roster,
            &mut self.envelope,
            &mut self.tracker,
            &mut self.ledger,
        )
    }
}

/// One game session: the belief state plus the suggestion history that
/// produced it.
#[derive(Debug, Clone)]
pub struct ClueGameManager {
    universe: Arc<CardUniverse>,
    roster: Roster,
    config: BeliefConfig,
    state: BeliefState,
    history: Vec<RecordedSuggestion>,
}

impl ClueGameManager {
    /// Standard deck and default factors. The first player listed is the
    /// local user holding `my_hand`.
    pub fn new_game(
        players: Vec<String>,
        hand_sizes: BTreeMap<String, usize>,
        my_hand: Vec<Card>,
    ) -> Result<Self, ClueError> {
        let setup = GameSetup {
            players,
            hand_sizes,
            local_player: 0,
            my_hand,
            face_up: Vec::new(),
        };
        Self::from_setup(
            Arc::new(CardUniverse::standard()),
            setup,
            BeliefConfig::default(),
        )
    }

    pub fn from_setup(
        universe: Arc<CardUniverse>,
        setup: GameSetup,
        config: BeliefConfig,
    ) -> Result<Self, ClueError> {
        config.validate()?;
        let roster = build_roster(&setup)?;
        validate_deal(&universe, &roster, &setup)?;

        let mut state = BeliefState {
            envelope: EnvelopeProbabilityEngine::new(Arc::clone(&universe)),
            tracker: PlayerCardTracker::new(Arc::clone(&universe), &roster),
            ledger: KnownCards::new(),
        };
        let stats = {
            let mut propagator = state.propagator(&universe, &roster);
            for card in &setup.face_up {
                propagator.place_face_up(*card)?;
            }
            for card in &setup.my_hand {
                propagator.assign(roster.local(), *card)?;
            }
            propagator.enqueue_all();
            propagator.run()?
        };

        info!(
            target: "clue_core::game",
            players = roster.len(),
            local = %roster.name(roster.local()),
            hand = setup.my_hand.len(),
            face_up = setup.face_up.len(),
            facts = stats.facts_added,
            "game created"
        );

        Ok(Self {
            universe,
            roster,
            config,
            state,
            history: Vec::new(),
        })
    }

    /// Validates and applies one suggestion.
    ///
    /// Hard facts go first, then the soft update for an unseen refutation,
    /// then propagation to a fixed point. The result is committed only when
    /// every step succeeds.
    pub fn record_suggestion(&mut self, event: SuggestionEvent) -> Result<GameSnapshot, ClueError> {
        let sequence = self.history.len() as u32 + 1;
        let result = event
            .classify(&self.universe, &self.roster)
            .and_then(|outcome| {
                let mut next = self.state.clone();
                let stats = apply_event(
                    &mut next,
                    &self.universe,
                    &self.roster,
                    &self.config,
                    &event,
                    outcome,
                )?;
                Ok((outcome, next, stats))
            });

        let (outcome, next, stats) = match result {
            Ok(applied) => applied,
            Err(err) => {
                warn!(
                    target: "clue_core::game",
                    sequence,
                    suggester = %self.roster.name(event.suggester),
                    error = %err.describe(&self.universe, &self.roster),
                    "suggestion rejected"
                );
                return Err(err);
            }
        };

        self.state = next;
        self.history.push(RecordedSuggestion {
            sequence,
            recorded_at: SystemTime::now(),
            event,
            outcome,
        });

        let metrics = self.metrics();
        info!(
            target: "clue_core::game",
            sequence,
            outcome = ?outcome,
            facts = stats.facts_added,
            checks = stats.checks,
            known = self.state.ledger.len(),
            envelope_entropy = metrics.envelope_entropy(),
            "suggestion recorded"
        );
        if let Some(solution) = self.envelope_solution() {
            info!(
                target: "clue_core::game",
                suspect = %self.universe.name(solution.suspect),
                weapon = %self.universe.name(solution.weapon),
                room = %self.universe.name(solution.room),
                solved = self.is_solved(),
                "envelope identified"
            );
        }

        Ok(self.snapshot())
    }

    pub fn universe(&self) -> &CardUniverse {
        &self.universe
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn config(&self) -> &BeliefConfig {
        &self.config
    }

    pub fn envelope_distribution(&self) -> [CategoryDistribution; 3] {
        self.state.envelope.distributions()
    }

    pub fn category_distribution(&self, category: Category) -> CategoryDistribution {
        self.state.envelope.distribution(category)
    }

    pub fn envelope_probability(&self, card: Card) -> f64 {
        self.state.envelope.probability(card)
    }

    pub fn player_probability(&self, player: PlayerId, card: Card) -> Result<f64, ClueError> {
        self.require_seated(player)?;
        Ok(self
            .state
            .tracker
            .probability(player, card, |other| self.envelope_probability(other)))
    }

    pub fn player_belief(&self, player: PlayerId) -> Result<PlayerHandBelief, ClueError> {
        self.require_seated(player)?;
        Ok(self
            .state
            .tracker
            .belief(player, |card| self.envelope_probability(card)))
    }

    /// The `n` cards `player` most likely holds, highest first.
    pub fn most_likely_cards(
        &self,
        player: PlayerId,
        n: usize,
    ) -> Result<Vec<(Card, f64)>, ClueError> {
        Ok(self.player_belief(player)?.most_likely_cards(n))
    }

    /// Cards `player` holds with probability at least `threshold`.
    pub fn high_probability_cards(
        &self,
        player: PlayerId,
        threshold: f64,
    ) -> Result<Vec<(Card, f64)>, ClueError> {
        Ok(self.player_belief(player)?.high_probability_cards(threshold))
    }

    fn require_seated(&self, player: PlayerId) -> Result<(), ClueError> {
        if self.roster.contains(player) {
            Ok(())
        } else {
            Err(ClueError::UnknownPlayer {
                name: player.to_string(),
            })
        }
    }

    /// Envelope probability plus every hand's probability, plus one for a
    /// face-up card. Always one for a consistent state.
    pub fn total_mass(&self, card: Card) -> f64 {
        if self.state.ledger.location(card) == Some(Location::FaceUp) {
            return 1.0;
        }
        let tracker = &self.state.tracker;
        let matrix = tracker.hand_probabilities(|other| self.envelope_probability(other));
        self.envelope_probability(card)
            + self
                .roster
                .ids()
                .map(|player| tracker.probability_in(&matrix, player, card))
                .sum::<f64>()
    }

    pub fn known_cards(&self) -> &KnownCards {
        &self.state.ledger
    }

    pub fn suggestions(&self) -> &[RecordedSuggestion] {
        &self.history
    }

    /// Unseen refutations by `player` that involved `card`.
    pub fn refutation_count(&self, player: PlayerId, card: Card) -> u32 {
        self.state.tracker.refutation_count(player, card)
    }

    pub fn refutation_clauses(&self, player: PlayerId) -> Vec<[Card; 3]> {
        self.state.tracker.clauses_for(player).collect()
    }

    /// Every card located and exactly one per category in the envelope.
    pub fn is_solved(&self) -> bool {
        self.state.ledger.len() == self.universe.len()
            && self.state.ledger.envelope_cards().len() == Category::ALL.len()
    }

    pub fn solution(&self) -> Result<Solution, ClueError> {
        if !self.is_solved() {
            return Err(ClueError::NotSolved);
        }
        self.envelope_solution().ok_or(ClueError::NotSolved)
    }

    /// The envelope once every category is confirmed, even if some hands are
    /// still open.
    pub fn envelope_solution(&self) -> Option<Solution> {
        let suspect = self.state.envelope.confirmed(Category::Suspect)?;
        let weapon = self.state.envelope.confirmed(Category::Weapon)?;
        let room = self.state.envelope.confirmed(Category::Room)?;
        Some(Solution::from_categories([suspect, weapon, room]))
    }

    /// Highest-probability card per category, with the product of their
    /// probabilities.
    pub fn most_likely_solution(&self) -> Option<(Solution, f64)> {
        let [suspect, weapon, room] = self.envelope_distribution();
        let (suspect, p_suspect) = suspect.most_likely()?;
        let (weapon, p_weapon) = weapon.most_likely()?;
        let (room, p_room) = room.most_likely()?;
        Some((
            Solution::from_categories([suspect, weapon, room]),
            p_suspect * p_weapon * p_room,
        ))
    }

    /// Whether every category's leading card is above `threshold`.
    pub fn is_solution_confident(&self, threshold: f64) -> bool {
        self.envelope_distribution().iter().all(|distribution| {
            distribution
                .most_likely()
                .is_some_and(|(_, prob)| prob > threshold)
        })
    }

    pub fn metrics(&self) -> BeliefMetrics {
        BeliefMetrics::capture(&self.state.envelope, &self.state.tracker, &self.roster)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(self)
    }
}

fn build_roster(setup: &GameSetup) -> Result<Roster, ClueError> {
    let seated: BTreeSet<&str> = setup.players.iter().map(String::as_str).collect();
    if let Some(stray) = setup
        .hand_sizes
        .keys()
        .find(|name| !seated.contains(name.as_str()))
    {
        return Err(ClueError::InvalidSetup {
            message: format!("hand size given for '{stray}', who is not seated"),
        });
    }

    let seats = setup
        .players
        .iter()
        .map(|name| {
            setup
                .hand_sizes
                .get(name)
                .map(|size| (name.clone(), *size))
                .ok_or_else(|| ClueError::InvalidSetup {
                    message: format!("no hand size given for '{name}'"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let local = u8::try_from(setup.local_player).map_err(|_| ClueError::InvalidSetup {
        message: format!("local player seat {} is out of range", setup.local_player),
    })?;
    Roster::new(seats, PlayerId(local))
}

fn validate_deal(
    universe: &CardUniverse,
    roster: &Roster,
    setup: &GameSetup,
) -> Result<(), ClueError> {
    let expected = universe.len();
    let dealt = roster.total_hand_cards() + setup.face_up.len() + Category::ALL.len();
    if dealt != expected {
        return Err(ClueError::InvalidSetup {
            message: format!(
                "hands ({}) plus face-up cards ({}) plus the envelope (3) must cover all {expected} cards, got {dealt}",
                roster.total_hand_cards(),
                setup.face_up.len(),
            ),
        });
    }

    let mut seen = BTreeSet::new();
    for card in setup.my_hand.iter().chain(&setup.face_up) {
        if !universe.contains(*card) {
            return Err(ClueError::InvalidSetup {
                message: format!("{card} is not part of this deck"),
            });
        }
        if !seen.insert(*card) {
            return Err(ClueError::InvalidSetup {
                message: format!("{} is listed twice", universe.name(*card)),
            });
        }
    }

    let hand_size = roster.hand_size(roster.local());
    if setup.my_hand.len() > hand_size {
        return Err(ClueError::InvalidSetup {
            message: format!(
                "{} holds {hand_size} cards but {} were listed",
                roster.name(roster.local()),
                setup.my_hand.len()
            ),
        });
    }
    Ok(())
}

fn apply_event(
    state: &mut BeliefState,
    universe: &CardUniverse,
    roster: &Roster,
    config: &BeliefConfig,
    event: &SuggestionEvent,
    outcome: Outcome,
) -> Result<PropagationStats, ClueError> {
    let mut propagator = state.propagator(universe, roster);

    for passer in event.passers() {
        for card in event.cards {
            propagator.exclude(passer, card)?;
        }
    }
    if let Outcome::KnownCardShown { refuter, card } = outcome {
        propagator.assign(refuter, card)?;
    }
    propagator.run()?;

    match outcome {
        Outcome::NoRefutation => {
            for card in event.cards {
                let explained = match propagator.location(card) {
                    Some(Location::FaceUp) => true,
                    Some(Location::Player(holder)) => holder == event.suggester,
                    _ => false,
                };
                if !explained {
                    propagator.confirm_envelope(card)?;
                }
            }
        }
        Outcome::AmbiguousRefutation { refuter } => {
            propagator.record_unseen_refutation(refuter, event.cards, config)?;
        }
        Outcome::KnownCardShown { .. } => {}
    }
    propagator.run()
}
