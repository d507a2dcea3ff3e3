use super::envelope::EnvelopeProbabilityEngine;
use super::tracker::PlayerCardTracker;
use crate::model::category::Category;
use crate::model::player::Roster;
use serde::{Deserialize, Serialize};

/// Remaining uncertainty, in nats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefMetrics {
    pub entropy_per_category: [f64; 3],
    pub entropy_per_player: Vec<f64>,
}

impl BeliefMetrics {
    pub fn capture(
        envelope: &EnvelopeProbabilityEngine,
        tracker: &PlayerCardTracker,
        roster: &Roster,
    ) -> Self {
        let entropy_per_category = Category::ALL.map(|category| {
            envelope
                .distribution(category)
                .iter()
                .map(|(_, prob)| -xlogx(*prob))
                .sum::<f64>()
        });

        let universe = envelope.universe();
        let matrix = tracker.hand_probabilities(|card| envelope.probability(card));
        let entropy_per_player = roster
            .ids()
            .map(|player| {
                universe
                    .cards()
                    .map(|card| {
                        let prob = tracker.probability_in(&matrix, player, card);
                        -xlogx(prob) - xlogx(1.0 - prob)
                    })
                    .sum::<f64>()
            })
            .collect();

        Self {
            entropy_per_category,
            entropy_per_player,
        }
    }

    pub fn envelope_entropy(&self) -> f64 {
        self.entropy_per_category.iter().sum()
    }
}

fn xlogx(value: f64) -> f64 {
    if value > 0.0 { value * value.ln() } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::envelope::EnvelopeEvidence;
    use crate::model::player::PlayerId;
    use crate::model::universe::CardUniverse;
    use std::sync::Arc;

    #[test]
    fn uniform_prior_has_maximal_category_entropy() {
        let universe = Arc::new(CardUniverse::standard());
        let roster = Roster::new(
            vec![("A".to_string(), 9), ("B".to_string(), 9)],
            PlayerId(0),
        )
        .unwrap();
        let envelope = EnvelopeProbabilityEngine::new(Arc::clone(&universe));
        let tracker = PlayerCardTracker::new(Arc::clone(&universe), &roster);
        let metrics = BeliefMetrics::capture(&envelope, &tracker, &roster);
        assert!((metrics.entropy_per_category[0] - 6f64.ln()).abs() < 1e-12);
        assert!((metrics.entropy_per_category[2] - 9f64.ln()).abs() < 1e-12);
        assert_eq!(metrics.entropy_per_player.len(), 2);
    }

    #[test]
    fn certainty_removes_category_entropy() {
        let universe = Arc::new(CardUniverse::standard());
        let roster = Roster::new(
            vec![("A".to_string(), 9), ("B".to_string(), 9)],
            PlayerId(0),
        )
        .unwrap();
        let mut envelope = EnvelopeProbabilityEngine::new(Arc::clone(&universe));
        let tracker = PlayerCardTracker::new(Arc::clone(&universe), &roster);
        let before = BeliefMetrics::capture(&envelope, &tracker, &roster);
        envelope
            .apply_evidence(&EnvelopeEvidence::InEnvelope(universe.card("Hall").unwrap()))
            .unwrap();
        let after = BeliefMetrics::capture(&envelope, &tracker, &roster);
        assert_eq!(after.entropy_per_category[2], 0.0);
        assert!(after.envelope_entropy() < before.envelope_entropy());
    }
}
