//! Belief tracking over where every card lies.
//!
//! This module is composed of:
//! - `envelope`: per-category probability that a card is in the case file.
//! - `tracker`: per-player hard facts plus the soft weights for everything else.
//! - `ledger`: the append-only record of proven card locations.
//! - `propagate`: worklist-driven propagation of hard facts across all three.
//! - `metrics`: entropy summaries of the current beliefs.

pub mod config;
mod envelope;
mod ledger;
mod metrics;
mod propagate;
mod tracker;

pub use crate::model::location::Location;
pub use config::{BeliefConfig, TOLERANCE};
pub use envelope::{CategoryDistribution, EnvelopeEvidence, EnvelopeProbabilityEngine};
pub use ledger::KnownCards;
pub use metrics::BeliefMetrics;
pub use propagate::{ConstraintPropagator, PropagationStats};
pub use tracker::{PlayerCardTracker, PlayerHandBelief, RefutationClause};
