//! Tunable factors for the soft (probabilistic) updates.

use crate::error::ClueError;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_DECREASE_FACTOR: f64 = 0.8;
pub const DEFAULT_REFUTER_WEIGHT: f64 = 1.5;

/// Absolute tolerance for "sums to one" and certainty checks.
pub const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeliefConfig {
    /// Multiplier applied to the envelope probability of each suggested card
    /// when a refutation is seen but the shown card is not.
    pub decrease_factor: f64,
    /// Multiplier applied to the refuter's relative weight for each suggested
    /// card after an unseen refutation. `1.0` disables the adjustment.
    pub refuter_weight: f64,
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            decrease_factor: DEFAULT_DECREASE_FACTOR,
            refuter_weight: DEFAULT_REFUTER_WEIGHT,
        }
    }
}

impl BeliefConfig {
    pub fn from_env() -> Self {
        let base = Self::default();
        let decrease = parse_env_f64("CLUE_DECREASE_FACTOR", base.decrease_factor);
        let refuter = parse_env_f64("CLUE_REFUTER_WEIGHT", base.refuter_weight);

        Self {
            decrease_factor: if decrease > 0.0 && decrease < 1.0 {
                decrease
            } else {
                base.decrease_factor
            },
            refuter_weight: refuter.clamp(1.0, 4.0),
        }
    }

    pub fn validate(&self) -> Result<(), ClueError> {
        if !(self.decrease_factor > 0.0 && self.decrease_factor < 1.0) {
            return Err(ClueError::InvalidConfig {
                field: "decrease_factor".to_string(),
                message: format!("must lie in (0, 1), got {}", self.decrease_factor),
            });
        }
        if !self.refuter_weight.is_finite() || self.refuter_weight < 1.0 {
            return Err(ClueError::InvalidConfig {
                field: "refuter_weight".to_string(),
                message: format!("must be at least 1, got {}", self.refuter_weight),
            });
        }
        Ok(())
    }
}

fn parse_env_f64(key: &str, fallback: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(fallback)
}
