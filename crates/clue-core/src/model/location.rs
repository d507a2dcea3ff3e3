use crate::model::player::{PlayerId, Roster};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Where a card physically is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Envelope,
    Player(PlayerId),
    /// Dealt face up to the table at setup.
    FaceUp,
}

impl Location {
    pub fn label(self, roster: &Roster) -> String {
        match self {
            Location::Envelope => "envelope".to_string(),
            Location::Player(player) => roster.name(player).to_string(),
            Location::FaceUp => "face up".to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Envelope => f.write_str("envelope"),
            Location::Player(player) => write!(f, "{player}"),
            Location::FaceUp => f.write_str("face up"),
        }
    }
}
