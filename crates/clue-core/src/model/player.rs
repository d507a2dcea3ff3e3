use crate::error::ClueError;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Seat index in turn order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Players in turn order together with their hand sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
    hand_sizes: Vec<usize>,
    local: PlayerId,
}

impl Roster {
    pub fn new(
        seats: Vec<(String, usize)>,
        local: PlayerId,
    ) -> Result<Self, ClueError> {
        if seats.len() < 2 {
            return Err(ClueError::InvalidSetup {
                message: format!("at least two players are required, found {}", seats.len()),
            });
        }
        if seats.len() > u8::MAX as usize {
            return Err(ClueError::InvalidSetup {
                message: format!("too many players ({})", seats.len()),
            });
        }
        if local.index() >= seats.len() {
            return Err(ClueError::InvalidSetup {
                message: format!("local player {local} is not seated"),
            });
        }

        let mut seen = HashSet::new();
        for (name, _) in &seats {
            let key = name.trim().to_ascii_lowercase();
            if key.is_empty() {
                return Err(ClueError::InvalidSetup {
                    message: "player names must not be empty".to_string(),
                });
            }
            if !seen.insert(key) {
                return Err(ClueError::InvalidSetup {
                    message: format!("player '{name}' is seated more than once"),
                });
            }
        }

        let (names, hand_sizes) = seats.into_iter().unzip();
        Ok(Self {
            names,
            hand_sizes,
            local,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn local(&self) -> PlayerId {
        self.local
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        player.index() < self.names.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        (0..self.names.len()).map(|index| PlayerId(index as u8))
    }

    pub fn name(&self, player: PlayerId) -> &str {
        self.names
            .get(player.index())
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn hand_size(&self, player: PlayerId) -> usize {
        self.hand_sizes.get(player.index()).copied().unwrap_or(0)
    }

    pub fn total_hand_cards(&self) -> usize {
        self.hand_sizes.iter().sum()
    }

    /// Case-insensitive lookup by name.
    pub fn player(&self, name: &str) -> Option<PlayerId> {
        let wanted = name.trim();
        self.names
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(wanted))
            .map(|index| PlayerId(index as u8))
    }

    pub fn require(&self, name: &str) -> Result<PlayerId, ClueError> {
        self.player(name).ok_or_else(|| ClueError::UnknownPlayer {
            name: name.to_string(),
        })
    }

    pub fn next(&self, player: PlayerId) -> PlayerId {
        PlayerId(((player.index() + 1) % self.names.len()) as u8)
    }

    /// Players asked to refute a suggestion by `suggester`, in the order they
    /// are asked.
    pub fn response_order(&self, suggester: PlayerId) -> Vec<PlayerId> {
        let mut order = Vec::with_capacity(self.names.len().saturating_sub(1));
        let mut seat = self.next(suggester);
        while seat != suggester {
            order.push(seat);
            seat = self.next(seat);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::new(
            vec![
                ("You".to_string(), 6),
                ("Alice".to_string(), 6),
                ("Bob".to_string(), 6),
            ],
            PlayerId(0),
        )
        .unwrap()
    }

    #[test]
    fn next_wraps_around() {
        let roster = roster();
        assert_eq!(roster.next(PlayerId(2)), PlayerId(0));
    }

    #[test]
    fn response_order_starts_left_of_suggester() {
        let roster = roster();
        assert_eq!(
            roster.response_order(PlayerId(1)),
            vec![PlayerId(2), PlayerId(0)]
        );
        assert_eq!(
            roster.response_order(PlayerId(0)),
            vec![PlayerId(1), PlayerId(2)]
        );
    }

    #[test]
    fn lookup_ignores_case() {
        let roster = roster();
        assert_eq!(roster.player("alice"), Some(PlayerId(1)));
        assert!(matches!(
            roster.require("Carol"),
            Err(ClueError::UnknownPlayer { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_and_single_seat() {
        let duplicate = Roster::new(
            vec![("A".to_string(), 9), ("a".to_string(), 9)],
            PlayerId(0),
        );
        assert!(matches!(duplicate, Err(ClueError::InvalidSetup { .. })));

        let lonely = Roster::new(vec![("A".to_string(), 18)], PlayerId(0));
        assert!(matches!(lonely, Err(ClueError::InvalidSetup { .. })));
    }

    #[test]
    fn rejects_unseated_local_player() {
        let result = Roster::new(
            vec![("A".to_string(), 9), ("B".to_string(), 9)],
            PlayerId(2),
        );
        assert!(matches!(result, Err(ClueError::InvalidSetup { .. })));
    }
}
