use crate::error::ClueError;
use crate::model::card::Card;
use crate::model::category::Category;
use std::collections::HashSet;

pub const STANDARD_SUSPECTS: [&str; 6] = [
    "Miss Scarlett",
    "Colonel Mustard",
    "Mrs. White",
    "Reverend Green",
    "Mrs. Peacock",
    "Professor Plum",
];

pub const STANDARD_WEAPONS: [&str; 6] = [
    "Candlestick",
    "Dagger",
    "Lead Pipe",
    "Revolver",
    "Rope",
    "Wrench",
];

pub const STANDARD_ROOMS: [&str; 9] = [
    "Kitchen",
    "Ballroom",
    "Conservatory",
    "Dining Room",
    "Billiard Room",
    "Library",
    "Lounge",
    "Hall",
    "Study",
];

/// Immutable enumeration of every card in play, grouped by category.
///
/// Cards are addressed densely (`id`) in category order: all suspects, then
/// weapons, then rooms. Belief tables index by this id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUniverse {
    names: [Vec<String>; 3],
    offsets: [usize; 3],
}

impl CardUniverse {
    /// The classic 6 suspect, 6 weapon, 9 room deck.
    pub fn standard() -> Self {
        let to_owned = |names: &[&str]| names.iter().map(|name| name.to_string()).collect();
        Self::from_validated([
            to_owned(&STANDARD_SUSPECTS),
            to_owned(&STANDARD_WEAPONS),
            to_owned(&STANDARD_ROOMS),
        ])
    }

    /// Builds a variant deck. Every category needs at least one card and names
    /// must be unique across the whole deck.
    pub fn with_names(
        suspects: Vec<String>,
        weapons: Vec<String>,
        rooms: Vec<String>,
    ) -> Result<Self, ClueError> {
        let names = [suspects, weapons, rooms];
        let mut seen = HashSet::new();
        for category in Category::ALL {
            let members = &names[category.index()];
            if members.is_empty() {
                return Err(ClueError::InvalidSetup {
                    message: format!("category '{category}' has no cards"),
                });
            }
            if members.len() > u8::MAX as usize {
                return Err(ClueError::InvalidSetup {
                    message: format!("category '{category}' has too many cards"),
                });
            }
            for name in members {
                let key = name.trim().to_ascii_lowercase();
                if key.is_empty() {
                    return Err(ClueError::InvalidSetup {
                        message: format!("category '{category}' contains a blank card name"),
                    });
                }
                if !seen.insert(key) {
                    return Err(ClueError::InvalidSetup {
                        message: format!("card name '{name}' appears more than once"),
                    });
                }
            }
        }
        Ok(Self::from_validated(names))
    }

    fn from_validated(names: [Vec<String>; 3]) -> Self {
        let suspects = names[Category::Suspect.index()].len();
        let weapons = names[Category::Weapon.index()].len();
        Self {
            names,
            offsets: [0, suspects, suspects + weapons],
        }
    }

    /// Total number of cards in the deck.
    pub fn len(&self) -> usize {
        self.names.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn category_len(&self, category: Category) -> usize {
        self.names[category.index()].len()
    }

    pub fn contains(&self, card: Card) -> bool {
        (card.index as usize) < self.category_len(card.category)
    }

    /// Dense index of `card`, valid only for cards this universe contains.
    pub fn id(&self, card: Card) -> usize {
        self.offsets[card.category.index()] + card.index as usize
    }

    /// Inverse of [`CardUniverse::id`].
    pub fn card_at(&self, id: usize) -> Option<Card> {
        Category::ALL.iter().rev().find_map(|&category| {
            let offset = self.offsets[category.index()];
            let local = id.checked_sub(offset)?;
            (local < self.category_len(category)).then(|| Card::new(category, local as u8))
        })
    }

    pub fn cards_in(&self, category: Category) -> impl Iterator<Item = Card> + '_ {
        (0..self.category_len(category)).map(move |index| Card::new(category, index as u8))
    }

    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.cards_in(category))
    }

    pub fn name(&self, card: Card) -> &str {
        self.names[card.category.index()]
            .get(card.index as usize)
            .map(String::as_str)
            .unwrap_or("?")
    }

    /// Resolves a card by name, case-insensitively.
    ///
    /// A single word of a multi-word name is accepted when it identifies one
    /// card only ("Scarlett", "Pipe"); ambiguous words ("Mrs.") resolve to `None`.
    pub fn card(&self, name: &str) -> Option<Card> {
        let wanted = name.trim();
        if wanted.is_empty() {
            return None;
        }
        if let Some(card) = self
            .cards()
            .find(|card| self.name(*card).eq_ignore_ascii_case(wanted))
        {
            return Some(card);
        }

        let mut partial = self.cards().filter(|card| {
            self.name(*card)
                .split_whitespace()
                .any(|word| word.eq_ignore_ascii_case(wanted))
        });
        let first = partial.next()?;
        match partial.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Like [`CardUniverse::card`] but reports unknown names as an error.
    pub fn require(&self, name: &str) -> Result<Card, ClueError> {
        self.card(name).ok_or_else(|| ClueError::UnknownCard {
            name: name.to_string(),
        })
    }
}

impl Default for CardUniverse {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_deck_has_twenty_one_cards() {
        let universe = CardUniverse::standard();
        assert_eq!(universe.len(), 21);
        assert_eq!(universe.category_len(Category::Suspect), 6);
        assert_eq!(universe.category_len(Category::Weapon), 6);
        assert_eq!(universe.category_len(Category::Room), 9);
    }

    #[test]
    fn ids_roundtrip_through_card_at() {
        let universe = CardUniverse::standard();
        for (expected, card) in universe.cards().enumerate() {
            assert_eq!(universe.id(card), expected);
            assert_eq!(universe.card_at(expected), Some(card));
        }
        assert_eq!(universe.card_at(21), None);
    }

    #[test]
    fn lookup_accepts_unique_words() {
        let universe = CardUniverse::standard();
        let scarlett = universe.card("scarlett").unwrap();
        assert_eq!(universe.name(scarlett), "Miss Scarlett");
        assert_eq!(universe.card("Pipe"), universe.card("Lead Pipe"));
        assert!(universe.card("Room").is_none(), "Room is ambiguous");
        assert!(universe.card("Mrs.").is_none());
        assert!(universe.card("Spoon").is_none());
    }

    #[test]
    fn rejects_duplicate_names_across_categories() {
        let err = CardUniverse::with_names(
            vec!["Hall".into()],
            vec!["Rope".into()],
            vec!["hall".into()],
        )
        .unwrap_err();
        assert!(matches!(err, ClueError::InvalidSetup { .. }));
    }

    #[test]
    fn rejects_empty_category() {
        let err =
            CardUniverse::with_names(vec!["A".into()], Vec::new(), vec!["B".into()]).unwrap_err();
        assert!(matches!(err, ClueError::InvalidSetup { .. }));
    }

    #[test]
    fn variant_deck_offsets_follow_category_sizes() {
        let universe = CardUniverse::with_names(
            vec!["A".into(), "B".into()],
            vec!["C".into()],
            vec!["D".into(), "E".into(), "F".into()],
        )
        .unwrap();
        assert_eq!(universe.len(), 6);
        let room = universe.card("E").unwrap();
        assert_eq!(room, Card::new(Category::Room, 1));
        assert_eq!(universe.id(room), 4);
        assert!(!universe.contains(Card::new(Category::Weapon, 1)));
    }
}
