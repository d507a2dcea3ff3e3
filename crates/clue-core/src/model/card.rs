use crate::model::category::Category;
use core::fmt;
use serde::{Deserialize, Serialize};

/// A card identified by its category and its position within that category.
///
/// Names live in the [`CardUniverse`](crate::model::universe::CardUniverse) the
/// card was taken from; two universes with the same category sizes share card
/// identities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Card {
    pub category: Category,
    pub index: u8,
}

impl Card {
    pub const fn new(category: Category, index: u8) -> Self {
        Self { category, index }
    }

    pub const fn is_suspect(self) -> bool {
        matches!(self.category, Category::Suspect)
    }

    pub const fn is_weapon(self) -> bool {
        matches!(self.category, Category::Weapon)
    }

    pub const fn is_room(self) -> bool {
        matches!(self.category, Category::Room)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.index)
    }
}
