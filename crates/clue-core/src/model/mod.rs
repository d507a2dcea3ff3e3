pub mod card;
pub mod category;
pub mod location;
pub mod player;
pub mod universe;
