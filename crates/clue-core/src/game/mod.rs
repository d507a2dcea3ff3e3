pub mod event;
pub mod manager;
pub mod snapshot;

pub use event::{Outcome, RecordedSuggestion, Response, ResponseOutcome, SuggestionEvent};
pub use manager::{ClueGameManager, GameSetup, Solution};
pub use snapshot::GameSnapshot;
