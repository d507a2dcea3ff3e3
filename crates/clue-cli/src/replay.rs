use std::collections::BTreeMap;
use std::sync::Arc;

use clue_core::error::ClueError;
use clue_core::game::{ClueGameManager, GameSetup, GameSnapshot, SuggestionEvent};
use clue_core::model::card::Card;
use clue_core::model::universe::CardUniverse;
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{GameScript, ResponseResult, SuggestionConfig};

/// Replays a validated script through a fresh game.
pub struct ReplayRunner {
    script: GameScript,
    game: ClueGameManager,
}

/// What happened during a replay.
#[derive(Debug)]
pub struct ReplaySummary {
    pub run_id: String,
    pub applied: usize,
    pub rejected: Vec<ReplayError>,
    pub snapshot: GameSnapshot,
}

impl ReplaySummary {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl ReplayRunner {
    /// Build the game described by a validated script.
    pub fn new(script: GameScript) -> Result<Self, ReplayError> {
        let universe = script
            .game
            .universe()
            .map_err(|err| ReplayError::Setup {
                message: err.to_string(),
            })?;
        let setup = build_setup(&script, &universe)?;
        let game = ClueGameManager::from_setup(Arc::new(universe), setup, script.engine)
            .map_err(|source| ReplayError::Engine {
                message: "game setup failed".to_string(),
                source,
            })?;
        Ok(Self { script, game })
    }

    pub fn game(&self) -> &ClueGameManager {
        &self.game
    }

    /// Applies every suggestion in order. A rejected suggestion is skipped and
    /// reported, or ends the run when `stop_on_error` is set.
    pub fn run(mut self, stop_on_error: bool) -> Result<ReplaySummary, ReplayError> {
        let mut applied = 0;
        let mut rejected = Vec::new();

        for (index, suggestion) in self.script.suggestions.iter().enumerate() {
            let outcome = to_event(&self.game, suggestion)
                .and_then(|event| self.game.record_suggestion(event));
            match outcome {
                Ok(snapshot) => {
                    applied += 1;
                    event!(
                        target: "clue_cli::replay",
                        Level::DEBUG,
                        run_id = %self.script.run_id,
                        index,
                        known = snapshot.known_cards.len(),
                        "suggestion applied"
                    );
                }
                Err(source) => {
                    let err = ReplayError::Suggestion {
                        index,
                        message: source.describe(self.game.universe(), self.game.roster()),
                        source,
                    };
                    event!(
                        target: "clue_cli::replay",
                        Level::WARN,
                        run_id = %self.script.run_id,
                        index,
                        error = %err,
                        "suggestion skipped"
                    );
                    if stop_on_error {
                        return Err(err);
                    }
                    rejected.push(err);
                }
            }
        }

        Ok(ReplaySummary {
            run_id: self.script.run_id.clone(),
            applied,
            rejected,
            snapshot: self.game.snapshot(),
        })
    }
}

fn build_setup(script: &GameScript, universe: &CardUniverse) -> Result<GameSetup, ReplayError> {
    let game = &script.game;
    let players: Vec<String> = game
        .players
        .iter()
        .map(|player| player.name.trim().to_string())
        .collect();

    let mut setup = if game.players.iter().all(|player| player.hand_size.is_some()) {
        let hand_sizes: BTreeMap<String, usize> = game
            .players
            .iter()
            .zip(&players)
            .map(|(player, name)| (name.clone(), player.hand_size.unwrap_or_default()))
            .collect();
        GameSetup {
            players,
            hand_sizes,
            ..GameSetup::default()
        }
    } else {
        let face_up = game.face_up.len();
        let mut setup = GameSetup::even_deal(players, universe);
        deal_around_face_up(&mut setup, face_up);
        setup
    };

    setup.local_player = game.local_seat().ok_or_else(|| ReplayError::Setup {
        message: "local player is not seated".to_string(),
    })?;
    setup.my_hand = resolve_cards(universe, &game.my_hand)?;
    setup.face_up = resolve_cards(universe, &game.face_up)?;
    Ok(setup)
}

/// Takes face-up cards back out of an even deal, last seats first.
fn deal_around_face_up(setup: &mut GameSetup, mut face_up: usize) {
    while face_up > 0 {
        let Some(name) = setup
            .players
            .iter()
            .max_by_key(|name| setup.hand_sizes.get(*name).copied().unwrap_or_default())
            .cloned()
        else {
            return;
        };
        match setup.hand_sizes.get_mut(&name) {
            Some(size) if *size > 0 => *size -= 1,
            _ => return,
        }
        face_up -= 1;
    }
}

fn resolve_cards(universe: &CardUniverse, names: &[String]) -> Result<Vec<Card>, ReplayError> {
    names
        .iter()
        .map(|name| {
            universe.require(name).map_err(|source| ReplayError::Engine {
                message: "card lookup failed".to_string(),
                source,
            })
        })
        .collect()
}

/// Resolves names in a scripted suggestion against the running game.
pub fn to_event(
    game: &ClueGameManager,
    suggestion: &SuggestionConfig,
) -> Result<SuggestionEvent, ClueError> {
    let universe = game.universe();
    let roster = game.roster();

    let suggester = roster.require(&suggestion.suggester)?;
    let cards: Vec<Card> = suggestion
        .cards
        .iter()
        .map(|name| universe.require(name))
        .collect::<Result<_, _>>()?;
    let cards: [Card; 3] = cards.try_into().map_err(|cards: Vec<Card>| {
        ClueError::InvalidEvent {
            reason: format!("expected 3 cards, found {}", cards.len()),
        }
    })?;

    let mut event = SuggestionEvent::new(suggester, cards);
    for response in &suggestion.responses {
        let player = roster.require(&response.player)?;
        event = match response.result {
            ResponseResult::CouldNotRefute => event.passed(player),
            ResponseResult::Refuted => {
                let shown = response
                    .shown
                    .as_deref()
                    .map(|name| universe.require(name))
                    .transpose()?;
                event.refuted(player, shown)
            }
        };
    }
    Ok(event)
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("setup failed: {message}")]
    Setup { message: String },
    #[error("{message}: {source}")]
    Engine {
        message: String,
        #[source]
        source: ClueError,
    },
    #[error("suggestion {index} rejected: {message}")]
    Suggestion {
        index: usize,
        message: String,
        #[source]
        source: ClueError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
run_id: "replay_unit"
game:
  players:
    - name: "You"
    - name: "Alice"
    - name: "Bob"
  my_hand: ["Plum", "Rope", "Hall", "Green", "Dagger", "Kitchen"]
suggestions:
  - suggester: "You"
    cards: ["Scarlett", "Pipe", "Study"]
    responses:
      - player: "Alice"
        result: could_not_refute
      - player: "Bob"
        result: could_not_refute
  - suggester: "Alice"
    cards: ["Scarlett", "Pipe", "Lounge"]
    responses:
      - player: "Bob"
        result: refuted
        shown: "Scarlett"
"#;

    fn script(yaml: &str) -> GameScript {
        let mut script: GameScript = serde_yaml::from_str(yaml).expect("parse");
        script.validate().expect("valid");
        script
    }

    #[test]
    fn even_deal_is_used_when_sizes_are_omitted() {
        let runner = ReplayRunner::new(script(SCRIPT)).expect("runner");
        let roster = runner.game().roster();
        assert_eq!(roster.total_hand_cards(), 18);
        assert_eq!(roster.hand_size(roster.local()), 6);
    }

    #[test]
    fn face_up_cards_shrink_the_even_deal() {
        let yaml = SCRIPT.replace(
            "  my_hand: [\"Plum\", \"Rope\", \"Hall\", \"Green\", \"Dagger\", \"Kitchen\"]\n",
            "  my_hand: [\"Plum\", \"Rope\", \"Hall\", \"Green\", \"Dagger\"]\n  face_up: [\"Kitchen\", \"Lounge\", \"Library\"]\n",
        );
        let runner = ReplayRunner::new(script(&yaml)).expect("runner");
        let roster = runner.game().roster();
        assert_eq!(roster.total_hand_cards(), 15);
        let sizes: Vec<usize> = roster.ids().map(|player| roster.hand_size(player)).collect();
        assert_eq!(sizes, vec![5, 5, 5]);
    }

    #[test]
    fn contradictory_suggestion_is_reported_and_skipped() {
        let summary = ReplayRunner::new(script(SCRIPT))
            .expect("runner")
            .run(false)
            .expect("replay");
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.rejected.len(), 1);
        assert!(!summary.is_clean());
        assert!(matches!(
            summary.rejected[0],
            ReplayError::Suggestion { index: 1, .. }
        ));
        assert_eq!(summary.snapshot.suggestions_recorded, 1);
    }

    #[test]
    fn stop_on_error_ends_the_run() {
        let err = ReplayRunner::new(script(SCRIPT))
            .expect("runner")
            .run(true)
            .expect_err("second suggestion conflicts");
        assert!(err.to_string().contains("suggestion 1"), "{err}");
        assert!(err.to_string().contains("Miss Scarlett"), "{err}");
    }
}
