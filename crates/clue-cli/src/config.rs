use clue_core::belief::BeliefConfig;
use clue_core::model::universe::CardUniverse;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// A recorded game loaded from YAML: the table, the engine factors and every
/// suggestion in the order it happened.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GameScript {
    pub run_id: String,
    pub game: GameConfig,
    #[serde(default = "BeliefConfig::from_env")]
    pub engine: BeliefConfig,
    #[serde(default)]
    pub suggestions: Vec<SuggestionConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameScript {
    /// Load a script from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut script: GameScript =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        script.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(script)
    }

    /// Validate the script without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        let universe = self.game.universe()?;
        self.game.validate(&universe)?;
        self.engine
            .validate()
            .map_err(|err| ValidationError::InvalidField {
                field: "engine".to_string(),
                message: err.to_string(),
            })?;
        for (index, suggestion) in self.suggestions.iter().enumerate() {
            suggestion.validate(index, &universe, &self.game)?;
        }
        self.logging.normalize();
        Ok(())
    }

    /// The structured log path with `{run_id}` substituted.
    pub fn resolved_log_file(&self) -> Option<PathBuf> {
        self.logging
            .log_file
            .as_deref()
            .map(|template| resolve_template(&self.run_id, template))
    }
}

/// Table setup block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GameConfig {
    /// Seats in turn order.
    pub players: Vec<PlayerConfig>,
    /// Name of the player whose hand is `my_hand`; the first seat when omitted.
    #[serde(default)]
    pub local_player: Option<String>,
    #[serde(default)]
    pub my_hand: Vec<String>,
    #[serde(default)]
    pub face_up: Vec<String>,
    /// Card names for a variant deck; the classic deck when omitted.
    #[serde(default)]
    pub deck: Option<DeckConfig>,
}

impl GameConfig {
    pub fn universe(&self) -> Result<CardUniverse, ValidationError> {
        match &self.deck {
            None => Ok(CardUniverse::standard()),
            Some(deck) => CardUniverse::with_names(
                deck.suspects.clone(),
                deck.weapons.clone(),
                deck.rooms.clone(),
            )
            .map_err(|err| ValidationError::InvalidField {
                field: "game.deck".to_string(),
                message: err.to_string(),
            }),
        }
    }

    /// Seat index of the local player.
    pub fn local_seat(&self) -> Option<usize> {
        match &self.local_player {
            None => Some(0),
            Some(name) => self.seat(name),
        }
    }

    pub fn seat(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.players
            .iter()
            .position(|player| player.name.trim().eq_ignore_ascii_case(wanted))
    }

    fn validate(&self, universe: &CardUniverse) -> Result<(), ValidationError> {
        if self.players.len() < 2 {
            return Err(ValidationError::InvalidField {
                field: "game.players".to_string(),
                message: "at least two players must be seated".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for player in &self.players {
            if player.name.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: "game.players.name".to_string(),
                    message: "player name must not be empty".to_string(),
                });
            }
            if !seen.insert(player.name.trim().to_ascii_lowercase()) {
                return Err(ValidationError::InvalidField {
                    field: "game.players".to_string(),
                    message: format!("player '{}' seated more than once", player.name),
                });
            }
        }

        let given = self
            .players
            .iter()
            .filter(|player| player.hand_size.is_some())
            .count();
        if given != 0 && given != self.players.len() {
            return Err(ValidationError::InvalidField {
                field: "game.players.hand_size".to_string(),
                message: "give a hand size for every player or for none".to_string(),
            });
        }

        if let Some(name) = &self.local_player {
            if self.seat(name).is_none() {
                return Err(ValidationError::InvalidField {
                    field: "game.local_player".to_string(),
                    message: format!("'{name}' is not seated"),
                });
            }
        }

        validate_cards("game.my_hand", &self.my_hand, universe)?;
        validate_cards("game.face_up", &self.face_up, universe)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PlayerConfig {
    pub name: String,
    /// Cards dealt to this player; an even deal when every size is omitted.
    #[serde(default)]
    pub hand_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DeckConfig {
    pub suspects: Vec<String>,
    pub weapons: Vec<String>,
    pub rooms: Vec<String>,
}

/// One suggestion and the answers it received, in the order players were asked.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SuggestionConfig {
    pub suggester: String,
    pub cards: Vec<String>,
    #[serde(default)]
    pub responses: Vec<ResponseConfig>,
}

impl SuggestionConfig {
    fn validate(
        &self,
        index: usize,
        universe: &CardUniverse,
        game: &GameConfig,
    ) -> Result<(), ValidationError> {
        let field = |name: &str| format!("suggestions[{index}].{name}");
        if game.seat(&self.suggester).is_none() {
            return Err(ValidationError::InvalidField {
                field: field("suggester"),
                message: format!("'{}' is not seated", self.suggester),
            });
        }
        if self.cards.len() != 3 {
            return Err(ValidationError::InvalidField {
                field: field("cards"),
                message: format!("expected 3 cards, found {}", self.cards.len()),
            });
        }
        validate_cards(&field("cards"), &self.cards, universe)?;

        for response in &self.responses {
            if game.seat(&response.player).is_none() {
                return Err(ValidationError::InvalidField {
                    field: field("responses"),
                    message: format!("'{}' is not seated", response.player),
                });
            }
            match (&response.result, &response.shown) {
                (ResponseResult::CouldNotRefute, Some(_)) => {
                    return Err(ValidationError::InvalidField {
                        field: field("responses"),
                        message: format!(
                            "{} could not refute but a shown card is given",
                            response.player
                        ),
                    });
                }
                (_, Some(shown)) if universe.card(shown).is_none() => {
                    return Err(ValidationError::InvalidField {
                        field: field("responses"),
                        message: format!("unknown card '{shown}'"),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ResponseConfig {
    pub player: String,
    pub result: ResponseResult,
    /// The card the local player saw, if any.
    #[serde(default)]
    pub shown: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    CouldNotRefute,
    Refuted,
}

/// Logging configuration defaults to plain text on stderr.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// JSON log destination; `{run_id}` is substituted.
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            log_file: None,
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "warn".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_cards(
    field: &str,
    names: &[String],
    universe: &CardUniverse,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for name in names {
        let Some(card) = universe.card(name) else {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("unknown card '{name}'"),
            });
        };
        if !seen.insert(card) {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("'{name}' listed more than once"),
            });
        }
    }
    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Errors surfaced when loading game scripts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read script {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse script {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid script {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "kitchen_table"
game:
  players:
    - name: "You"
      hand_size: 6
    - name: "Alice"
      hand_size: 6
    - name: "Bob"
      hand_size: 6
  local_player: "You"
  my_hand: ["Plum", "Rope", "Hall"]
engine:
  decrease_factor: 0.75
suggestions:
  - suggester: "You"
    cards: ["Scarlett", "Pipe", "Study"]
    responses:
      - player: "Alice"
        result: could_not_refute
      - player: "Bob"
        result: refuted
        shown: "Study"
logging:
  tracing_level: "debug"
  log_file: "out/{run_id}/trace.jsonl"
"#;

    fn parse(yaml: &str) -> GameScript {
        serde_yaml::from_str(yaml).expect("parse yaml")
    }

    #[test]
    fn loads_and_validates_basic_script() {
        let mut script = parse(BASIC_YAML);
        script.validate().expect("validate");

        assert_eq!(script.game.local_seat(), Some(0));
        assert_eq!(script.engine.decrease_factor, 0.75);
        assert_eq!(script.engine.refuter_weight, 1.5);
        assert_eq!(script.suggestions[0].responses[1].result, ResponseResult::Refuted);
        assert_eq!(script.logging.level(), Some(Level::DEBUG));
        assert_eq!(
            script.resolved_log_file(),
            Some(PathBuf::from("out/kitchen_table/trace.jsonl"))
        );
    }

    #[test]
    fn rejects_unknown_card_with_suggestion_index() {
        let yaml = BASIC_YAML.replace("\"Pipe\"", "\"Banana\"");
        let mut script = parse(&yaml);
        let err = script.validate().expect_err("unknown card");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "suggestions[0].cards"
        ));
    }

    #[test]
    fn rejects_partial_hand_sizes() {
        let yaml = BASIC_YAML.replacen("      hand_size: 6\n", "", 1);
        let mut script = parse(&yaml);
        let err = script.validate().expect_err("mixed hand sizes");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "game.players.hand_size"
        ));
    }

    #[test]
    fn rejects_shown_card_on_a_pass() {
        let yaml = BASIC_YAML.replace(
            "result: could_not_refute",
            "result: could_not_refute\n        shown: \"Scarlett\"",
        );
        let mut script = parse(&yaml);
        let err = script.validate().expect_err("pass with shown card");
        assert!(err.to_string().contains("could not refute"), "{err}");
    }

    #[test]
    fn rejects_out_of_range_engine_factor() {
        let yaml = BASIC_YAML.replace("decrease_factor: 0.75", "decrease_factor: 1.5");
        let mut script = parse(&yaml);
        let err = script.validate().expect_err("bad factor");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "engine"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("kitchen_table", "kitchen table");
        let mut script = parse(&yaml);
        let err = script.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn variant_deck_replaces_the_classic_cards() {
        let yaml = BASIC_YAML
            .replace(
                "  my_hand: [\"Plum\", \"Rope\", \"Hall\"]\n",
                "  my_hand: [\"Cook\"]\n  deck:\n    suspects: [\"Cook\", \"Butler\"]\n    weapons: [\"Knife\", \"Poison\"]\n    rooms: [\"Attic\", \"Cellar\"]\n",
            )
            .replace("[\"Scarlett\", \"Pipe\", \"Study\"]", "[\"Butler\", \"Knife\", \"Attic\"]")
            .replace("shown: \"Study\"", "shown: \"Attic\"");
        let mut script = parse(&yaml);
        script.validate().expect("variant deck");
        assert_eq!(script.game.universe().unwrap().len(), 6);
    }
}
