use std::fs;
use std::path::Path;

use clue_core::game::GameSnapshot;
use thiserror::Error;

use crate::replay::ReplaySummary;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Plain-text report: envelope table, player summaries and the solution state.
pub fn render_text(summary: &ReplaySummary) -> String {
    let snapshot = &summary.snapshot;
    let mut out = String::new();
    out.push_str(&format!("# Case file '{}'\n\n", summary.run_id));
    out.push_str(&format!(
        "Suggestions applied: {} (rejected: {})\n\n",
        summary.applied,
        summary.rejected.len()
    ));

    out.push_str("| Category | Card | Envelope % |\n");
    out.push_str("|----------|------|------------|\n");
    for category in &snapshot.envelope {
        for entry in &category.cards {
            out.push_str(&format!(
                "| {category} | {card} | {prob:.1}% |\n",
                category = category.category,
                card = entry.card,
                prob = entry.probability * 100.0,
            ));
        }
    }
    out.push('\n');

    out.push_str("| Player | Hand | Known | Ruled out | Entropy |\n");
    out.push_str("|--------|------|-------|-----------|---------|\n");
    for (index, player) in snapshot.players.iter().enumerate() {
        let entropy = snapshot
            .metrics
            .entropy_per_player
            .get(index)
            .copied()
            .unwrap_or_default();
        let known = if player.known_has.is_empty() {
            "-".to_string()
        } else {
            player.known_has.join(", ")
        };
        out.push_str(&format!(
            "| {name} | {hand} | {known} | {excluded} | {entropy:.3} |\n",
            name = player.name,
            hand = player.hand_size,
            excluded = player.known_not_has.len(),
        ));
    }
    out.push('\n');

    out.push_str(&solution_line(snapshot));
    out.push('\n');
    out.push_str(&format!(
        "Envelope entropy: {:.3} nats\n",
        snapshot.metrics.envelope_entropy()
    ));

    for rejected in &summary.rejected {
        out.push_str(&format!("Rejected: {rejected}\n"));
    }
    out
}

fn solution_line(snapshot: &GameSnapshot) -> String {
    match &snapshot.solution {
        Some(solution) => format!(
            "Solution{}: {}, {}, {}",
            if snapshot.solved { "" } else { " (hands still open)" },
            solution.suspect,
            solution.weapon,
            solution.room
        ),
        None => {
            let leaders: Vec<String> = snapshot
                .envelope
                .iter()
                .filter_map(|category| {
                    category
                        .cards
                        .iter()
                        .max_by(|a, b| a.probability.total_cmp(&b.probability))
                        .map(|entry| format!("{} ({:.1}%)", entry.card, entry.probability * 100.0))
                })
                .collect();
            format!("Unsolved; most likely: {}", leaders.join(", "))
        }
    }
}

pub fn write_snapshot(snapshot: &GameSnapshot, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ReportError::Io {
                context: "creating snapshot directory",
                source,
            })?;
        }
    }
    let json = snapshot.to_json()?;
    fs::write(path, json).map_err(|source| ReportError::Io {
        context: "writing snapshot",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameScript;
    use crate::replay::ReplayRunner;
    use tempfile::tempdir;

    const SCRIPT: &str = r#"
run_id: "report_unit"
game:
  players:
    - name: "You"
    - name: "Rival"
  my_hand: ["Mustard", "White", "Green", "Candlestick", "Dagger", "Kitchen", "Ballroom", "Conservatory", "Dining Room"]
suggestions:
  - suggester: "You"
    cards: ["Scarlett", "Pipe", "Study"]
    responses:
      - player: "Rival"
        result: could_not_refute
"#;

    fn summary(yaml: &str) -> ReplaySummary {
        let mut script: GameScript = serde_yaml::from_str(yaml).expect("parse");
        script.validate().expect("valid");
        ReplayRunner::new(script)
            .expect("runner")
            .run(false)
            .expect("replay")
    }

    #[test]
    fn solved_game_reports_the_solution() {
        let text = render_text(&summary(SCRIPT));
        assert!(text.contains("# Case file 'report_unit'"));
        assert!(text.contains("Solution: Miss Scarlett, Lead Pipe, Study"), "{text}");
        assert!(text.contains("| suspect | Miss Scarlett | 100.0% |"), "{text}");
    }

    #[test]
    fn unsolved_game_reports_leaders() {
        let yaml = SCRIPT.replace("result: could_not_refute", "result: refuted");
        let text = render_text(&summary(&yaml));
        assert!(text.contains("Unsolved; most likely:"), "{text}");
    }

    #[test]
    fn snapshot_is_written_as_json() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("snapshot.json");
        let summary = summary(SCRIPT);
        write_snapshot(&summary.snapshot, &path).expect("write");
        let written = fs::read_to_string(&path).expect("read back");
        let restored = GameSnapshot::from_json(&written).expect("decode");
        assert!(restored.solved);
        assert_eq!(restored.known_cards.len(), 21);
    }
}
