use std::path::PathBuf;

use clap::Parser;

use clue_cli::config::GameScript;
use clue_cli::logging::init_logging;
use clue_cli::replay::ReplayRunner;
use clue_cli::report::{render_text, write_snapshot};

/// Replays a recorded Clue game and reports what can be deduced about the envelope.
#[derive(Debug, Parser)]
#[command(
    name = "clue-solver",
    author,
    version,
    about = "Probabilistic Clue case-file solver"
)]
struct Cli {
    /// Path to the YAML game script.
    #[arg(short, long, value_name = "FILE")]
    script: PathBuf,

    /// Print the final snapshot as JSON instead of the text report.
    #[arg(long)]
    json: bool,

    /// Also write the final snapshot as JSON to this file.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Exit after validating the script (no suggestions are replayed).
    #[arg(long)]
    validate_only: bool,

    /// Override the envelope multiplier for unseen refutations.
    #[arg(long, value_name = "FACTOR")]
    decrease_factor: Option<f64>,

    /// Fail on the first rejected suggestion instead of skipping it.
    #[arg(long)]
    stop_on_error: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut script = GameScript::from_path(&cli.script)?;

    if let Some(factor) = cli.decrease_factor {
        script.engine.decrease_factor = factor;
    }

    script.validate()?;

    let run_id = script.run_id.clone();
    let suggestion_count = script.suggestions.len();
    let player_count = script.game.players.len();

    let _logging_guard = init_logging(&script.logging, script.resolved_log_file(), &run_id)?;
    let runner = ReplayRunner::new(script)?;

    if cli.validate_only {
        println!(
            "Script '{run_id}' is valid: {player_count} players, {suggestion_count} suggestion{}",
            if suggestion_count == 1 { "" } else { "s" }
        );
        return Ok(());
    }

    let summary = runner.run(cli.stop_on_error)?;

    if let Some(path) = cli.output.as_ref() {
        write_snapshot(&summary.snapshot, path)?;
    }

    if cli.json {
        println!("{}", summary.snapshot.to_json()?);
    } else {
        print!("{}", render_text(&summary));
        if let Some(path) = cli.output.as_ref() {
            println!("Snapshot: {}", path.display());
        }
    }

    Ok(())
}
