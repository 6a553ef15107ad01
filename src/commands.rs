// Command line interface
// Subcommands for batch detection, evaluation and transition location

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::DetectorConfig;
use crate::evaluation::{self, LabelledReferences, ReferenceLabel};
use crate::notes::Direction;
use crate::pipeline::{self, DetectOptions};
use crate::storage::{read_intervals, read_notes};
use crate::techniques::locate_transitions;

type CommandResult<T> = anyhow::Result<T>;

#[derive(Debug, Parser)]
#[command(name = "fretsense")]
#[command(about = "Electric guitar expression style detection")]
#[command(version)]
pub struct Cli {
    /// Detector configuration (TOML); defaults to the user config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the detection pipeline over melody files
    Detect {
        /// A `.MIDI.smooth.melody` file or a directory of them
        melody: PathBuf,

        /// Directory holding the `.pruned.note` tables
        note_dir: PathBuf,

        output_dir: PathBuf,

        /// Directory holding `<stem>.wav` recordings (enables classification)
        #[arg(long)]
        audio_dir: Option<PathBuf>,

        /// Classifier model JSON (enables classification)
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Score estimated spans against reference onsets
    Evaluate {
        estimates: PathBuf,
        references: PathBuf,
    },

    /// Check how many candidates contain a labelled technique
    EvaluateCandidates {
        candidates: PathBuf,

        #[arg(long)]
        bend: Option<PathBuf>,

        #[arg(long)]
        slide: Option<PathBuf>,

        #[arg(long)]
        pull_hammer: Option<PathBuf>,
    },

    /// Locate note transitions of a given pitch step
    Transitions {
        notes: PathBuf,

        /// Pitch step in semitones (magnitude)
        #[arg(long, allow_negative_numbers = true)]
        step: f64,

        /// Restrict to `up` or `down` transitions
        #[arg(long)]
        direction: Option<Direction>,
    },
}

/// Dispatch a parsed command
pub fn execute(command: Commands, config: &DetectorConfig) -> CommandResult<()> {
    match command {
        Commands::Detect {
            melody,
            note_dir,
            output_dir,
            audio_dir,
            model,
        } => detect(
            &melody,
            DetectOptions {
                note_dir,
                output_dir,
                audio_dir,
                model,
            },
            config,
        ),
        Commands::Evaluate {
            estimates,
            references,
        } => evaluate(&estimates, &references),
        Commands::EvaluateCandidates {
            candidates,
            bend,
            slide,
            pull_hammer,
        } => {
            let labelled = [
                (ReferenceLabel::Bend, bend),
                (ReferenceLabel::Slide, slide),
                (ReferenceLabel::PullHammer, pull_hammer),
            ];
            evaluate_candidates(&candidates, &labelled)
        }
        Commands::Transitions {
            notes,
            step,
            direction,
        } => transitions(&notes, step, direction, config),
    }
}

fn detect(melody: &Path, options: DetectOptions, config: &DetectorConfig) -> CommandResult<()> {
    let output_dir = options.output_dir.clone();
    let summary = pipeline::run_batch(melody, options, config)
        .with_context(|| format!("Detection batch over {} failed", melody.display()))?;

    for record in summary.stems.iter().filter(|s| s.reason.is_some()) {
        log::warn!(
            "Skipped '{}': {}",
            record.stem,
            record.reason.as_deref().unwrap_or_default()
        );
    }
    log::info!(
        "{} stems processed, {} skipped; outputs in {}",
        summary.processed_count(),
        summary.skipped_count(),
        output_dir.display()
    );
    Ok(())
}

fn evaluate(estimates: &Path, references: &Path) -> CommandResult<()> {
    let estimates = read_intervals(estimates)?;
    let references = read_intervals(references)?;

    let result = evaluation::evaluate(&estimates, &references)?;
    log::info!(
        "TP {} / FP {} / FN {}",
        result.true_positive_count(),
        result.false_positive_count(),
        result.false_negative_count()
    );
    println!(
        "precision {:.4} recall {:.4} f_measure {:.4}",
        result.precision, result.recall, result.f_measure
    );
    Ok(())
}

fn evaluate_candidates(
    candidates: &Path,
    labelled: &[(ReferenceLabel, Option<PathBuf>)],
) -> CommandResult<()> {
    let candidates = read_intervals(candidates)?;

    let mut references = Vec::new();
    for (label, path) in labelled {
        let Some(path) = path else { continue };
        references.push(LabelledReferences {
            label: *label,
            intervals: read_intervals(path)
                .with_context(|| format!("Failed to read {} references", label.to_string()))?,
        });
    }
    if references.is_empty() {
        anyhow::bail!("at least one of --bend, --slide or --pull-hammer is required");
    }

    let result = evaluation::evaluate_candidates(&candidates, &references);
    println!("valid {} invalid {}", result.valid, result.invalid);
    for coverage in &result.coverage {
        println!(
            "{} matched {} unmatched {}",
            coverage.label.to_string(),
            coverage.matched.len(),
            coverage.unmatched.len()
        );
    }
    Ok(())
}

fn transitions(
    notes: &Path,
    step: f64,
    direction: Option<Direction>,
    config: &DetectorConfig,
) -> CommandResult<()> {
    let notes = read_notes(notes)?;
    let times = locate_transitions(&notes, step, direction, &config.transition);
    log::info!("{} transitions of step {}", times.len(), step);
    for time in times {
        println!("{}", time);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_detect() {
        let cli = Cli::try_parse_from([
            "fretsense",
            "--verbose",
            "detect",
            "melody",
            "notes",
            "out",
            "--audio-dir",
            "wav",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Detect {
                audio_dir, model, ..
            } => {
                assert_eq!(audio_dir, Some(PathBuf::from("wav")));
                assert!(model.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_transitions_direction() {
        let cli = Cli::try_parse_from([
            "fretsense",
            "transitions",
            "a.note",
            "--step",
            "2",
            "--direction",
            "down",
            "--config",
            "fretsense.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("fretsense.toml")));
        match cli.command {
            Commands::Transitions {
                step, direction, ..
            } => {
                assert_eq!(step, 2.0);
                assert_eq!(direction, Some(Direction::Down));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_direction() {
        let result = Cli::try_parse_from([
            "fretsense",
            "transitions",
            "a.note",
            "--step",
            "1",
            "--direction",
            "sideways",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_evaluate_empty_references_fails() {
        let temp_dir = TempDir::new().unwrap();
        let estimates = temp_dir.path().join("est");
        let references = temp_dir.path().join("ref");
        fs::write(&estimates, "1.0 2.0\n").unwrap();
        fs::write(&references, "").unwrap();

        let result = execute(
            Commands::Evaluate {
                estimates,
                references,
            },
            &DetectorConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_evaluate_candidates_requires_a_label() {
        let temp_dir = TempDir::new().unwrap();
        let candidates = temp_dir.path().join("cand");
        fs::write(&candidates, "1.0 2.0\n").unwrap();

        let result = execute(
            Commands::EvaluateCandidates {
                candidates,
                bend: None,
                slide: None,
                pull_hammer: None,
            },
            &DetectorConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_transitions_command_reads_notes() {
        let temp_dir = TempDir::new().unwrap();
        let notes = temp_dir.path().join("a.pruned.note");
        fs::write(&notes, "60 0.0 0.1\n62 0.1 0.1\n").unwrap();

        let result = execute(
            Commands::Transitions {
                notes,
                step: 2.0,
                direction: None,
            },
            &DetectorConfig::default(),
        );
        assert!(result.is_ok());
    }
}
