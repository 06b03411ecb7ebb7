//! Face database commands.

use clap::Subcommand;
use serde::Serialize;

use faceprint::{Decision, Embedding, MatchResult};
use faceprint_cli::{load_document, read_text};

use super::{
    format_bytes, open_recognizer, output_result, print_success, print_verbose, print_warning,
    require_input_file,
};
use crate::Cli;

#[derive(Subcommand)]
pub enum FaceCommand {
    /// Train an identity from a file of embeddings (-f)
    Train {
        /// Display name of the person
        name: String,
    },
    /// Add one embedding (-f) to an identity, ignoring the sample cap
    #[command(name = "add-sample")]
    AddSample {
        /// Display name of the person
        name: String,
    },
    /// Recognize the embedding in the input file (-f)
    Recognize,
    /// Remove an identity
    Remove {
        /// Display name of the person
        name: String,
    },
    /// List identities
    List,
    /// Show one identity
    Show {
        /// Display name of the person
        name: String,
    },
    /// Check whether an identity has enough samples
    Validate {
        /// Display name of the person
        name: String,
    },
    /// Show database statistics
    Stats,
    /// Export the database as JSON (stdout or -o)
    Export,
    /// Replace the database with an exported JSON file (`-` for stdin)
    Import {
        /// Exported database file
        file: String,
    },
    /// Delete every identity
    Clear,
}

/// Serializable form of a recognition decision.
#[derive(Serialize)]
struct RecognitionReport<'a> {
    recognized: bool,
    confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    closest: Option<&'a MatchResult>,
}

impl<'a> From<&'a Decision> for RecognitionReport<'a> {
    fn from(d: &'a Decision) -> Self {
        let closest = match d {
            Decision::Matched(m) => Some(m),
            Decision::Unmatched { closest, .. } => closest.as_ref(),
        };
        Self {
            recognized: d.is_match(),
            confidence: d.confidence(),
            closest,
        }
    }
}

impl FaceCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match self {
            FaceCommand::Train { name } => train(cli, name),
            FaceCommand::AddSample { name } => {
                let sample: Embedding = load_document(require_input_file(cli)?)?;
                let rec = open_recognizer(cli)?;
                if !rec.add_sample(name, sample) {
                    anyhow::bail!("sample rejected for '{}'", name);
                }
                let count = rec.identity(name).map_or(0, |v| v.sample_count);
                print_success(&format!("Sample added, \"{}\" now has {} sample(s)", name, count));
                Ok(())
            }
            FaceCommand::Recognize => recognize(cli),
            FaceCommand::Remove { name } => {
                let rec = open_recognizer(cli)?;
                if !rec.remove_identity(name) {
                    anyhow::bail!("identity '{}' not found", name);
                }
                print_success(&format!("Identity \"{}\" removed", name));
                Ok(())
            }
            FaceCommand::List => {
                let rec = open_recognizer(cli)?;
                let identities = rec.identities();
                print_verbose(cli, &format!("Found {} identities", identities.len()));
                output_result(cli, &identities)
            }
            FaceCommand::Show { name } => {
                let rec = open_recognizer(cli)?;
                match rec.identity(name) {
                    Some(view) => output_result(cli, &view),
                    None => anyhow::bail!("identity '{}' not found", name),
                }
            }
            FaceCommand::Validate { name } => {
                let rec = open_recognizer(cli)?;
                output_result(cli, &rec.validate_training(name))
            }
            FaceCommand::Stats => {
                let rec = open_recognizer(cli)?;
                let stats = rec.stats();
                print_verbose(cli, &format!("Storage: {}", format_bytes(stats.storage_bytes)));
                output_result(cli, &stats)
            }
            FaceCommand::Export => {
                let rec = open_recognizer(cli)?;
                let text = rec.export()?;
                match &cli.output {
                    Some(path) => {
                        std::fs::write(path, text)?;
                        print_success(&format!("Database exported to {}", path));
                    }
                    None => println!("{}", text),
                }
                Ok(())
            }
            FaceCommand::Import { file } => {
                let text = read_text(file)?;
                let rec = open_recognizer(cli)?;
                let outcome = rec.import(&text);
                if !outcome.success {
                    anyhow::bail!("import failed: {}", outcome.message);
                }
                if outcome.faces_skipped > 0 {
                    print_warning(&format!("{} malformed face(s) skipped", outcome.faces_skipped));
                }
                print_success(&outcome.message);
                Ok(())
            }
            FaceCommand::Clear => {
                let rec = open_recognizer(cli)?;
                rec.clear_database();
                print_success("Face database cleared");
                Ok(())
            }
        }
    }
}

fn train(cli: &Cli, name: &str) -> anyhow::Result<()> {
    let path = require_input_file(cli)?;
    let samples: Vec<Embedding> = load_document(path)?;
    print_verbose(cli, &format!("Loaded {} sample(s) from {}", samples.len(), path));

    let rec = open_recognizer(cli)?;
    let mut progress = |done: usize, total: usize| {
        tracing::debug!(name, done, total, "training sample");
    };
    let outcome = rec.train(name, &samples, Some(&mut progress));

    if outcome.success {
        print_success(&outcome.message);
    } else {
        print_warning(&outcome.message);
    }
    output_result(cli, &outcome)
}

fn recognize(cli: &Cli) -> anyhow::Result<()> {
    let path = require_input_file(cli)?;
    let query: Vec<f32> = load_document(path)?;

    let rec = open_recognizer(cli)?;
    let decision = rec.recognize(&query)?;
    tracing::debug!(dims = query.len(), matched = decision.is_match(), "query recognized");
    output_result(cli, &RecognitionReport::from(&decision))
}
