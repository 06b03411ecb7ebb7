//! faceprint - a command line interface for a local face identity database.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, FaceCommand};

/// faceprint - train and recognize faces from embedding vectors.
///
/// Embeddings are read from YAML or JSON files: a training file holds a list
/// of vectors, a query file holds a single vector.
///
/// Configuration is stored in ~/.faceprint/ and supports multiple contexts,
/// each pointing at its own database.
#[derive(Parser)]
#[command(name = "faceprint")]
#[command(about = "Face embedding database CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.faceprint/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Context name to use
    #[arg(short = 'c', long, global = true)]
    pub context: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Input embedding file (YAML or JSON, `-` for stdin)
    #[arg(short = 'f', long = "file", global = true)]
    pub input: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    #[command(flatten)]
    Face(FaceCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli).await,
        Commands::Face(cmd) => cmd.run(&cli).await,
    }
}
