//! Configuration management commands.

use clap::{Args, Subcommand};

use faceprint_cli::{Context, Paths};

use super::{get_config, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Each context points at a database file and carries its own matching
/// thresholds.
///
/// Configuration is stored in ~/.faceprint/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add a new context (replaces an existing one with the same name)
    #[command(name = "add-context")]
    AddContext {
        /// Context name
        name: String,
        /// Database file (default: ~/.faceprint/data/faces.redb)
        #[arg(long)]
        db_path: Option<String>,
        /// Key the database is stored under
        #[arg(long)]
        storage_key: Option<String>,
        /// Largest distance still considered a candidate (0-2)
        #[arg(long)]
        max_distance: Option<f32>,
        /// Minimum confidence to report a match (0-1)
        #[arg(long)]
        min_confidence: Option<f32>,
        /// Stored for consumers, not used for decisions (0-1)
        #[arg(long)]
        match_threshold: Option<f32>,
    },
    /// Delete a context
    #[command(name = "delete-context")]
    DeleteContext {
        /// Context name
        name: String,
    },
    /// Set the current context
    #[command(name = "use-context")]
    UseContext {
        /// Context name
        name: String,
    },
    /// Display the current context
    #[command(name = "get-context")]
    GetContext,
    /// List all contexts
    #[command(name = "list-contexts", alias = "get-contexts")]
    ListContexts,
    /// View the current configuration
    View,
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddContext {
                name,
                db_path,
                storage_key,
                max_distance,
                min_confidence,
                match_threshold,
            } => {
                let mut cfg = get_config(cli)?;

                let ctx = Context {
                    db_path: db_path.clone().unwrap_or_default(),
                    storage_key: storage_key.clone().unwrap_or_default(),
                    max_distance: *max_distance,
                    min_confidence: *min_confidence,
                    match_threshold: *match_threshold,
                    ..Default::default()
                };

                cfg.add_context(name, ctx)?;
                print_success(&format!("Context \"{}\" added successfully", name));
                Ok(())
            }

            ConfigSubcommand::DeleteContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_context(name)?;
                print_success(&format!("Context \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_context(name)?;
                print_success(&format!("Switched to context \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetContext => {
                let cfg = get_config(cli)?;
                if cfg.current_context.is_empty() {
                    println!("No current context set");
                } else {
                    println!("{}", cfg.current_context);
                }
                Ok(())
            }

            ConfigSubcommand::ListContexts => {
                let cfg = get_config(cli)?;

                if cfg.contexts.is_empty() {
                    println!("No contexts configured");
                    return Ok(());
                }

                let paths = Paths::new()?;
                println!("{:<8} {:<20} {}", "CURRENT", "NAME", "DATABASE");

                for name in cfg.list_contexts() {
                    let Some(ctx) = cfg.get_context(name) else {
                        continue;
                    };
                    let current = if name == cfg.current_context { "*" } else { "" };
                    println!(
                        "{:<8} {:<20} {}",
                        current,
                        name,
                        ctx.database_path(&paths).display()
                    );
                }

                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;
                let paths = Paths::new()?;

                println!("Config file: {}", cfg.path().display());
                println!("Current context: {}", cfg.current_context);
                println!("Contexts: {}", cfg.contexts.len());

                if !cfg.contexts.is_empty() {
                    println!("\nContext details:");

                    for name in cfg.list_contexts() {
                        let Some(ctx) = cfg.get_context(name) else {
                            continue;
                        };
                        let rc = ctx.recognizer_config();
                        println!("\n  {}:", name);
                        println!("    Database: {}", ctx.database_path(&paths).display());
                        println!("    Storage Key: {}", rc.storage_key);
                        println!("    Max Distance: {}", rc.matcher.max_distance);
                        println!("    Min Confidence: {}", rc.matcher.min_confidence);
                        println!("    Match Threshold: {}", rc.matcher.match_threshold);
                    }
                }

                Ok(())
            }
        }
    }
}
