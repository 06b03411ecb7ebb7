//! Utility functions for CLI commands.

use std::sync::Arc;

use faceprint::FaceRecognizer;
use faceprint_cli::{config::load_config, Config, Context, Output, OutputFormat, Paths};
use faceprint_kv::RedbStore;

use crate::Cli;

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(&Paths::new()?, cli.config.as_deref())
}

/// Gets the context to use.
///
/// Without `-c` and without a current context, the default context (default
/// database, default thresholds) is used.
pub fn get_context(cli: &Cli) -> anyhow::Result<Context> {
    let cfg = get_config(cli)?;

    match (cfg.resolve_context(cli.context.as_deref()), cli.context.as_deref()) {
        (Some(ctx), _) => Ok(ctx.clone()),
        (None, Some(name)) if !name.is_empty() => anyhow::bail!("context '{}' not found", name),
        (None, _) => Ok(Context::default()),
    }
}

/// Opens the recognizer for the resolved context.
pub fn open_recognizer(cli: &Cli) -> anyhow::Result<FaceRecognizer> {
    let ctx = get_context(cli)?;
    let paths = Paths::new()?;
    let db_path = ctx.database_path(&paths);

    tracing::debug!(context = %ctx.name, db = %db_path.display(), "opening face database");

    let store = RedbStore::open(&db_path)?;
    Ok(FaceRecognizer::open(Arc::new(store), ctx.recognizer_config()))
}

/// Requires input file to be provided.
pub fn require_input_file(cli: &Cli) -> anyhow::Result<&str> {
    cli.input
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("input file is required, use -f flag"))
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(cli: &Cli, result: &T) -> anyhow::Result<()> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Yaml
    };
    Output::new(format, cli.output.clone()).write(result)
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {}", msg);
}

/// Formats bytes to human readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
