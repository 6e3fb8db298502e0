//! cli
//!
//! Command-line interface layer for gitdojo.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load engine configuration and state files
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It reads JSON files, hands values to
//! [`crate::engine::Engine::execute`] or [`crate::validate::validate`], and
//! writes the results back. It never edits a repository state itself.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::{self, EngineConfig};
use crate::ui::output::Verbosity;

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub verbosity: Verbosity,
}

impl Context {
    /// The engine configuration named by `--config`, or the default one.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let loaded = match &self.config_path {
            Some(path) => config::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => config::load_default().context("loading default config")?,
        };
        Ok(loaded.config)
    }
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "gitdojo=debug" } else { "gitdojo=error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second init (tests calling run twice) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let ctx = Context {
        config_path: cli.config.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };
    commands::dispatch(cli.command, &ctx)
}
