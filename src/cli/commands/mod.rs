//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Reads the JSON files it was pointed at
//! 2. Calls the engine or the validator
//! 3. Formats and displays output, then writes state back
//!
//! Handlers change states only through the engine or `RepositoryState`
//! methods.

mod completion;
mod exec;
mod new;
mod replay;
mod validate;
mod write;

pub use completion::completion;
pub use exec::exec;
pub use new::new_state;
pub use replay::replay;
pub use validate::validate;
pub use write::{write, Source};

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::core::state::RepositoryState;
use crate::engine::{Engine, InMemoryCatalog};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<ExitCode> {
    match command {
        Command::Exec {
            state,
            catalog,
            command,
        } => exec::exec(ctx, &state, catalog.as_deref(), &command),
        Command::Validate { state, criteria } => validate::validate(ctx, &state, &criteria),
        Command::Replay {
            state,
            script,
            catalog,
        } => replay::replay(ctx, &state, &script, catalog.as_deref()),
        Command::New { state, id, force } => new::new_state(ctx, &state, id, force),
        Command::Write {
            state,
            path,
            content,
            from,
            remove,
        } => {
            let source = match (content.as_deref(), from.as_deref()) {
                (Some(text), _) => Source::Text(text),
                (None, Some(file)) => Source::File(file),
                (None, None) if remove => Source::Remove,
                (None, None) => anyhow::bail!("nothing to write; pass --content, --from or --remove"),
            };
            write::write(ctx, &state, &path, source)
        }
        Command::Completion { shell } => {
            completion::completion(shell)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Read a state file; a missing file is a fresh, uninitialized repository.
fn load_state(path: &Path) -> Result<RepositoryState> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "state file missing, starting empty");
        return Ok(RepositoryState::with_random_id());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading state file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing state file {}", path.display()))
}

fn save_state(path: &Path, state: &RepositoryState) -> Result<()> {
    let text = serde_json::to_string_pretty(state).context("serializing state")?;
    fs::write(path, text + "\n").with_context(|| format!("writing state file {}", path.display()))
}

/// Engine from the configured settings, with an optional remote catalog.
fn build_engine(ctx: &Context, catalog: Option<&Path>) -> Result<Engine> {
    let engine = Engine::new(ctx.engine_config()?);
    let Some(path) = catalog else {
        return Ok(engine);
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    let catalog: InMemoryCatalog = serde_json::from_str(&text)
        .with_context(|| format!("parsing catalog {}", path.display()))?;
    tracing::debug!(remotes = catalog.len(), "loaded remote catalog");
    Ok(engine.with_catalog(catalog))
}
