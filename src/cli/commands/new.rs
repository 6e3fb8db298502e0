//! new command - Write an empty state file

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Result};

use super::save_state;
use crate::cli::Context;
use crate::core::state::RepositoryState;
use crate::ui::output;

pub fn new_state(ctx: &Context, path: &Path, id: Option<String>, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to replace it", path.display());
    }
    let state = match id {
        Some(id) => RepositoryState::new(id),
        None => RepositoryState::with_random_id(),
    };
    save_state(path, &state)?;
    output::print(format!("Wrote empty repository '{}' to {}", state.id, path.display()), ctx.verbosity);
    Ok(ExitCode::SUCCESS)
}
