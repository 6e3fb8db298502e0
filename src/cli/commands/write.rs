//! write command - Edit a file in the simulated working directory
//!
//! Stands in for the learner's editor: quests change files here, then stage
//! and commit them with `exec`. Content from `--from` must be UTF-8 text.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context as _, Result};

use super::{load_state, save_state};
use crate::cli::Context;
use crate::core::object::Blob;
use crate::ui::output;

/// Where the new file content comes from.
#[derive(Debug)]
pub enum Source<'a> {
    Text(&'a str),
    File(&'a Path),
    Remove,
}

pub fn write(ctx: &Context, state_path: &Path, path: &str, source: Source<'_>) -> Result<ExitCode> {
    let path = path.trim_start_matches("./");
    if path.is_empty() || path.starts_with('/') || path.split('/').any(|part| part == "..") {
        bail!("'{path}' is not a path inside the repository");
    }

    let state = load_state(state_path)?;
    let next = match source {
        Source::Remove => {
            if !state.working_directory.contains_key(path) {
                bail!("'{path}' is not in the working directory");
            }
            state.without_file(path)
        }
        Source::Text(text) => state.with_file(path, text),
        Source::File(file) => {
            let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
            let blob = Blob::from_bytes(&bytes)
                .with_context(|| format!("{} cannot be stored as a text file", file.display()))?;
            tracing::debug!(path, hash = %blob.hash, "loaded file content");
            state.with_file(path, &blob.content)
        }
    };

    save_state(state_path, &next)?;
    let verb = if next.working_directory.contains_key(path) { "Wrote" } else { "Removed" };
    output::print(format!("{verb} {path}"), ctx.verbosity);
    Ok(ExitCode::SUCCESS)
}
