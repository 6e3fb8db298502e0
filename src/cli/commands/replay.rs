//! replay command - Run a script of git commands

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use super::{build_engine, load_state, save_state};
use crate::cli::Context;
use crate::ui::output;

/// Command lines of a script: blank lines and `#` comments dropped.
fn script_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Run every script line in order, then write the final state.
///
/// Exits non-zero if any line was refused.
pub fn replay(
    ctx: &Context,
    state_path: &Path,
    script_path: &Path,
    catalog: Option<&Path>,
) -> Result<ExitCode> {
    let engine = build_engine(ctx, catalog)?;
    let script = fs::read_to_string(script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let mut state = load_state(state_path)?;

    let mut refused = 0;
    for line in script_lines(&script) {
        output::print(output::format_prompt(&line), ctx.verbosity);
        let run = engine.execute(&state, &line)?;
        match &run.error {
            Some(message) => {
                refused += 1;
                output::refusal(message);
            }
            None => output::print(&run.output, ctx.verbosity),
        }
        state = run.new_state;
    }

    save_state(state_path, &state)?;
    if refused > 0 {
        output::warn(format!("{refused} command(s) were refused"), ctx.verbosity);
        return Ok(ExitCode::FAILURE);
    }
    tracing::debug!(commits = state.commits.len(), "replay finished");
    Ok(ExitCode::SUCCESS)
}
