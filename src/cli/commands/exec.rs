//! exec command - Run one git command against a state file

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use super::{build_engine, load_state, save_state};
use crate::cli::Context;
use crate::ui::output;

/// Run `line` against the state at `state_path` and write the result back.
///
/// Exits non-zero when the simulated git refuses the command; the state file
/// is left as it was.
pub fn exec(ctx: &Context, state_path: &Path, catalog: Option<&Path>, line: &str) -> Result<ExitCode> {
    let engine = build_engine(ctx, catalog)?;
    let state = load_state(state_path)?;
    let run = engine.execute(&state, line)?;

    if let Some(message) = &run.error {
        output::refusal(message);
        return Ok(ExitCode::FAILURE);
    }
    output::print(&run.output, ctx.verbosity);
    save_state(state_path, &run.new_state)?;
    Ok(ExitCode::SUCCESS)
}
