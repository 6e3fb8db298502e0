//! validate command - Grade a state file against criteria

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use super::load_state;
use crate::cli::Context;
use crate::ui::output;
use crate::validate::CriteriaSet;

/// Print the grading result as JSON; exit non-zero on failure.
pub fn validate(ctx: &Context, state_path: &Path, criteria_path: &Path) -> Result<ExitCode> {
    let state = load_state(state_path)?;
    let text = fs::read_to_string(criteria_path)
        .with_context(|| format!("reading criteria {}", criteria_path.display()))?;
    let criteria: CriteriaSet = serde_json::from_str(&text)
        .with_context(|| format!("parsing criteria {}", criteria_path.display()))?;

    let result = crate::validate::validate(&criteria, &state);
    output::print(serde_json::to_string_pretty(&result)?, ctx.verbosity);
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
