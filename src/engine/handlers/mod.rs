//! engine::handlers
//!
//! One function per command. Each takes the engine and the current state
//! and returns output text with the next state, or an [`EngineError`].
//!
//! Helpers here are shared by commands that rewrite the working directory
//! (checkout, fast-forward merges, pull) and by those that print commit
//! summaries.

mod basic;
mod branch;
mod history;
mod merge;
mod remote;
mod reset;

use std::collections::BTreeSet;

use super::command::{CommandOutput, GitCommand};
use super::{Engine, EngineError};
use crate::core::files::{changed_paths, delta_between, FileTree, Snapshot};
use crate::core::state::{RepositoryState, StateError};
use crate::merge::diff::line_stats;

pub(super) fn dispatch(
    engine: &Engine,
    state: &RepositoryState,
    command: &GitCommand,
) -> Result<CommandOutput, EngineError> {
    match command {
        GitCommand::Init => Ok(basic::init(engine, state)),
        GitCommand::Status => Ok(basic::status(engine, state)),
        GitCommand::Add { paths, all } => basic::add(state, paths, *all),
        GitCommand::Commit { message, all } => basic::commit(engine, state, message.as_deref(), *all),
        GitCommand::Restore { staged, paths } => basic::restore(state, paths, *staged),
        GitCommand::Help => Ok(basic::help(state)),
        GitCommand::Log { oneline, limit } => history::log(engine, state, *oneline, *limit),
        GitCommand::Diff { staged, path } => Ok(history::diff(engine, state, *staged, path.as_deref())),
        GitCommand::Branch(action) => branch::branch(engine, state, action),
        GitCommand::Checkout(target) => branch::checkout(engine, state, target),
        GitCommand::Merge(action) => merge::merge(engine, state, action),
        GitCommand::Revert { commit } => merge::revert(engine, state, commit),
        GitCommand::Reset {
            mode,
            target,
            paths,
        } => reset::reset(engine, state, *mode, target.as_deref(), paths),
        GitCommand::Remote(action) => remote::remote(state, action),
        GitCommand::Push {
            set_upstream,
            remote,
            branch,
        } => remote::push(engine, state, *set_upstream, remote.as_deref(), branch.as_deref()),
        GitCommand::Pull { remote, branch } => {
            remote::pull(engine, state, remote.as_deref(), branch.as_deref())
        }
        GitCommand::Fetch { remote, branch } => {
            remote::fetch(engine, state, remote.as_deref(), branch.as_deref())
        }
        GitCommand::Clone { url } => remote::clone(engine, state, url),
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

/// The ` N files changed, ...` block printed after commits and merges.
fn change_summary(old: &Snapshot, new: &Snapshot) -> String {
    let paths = changed_paths(old, new);
    let (mut insertions, mut deletions) = (0, 0);
    for path in &paths {
        let (ins, del) = line_stats(
            old.get(path).map_or("", String::as_str),
            new.get(path).map_or("", String::as_str),
        );
        insertions += ins;
        deletions += del;
    }

    let mut parts = vec![plural(paths.len(), "file changed", "files changed")];
    if insertions > 0 {
        parts.push(plural(insertions, "insertion(+)", "insertions(+)"));
    }
    if deletions > 0 {
        parts.push(plural(deletions, "deletion(-)", "deletions(-)"));
    }
    if insertions == 0 && deletions == 0 {
        parts.push("0 insertions(+), 0 deletions(-)".to_string());
    }

    let mut out = format!(" {}\n", parts.join(", "));
    for path in &paths {
        match (old.contains_key(path), new.contains_key(path)) {
            (false, true) => out.push_str(&format!(" create mode 100644 {path}\n")),
            (true, false) => out.push_str(&format!(" delete mode 100644 {path}\n")),
            _ => {}
        }
    }
    out
}

/// Staged and unstaged paths, untracked files included.
fn local_changes(state: &RepositoryState) -> BTreeSet<String> {
    state
        .staging_area
        .keys()
        .cloned()
        .chain(state.unstaged_paths())
        .collect()
}

fn overwrite_error(paths: &[String], operation: &str, advice: &str) -> EngineError {
    let listed: String = paths.iter().map(|p| format!("\t{p}\n")).collect();
    EngineError::precondition(format!(
        "error: Your local changes to the following files would be overwritten by {operation}:\n\
         {listed}Please commit your changes or stash them before you {advice}.\nAborting"
    ))
}

/// Expand a pathspec to known paths: an exact file, or everything under a
/// directory prefix.
fn expand_pathspec(state: &RepositoryState, spec: &str) -> Result<Vec<String>, StateError> {
    let index = state.index_view();
    let known = |p: &String| state.working_directory.contains_key(p) || index.contains_key(p);
    let spec = spec.trim_end_matches('/');
    if known(&spec.to_string()) {
        return Ok(vec![spec.to_string()]);
    }
    let prefix = format!("{spec}/");
    let mut matches: Vec<String> = state
        .working_directory
        .keys()
        .chain(index.keys())
        .filter(|p| p.starts_with(&prefix))
        .cloned()
        .collect();
    matches.sort();
    matches.dedup();
    if matches.is_empty() {
        return Err(StateError::PathspecNotFound(spec.to_string()));
    }
    Ok(matches)
}

/// Working directory and staging area after moving HEAD to `target`.
struct Carried {
    working: Snapshot,
    staging: FileTree,
    /// Locally modified tracked paths that came along, for `M\t<path>` lines.
    modified: Vec<String>,
}

/// Move local changes onto `target`, the way checkout and fast-forward do.
///
/// Fails with the list of paths where a local change would be lost: paths
/// that differ between HEAD and `target` and whose working or staged
/// content is not already what `target` has.
fn carry_changes(state: &RepositoryState, target: &Snapshot) -> Result<Carried, Vec<String>> {
    let head = state.head_tree();
    let index = state.index_view();
    let working = state.working_snapshot();
    let local = local_changes(state);

    let blocked: Vec<String> = local
        .iter()
        .filter(|path| head.get(*path) != target.get(*path))
        .filter(|path| {
            let staged = state.staging_area.contains_key(*path);
            working.get(*path) != target.get(*path)
                || (staged && index.get(*path) != target.get(*path))
        })
        .cloned()
        .collect();
    if !blocked.is_empty() {
        return Err(blocked);
    }

    let mut next_working = working.clone();
    let mut next_index = target.clone();
    for path in changed_paths(&head, target) {
        if local.contains(&path) {
            continue;
        }
        match target.get(&path) {
            Some(content) => next_working.insert(path, content.clone()),
            None => next_working.remove(&path),
        };
    }
    for path in state.staging_area.keys() {
        match index.get(path) {
            Some(content) => next_index.insert(path.clone(), content.clone()),
            None => next_index.remove(path),
        };
    }

    let modified = local
        .iter()
        .filter(|path| target.contains_key(*path) || index.contains_key(*path))
        .filter(|path| next_working.get(*path) != target.get(*path))
        .cloned()
        .collect();

    Ok(Carried {
        working: next_working,
        staging: delta_between(target, &next_index),
        modified,
    })
}

/// Apply the paths that changed between `ours` and `merged` to `working`.
fn apply_tree_change(working: &Snapshot, ours: &Snapshot, merged: &Snapshot) -> Snapshot {
    let mut next = working.clone();
    for path in changed_paths(ours, merged) {
        match merged.get(&path) {
            Some(content) => next.insert(path, content.clone()),
            None => next.remove(&path),
        };
    }
    next
}
