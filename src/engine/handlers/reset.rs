//! reset

use super::{expand_pathspec, CommandOutput, EngineError};
use crate::core::files::{changed_paths, FileEntry, FileTree, Snapshot};
use crate::core::state::RepositoryState;
use crate::engine::command::ResetMode;
use crate::engine::Engine;

/// `M\t<path>` / `D\t<path>` for tracked files left modified.
fn unstaged_listing(state: &RepositoryState) -> String {
    let index = state.index_view();
    let lines: Vec<String> = state
        .unstaged_paths()
        .into_iter()
        .filter(|p| index.contains_key(p))
        .map(|p| {
            let code = if state.working_directory.contains_key(&p) { 'M' } else { 'D' };
            format!("{code}\t{p}")
        })
        .collect();
    if lines.is_empty() {
        String::new()
    } else {
        format!("Unstaged changes after reset:\n{}", lines.join("\n"))
    }
}

pub(super) fn reset(
    engine: &Engine,
    state: &RepositoryState,
    mode: Option<ResetMode>,
    target: Option<&str>,
    paths: &[String],
) -> Result<CommandOutput, EngineError> {
    // `git reset notes.txt`: a lone argument that is not a revision
    if let (None, Some(spec), true) = (mode, target, paths.is_empty()) {
        if state.resolve_ref(spec).is_none() && expand_pathspec(state, spec).is_ok() {
            return reset_paths(state, None, &[spec.to_string()]);
        }
    }
    if !paths.is_empty() {
        return reset_paths(state, target, paths);
    }

    let oid = match target {
        Some(spec) => Some(state.require_ref(spec)?),
        None => state.head_oid(),
    };
    let Some(oid) = oid else {
        // Nothing committed yet: only the index can be reset
        let next = state.with_staging(FileTree::new()).with_merge_state(None);
        return Ok(CommandOutput::new(String::new(), next));
    };
    let target_tree: Snapshot = state.commit(&oid).map(|c| c.tree.clone()).unwrap_or_default();
    let old_head = state.head_tree();
    let moved = state.with_head_moved(oid.clone()).with_merge_state(None);

    let mode = mode.unwrap_or_default();
    tracing::debug!(?mode, target = %oid, "reset");
    match mode {
        ResetMode::Soft => {
            let mut staging = state.staging_area.clone();
            for path in changed_paths(&target_tree, &old_head) {
                if staging.contains_key(&path) {
                    continue;
                }
                let entry = match old_head.get(&path) {
                    Some(content) => FileEntry::new(content.clone()),
                    None => FileEntry::removal(),
                };
                staging.insert(path, entry);
            }
            Ok(CommandOutput::new(String::new(), moved.with_staging(staging)))
        }
        ResetMode::Mixed => {
            let next = moved.with_staging(FileTree::new());
            Ok(CommandOutput::new(unstaged_listing(&next), next))
        }
        ResetMode::Hard => {
            let next = moved
                .with_staging(FileTree::new())
                .with_working_snapshot(&target_tree);
            let summary = next.head_commit().map(|c| c.summary()).unwrap_or_default();
            let text = format!("HEAD is now at {} {summary}", engine.short(&oid));
            Ok(CommandOutput::new(text, next))
        }
    }
}

/// `reset [<commit>] <path>...`: set the index entry to the commit's version.
fn reset_paths(
    state: &RepositoryState,
    target: Option<&str>,
    specs: &[String],
) -> Result<CommandOutput, EngineError> {
    let source: Snapshot = match target {
        Some(spec) => {
            let oid = state.require_ref(spec)?;
            state.commit(&oid).map(|c| c.tree.clone()).unwrap_or_default()
        }
        None => state.head_tree(),
    };
    let head = state.head_tree();
    let mut staging = state.staging_area.clone();
    for spec in specs {
        let paths = expand_pathspec(state, spec).or_else(|err| {
            if source.contains_key(spec) {
                Ok(vec![spec.clone()])
            } else {
                Err(err)
            }
        })?;
        for path in paths {
            match (source.get(&path), head.get(&path)) {
                (wanted, current) if wanted == current => staging.remove(&path),
                (Some(content), _) => staging.insert(path, FileEntry::new(content.clone())),
                (None, _) => staging.insert(path, FileEntry::removal()),
            };
        }
    }
    let next = state.with_staging(staging);
    Ok(CommandOutput::new(unstaged_listing(&next), next))
}
