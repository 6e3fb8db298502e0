//! merge, merge --abort, revert

use std::collections::BTreeSet;

use super::{
    apply_tree_change, carry_changes, change_summary, overwrite_error, CommandOutput, EngineError,
};
use crate::core::files::{changed_paths, delta_between, FileTree, Snapshot};
use crate::core::graph::CommitGraph;
use crate::core::state::{MergeKind, MergeState, RepositoryState, StateError};
use crate::core::types::Oid;
use crate::engine::command::MergeAction;
use crate::engine::Engine;
use crate::merge::{merge_trees, plan, ConflictKind, MergePlan, TreeMerge};

pub(super) fn merge(
    engine: &Engine,
    state: &RepositoryState,
    action: &MergeAction,
) -> Result<CommandOutput, EngineError> {
    match action {
        MergeAction::Branch(name) => merge_ref(engine, state, name),
        MergeAction::Abort => abort(state),
    }
}

/// Default message of the merge commit for `name`.
fn merge_message(state: &RepositoryState, name: &str) -> String {
    if state.find_branch(name).is_some() {
        return format!("Merge branch '{name}'");
    }
    let remote_ref = name
        .split_once('/')
        .and_then(|(remote, branch)| state.find_remote(remote)?.branch_tip(branch));
    match remote_ref {
        Some(_) => format!("Merge remote-tracking branch '{name}'"),
        None => format!("Merge commit '{name}'"),
    }
}

/// Paths with unstaged local edits that writing `result` would clobber.
fn clobbered(state: &RepositoryState, ours: &Snapshot, result: &Snapshot) -> Vec<String> {
    let touched: BTreeSet<String> = changed_paths(ours, result).into_iter().collect();
    state
        .unstaged_paths()
        .into_iter()
        .filter(|p| touched.contains(p))
        .collect()
}

/// `Auto-merging` and `CONFLICT` lines, in path order.
fn conflict_report(result: &TreeMerge, label: &str) -> String {
    let paths: BTreeSet<&String> = result
        .auto_merged
        .iter()
        .chain(result.conflicts.iter().map(|c| &c.path))
        .collect();
    let mut out = String::new();
    for path in paths {
        if result.auto_merged.contains(path) {
            out.push_str(&format!("Auto-merging {path}\n"));
        }
        let Some(conflict) = result.conflicts.iter().find(|c| &c.path == path) else {
            continue;
        };
        let tag = conflict.kind.tag();
        let line = match conflict.kind {
            ConflictKind::Content | ConflictKind::AddAdd => {
                format!("CONFLICT ({tag}): Merge conflict in {path}")
            }
            ConflictKind::ModifyDelete {
                deleted_in_head: true,
            } => format!(
                "CONFLICT ({tag}): {path} deleted in HEAD and modified in {label}. Version {label} of {path} left in tree."
            ),
            ConflictKind::ModifyDelete {
                deleted_in_head: false,
            } => format!(
                "CONFLICT ({tag}): {path} deleted in {label} and modified in HEAD. Version HEAD of {path} left in tree."
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Index contents while conflicts are pending: the merged tree, with HEAD's
/// version of each conflicted path.
fn pending_index(ours: &Snapshot, result: &TreeMerge) -> FileTree {
    let mut index = result.merged.clone();
    for conflict in &result.conflicts {
        match ours.get(&conflict.path) {
            Some(content) => index.insert(conflict.path.clone(), content.clone()),
            None => index.remove(&conflict.path),
        };
    }
    delta_between(ours, &index)
}

fn merge_ref(
    engine: &Engine,
    state: &RepositoryState,
    name: &str,
) -> Result<CommandOutput, EngineError> {
    let theirs = state.resolve_ref(name).ok_or_else(|| {
        EngineError::precondition(format!("merge: {name} - not something we can merge"))
    })?;
    let ours = state.head_oid();
    let graph = CommitGraph::from_state(state);

    match plan(&graph, ours.as_ref(), &theirs) {
        MergePlan::UpToDate => Ok(CommandOutput::unchanged("Already up to date.", state)),
        MergePlan::Unrelated => Err(EngineError::precondition(
            "fatal: refusing to merge unrelated histories",
        )),
        MergePlan::FastForward { from, to } => fast_forward(engine, state, from, to),
        MergePlan::ThreeWay { base } => three_way(engine, state, name, &base, &theirs),
    }
}

fn fast_forward(
    engine: &Engine,
    state: &RepositoryState,
    from: Option<Oid>,
    to: Oid,
) -> Result<CommandOutput, EngineError> {
    let old_tree = state.head_tree();
    let new_tree = state.commit(&to).map(|c| c.tree.clone()).unwrap_or_default();
    let carried = carry_changes(state, &new_tree)
        .map_err(|paths| overwrite_error(&paths, "merge", "merge"))?;

    let header = match &from {
        Some(from) => format!("Updating {}..{}\n", engine.short(from), engine.short(&to)),
        None => String::new(),
    };
    let next = state
        .with_head_moved(to)
        .with_working_snapshot(&carried.working)
        .with_staging(carried.staging);
    let text = format!("{header}Fast-forward\n{}", change_summary(&old_tree, &new_tree));
    Ok(CommandOutput::new(text.trim_end(), next))
}

fn three_way(
    engine: &Engine,
    state: &RepositoryState,
    name: &str,
    base: &Oid,
    theirs: &Oid,
) -> Result<CommandOutput, EngineError> {
    if state.has_staged_changes() {
        let staged: Vec<String> = state.staging_area.keys().cloned().collect();
        return Err(overwrite_error(&staged, "merge", "merge"));
    }
    let tree_of = |oid: &Oid| state.commit(oid).map(|c| c.tree.clone()).unwrap_or_default();
    let ours_tree = state.head_tree();
    let result = merge_trees(&tree_of(base), &ours_tree, &tree_of(theirs), name);

    let written = result.working_tree();
    let blocked = clobbered(state, &ours_tree, &written);
    if !blocked.is_empty() {
        return Err(overwrite_error(&blocked, "merge", "merge"));
    }

    let message = merge_message(state, name);
    let working = apply_tree_change(&state.working_snapshot(), &ours_tree, &written);
    let mut merge_state = MergeState {
        kind: MergeKind::Merge,
        incoming: theirs.clone(),
        label: name.to_string(),
        conflicts: Vec::new(),
        message: message.clone(),
    };
    let report = conflict_report(&result, name);

    if result.is_clean() {
        let next = state
            .with_working_snapshot(&working)
            .with_staging(delta_between(&ours_tree, &result.merged))
            .with_merge_state(Some(merge_state))
            .record_commit(&message, &engine.author(), engine.now())?;
        let text = format!(
            "{report}Merge made by the 'ort' strategy.\n{}",
            change_summary(&ours_tree, &result.merged)
        );
        return Ok(CommandOutput::new(text.trim_end(), next));
    }

    tracing::debug!(conflicts = result.conflicts.len(), "merge stopped with conflicts");
    merge_state.conflicts = result.conflict_paths();
    let next = state
        .with_working_snapshot(&working)
        .with_staging(pending_index(&ours_tree, &result))
        .with_merge_state(Some(merge_state));
    let text = format!("{report}Automatic merge failed; fix conflicts and then commit the result.");
    Ok(CommandOutput::new(text, next))
}

/// Put HEAD's version back on every path the merge touched.
fn abort(state: &RepositoryState) -> Result<CommandOutput, EngineError> {
    let Some(merge) = &state.merge_state else {
        return Err(EngineError::precondition(
            "fatal: There is no merge to abort (MERGE_HEAD missing).",
        ));
    };
    let head = state.head_tree();
    let mut working = state.working_snapshot();
    let touched = state.staging_area.keys().chain(merge.conflicts.iter());
    for path in touched {
        match head.get(path) {
            Some(content) => working.insert(path.clone(), content.clone()),
            None => working.remove(path),
        };
    }
    let next = state
        .with_staging(FileTree::new())
        .with_working_snapshot(&working)
        .with_merge_state(None);
    Ok(CommandOutput::new(String::new(), next))
}

pub(super) fn revert(
    engine: &Engine,
    state: &RepositoryState,
    spec: &str,
) -> Result<CommandOutput, EngineError> {
    let oid = state
        .resolve_ref(spec)
        .ok_or_else(|| EngineError::precondition(format!("fatal: bad revision '{spec}'")))?;
    let Some(commit) = state.commit(&oid) else {
        return Err(StateError::UnknownCommit(oid).into());
    };
    if commit.is_merge() {
        return Err(EngineError::precondition(format!(
            "error: commit {oid} is a merge but no -m option was given.\nfatal: revert failed"
        )));
    }
    if state.has_staged_changes() {
        return Err(EngineError::precondition(
            "error: your local changes would be overwritten by revert.\n\
             hint: commit your changes or stash them to proceed.\n\
             fatal: revert failed",
        ));
    }

    let short = engine.short(&oid);
    let parent_tree = commit
        .parent
        .as_ref()
        .and_then(|p| state.commit(p))
        .map(|c| c.tree.clone())
        .unwrap_or_default();
    let ours_tree = state.head_tree();
    let label = format!("parent of {short} ({})", commit.summary());
    let result = merge_trees(&commit.tree, &ours_tree, &parent_tree, &label);

    let written = result.working_tree();
    let blocked = clobbered(state, &ours_tree, &written);
    if !blocked.is_empty() {
        return Err(overwrite_error(&blocked, "merge", "revert"));
    }
    if result.is_clean() && result.merged == ours_tree {
        return Err(StateError::NothingToCommit.into());
    }

    let message = format!(
        "Revert \"{}\"\n\nThis reverts commit {oid}.",
        commit.summary()
    );
    let working = apply_tree_change(&state.working_snapshot(), &ours_tree, &written);

    if result.is_clean() {
        let next = state
            .with_working_snapshot(&working)
            .with_staging(delta_between(&ours_tree, &result.merged))
            .record_commit(&message, &engine.author(), engine.now())?;
        let location = match next.current_branch() {
            Some(branch) if !next.is_detached() => branch.name.to_string(),
            _ => "detached HEAD".to_string(),
        };
        let new_short = next
            .head_oid()
            .map(|h| engine.short(&h).to_string())
            .unwrap_or_default();
        let text = format!(
            "[{location} {new_short}] Revert \"{}\"\n{}",
            commit.summary(),
            change_summary(&ours_tree, &result.merged)
        );
        return Ok(CommandOutput::new(text.trim_end(), next));
    }

    let report = conflict_report(&result, &label);
    let next = state
        .with_working_snapshot(&working)
        .with_staging(pending_index(&ours_tree, &result))
        .with_merge_state(Some(MergeState {
            kind: MergeKind::Revert,
            incoming: oid.clone(),
            label: label.clone(),
            conflicts: result.conflict_paths(),
            message,
        }));
    let text = format!(
        "{report}error: could not revert {short}... {}\n\
         hint: After resolving the conflicts, mark them with\n\
         hint: \"git add <pathspec>\", then run\n\
         hint: \"git commit\".",
        commit.summary()
    );
    Ok(CommandOutput::new(text, next))
}
