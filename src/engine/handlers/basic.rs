//! init, status, add, commit, restore, help

use super::{change_summary, expand_pathspec, CommandOutput, EngineError};
use crate::core::graph::CommitGraph;
use crate::core::state::{HeadRef, MergeKind, RepositoryState, StateError};
use crate::engine::Engine;
use crate::merge::conflict::has_conflict_markers;

pub(super) fn init(engine: &Engine, state: &RepositoryState) -> CommandOutput {
    if state.is_initialized() {
        return CommandOutput::unchanged("Reinitialized existing Git repository in .git/", state);
    }
    let next = state.initialize(&engine.config().default_branch());
    CommandOutput::new("Initialized empty Git repository in .git/", next)
}

/// Ahead/behind line against the same-named branch on `origin` (or the
/// first remote that has one).
fn tracking_line(state: &RepositoryState, branch: &str) -> Option<String> {
    let local = state.find_branch(branch)?.commit_hash.clone()?;
    let remote = state
        .remotes
        .iter()
        .filter(|r| r.branch_tip(branch).is_some())
        .min_by_key(|r| r.name.as_str() != "origin")?;
    let upstream = remote.branch_tip(branch)?.clone();
    let name = format!("{}/{}", remote.name, branch);

    let graph = CommitGraph::from_state(state);
    let local_set = graph.ancestors(&local);
    let remote_set = graph.ancestors(&upstream);
    let ahead = local_set.difference(&remote_set).count();
    let behind = remote_set.difference(&local_set).count();
    let commits = |n: usize| if n == 1 { "commit" } else { "commits" };

    Some(match (ahead, behind) {
        (0, 0) => format!("Your branch is up to date with '{name}'."),
        (a, 0) => format!("Your branch is ahead of '{name}' by {a} {}.", commits(a)),
        (0, b) => format!(
            "Your branch is behind '{name}' by {b} {}, and can be fast-forwarded.",
            commits(b)
        ),
        (a, b) => format!(
            "Your branch and '{name}' have diverged,\nand have {a} and {b} different commits each, respectively."
        ),
    })
}

pub(super) fn status(engine: &Engine, state: &RepositoryState) -> CommandOutput {
    let mut out = String::new();
    match state.head_ref() {
        HeadRef::Detached(oid) => out.push_str(&format!("HEAD detached at {}\n", engine.short(&oid))),
        HeadRef::Branch(name) => {
            out.push_str(&format!("On branch {name}\n"));
            if let Some(line) = tracking_line(state, name.as_str()) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        HeadRef::Uninitialized => {}
    }
    let unborn = state.head_oid().is_none();
    if unborn {
        out.push_str("\nNo commits yet\n");
    }

    let conflicts: Vec<String> = state
        .merge_state
        .as_ref()
        .map(|m| m.conflicts.clone())
        .unwrap_or_default();
    if let Some(merge) = &state.merge_state {
        match (merge.kind, conflicts.is_empty()) {
            (MergeKind::Merge, false) => out.push_str(
                "\nYou have unmerged paths.\n  (fix conflicts and run \"git commit\")\n  (use \"git merge --abort\" to abort the merge)\n",
            ),
            (MergeKind::Merge, true) => out.push_str(
                "\nAll conflicts fixed but you are still merging.\n  (use \"git commit\" to conclude merge)\n",
            ),
            (MergeKind::Revert, _) => out.push_str(&format!(
                "\nYou are currently reverting commit {}.\n  (fix conflicts and run \"git commit\")\n  (use \"git merge --abort\" to cancel the revert operation)\n",
                engine.short(&merge.incoming)
            )),
        }
    }

    let head = state.head_tree();
    let index = state.index_view();
    let staged: Vec<(&str, &String)> = state
        .staging_area
        .iter()
        .filter(|(path, _)| !conflicts.contains(*path))
        .map(|(path, entry)| {
            let label = match (entry.deleted, head.contains_key(path)) {
                (true, _) => "deleted:    ",
                (false, true) => "modified:   ",
                (false, false) => "new file:   ",
            };
            (label, path)
        })
        .collect();

    let mut unstaged = Vec::new();
    let mut untracked = Vec::new();
    for path in state.unstaged_paths() {
        if conflicts.contains(&path) {
            continue;
        }
        match (index.contains_key(&path), state.working_directory.contains_key(&path)) {
            (true, true) => unstaged.push(("modified:   ", path)),
            (true, false) => unstaged.push(("deleted:    ", path)),
            _ => untracked.push(path),
        }
    }

    if !staged.is_empty() {
        out.push_str("\nChanges to be committed:\n");
        let hint = if unborn {
            "  (use \"git rm --cached <file>...\" to unstage)\n"
        } else {
            "  (use \"git restore --staged <file>...\" to unstage)\n"
        };
        out.push_str(hint);
        for (label, path) in &staged {
            out.push_str(&format!("\t{label}{path}\n"));
        }
    }
    if !conflicts.is_empty() {
        out.push_str("\nUnmerged paths:\n  (use \"git add <file>...\" to mark resolution)\n");
        for path in &conflicts {
            let label = match (head.contains_key(path), state.working_directory.contains_key(path)) {
                (true, true) => "both modified:   ",
                (false, true) => "deleted by us:   ",
                _ => "deleted by them: ",
            };
            out.push_str(&format!("\t{label}{path}\n"));
        }
    }
    if !unstaged.is_empty() {
        out.push_str(
            "\nChanges not staged for commit:\n  (use \"git add <file>...\" to update what will be committed)\n  (use \"git restore <file>...\" to discard changes in working directory)\n",
        );
        for (label, path) in &unstaged {
            out.push_str(&format!("\t{label}{path}\n"));
        }
    }
    if !untracked.is_empty() {
        out.push_str(
            "\nUntracked files:\n  (use \"git add <file>...\" to include in what will be committed)\n",
        );
        for path in &untracked {
            out.push_str(&format!("\t{path}\n"));
        }
    }

    if staged.is_empty() && conflicts.is_empty() {
        out.push('\n');
        out.push_str(match (unstaged.is_empty(), untracked.is_empty(), unborn) {
            (false, _, _) => {
                "no changes added to commit (use \"git add\" and/or \"git commit -a\")"
            }
            (true, false, _) => {
                "nothing added to commit but untracked files present (use \"git add\" to track)"
            }
            (true, true, true) => {
                "nothing to commit (create/copy files and use \"git add\" to track)"
            }
            (true, true, false) => "nothing to commit, working tree clean",
        });
        out.push('\n');
    }

    CommandOutput::unchanged(out.trim_start_matches('\n').trim_end(), state)
}

/// Mark conflicted paths whose working content is marker-free as resolved.
fn settle_conflicts(state: RepositoryState, touched: &[String]) -> (RepositoryState, Vec<String>) {
    let Some(merge) = state.merge_state.clone() else {
        return (state, Vec::new());
    };
    let mut next = state;
    let mut still_marked = Vec::new();
    for path in merge.conflicts.iter().filter(|p| touched.contains(*p)) {
        let content = next.working_directory.get(path).map(|e| e.content.clone());
        match content {
            Some(text) if has_conflict_markers(&text) => still_marked.push(path.clone()),
            _ => next = next.resolve_conflict(path),
        }
    }
    (next, still_marked)
}

pub(super) fn add(
    state: &RepositoryState,
    paths: &[String],
    all: bool,
) -> Result<CommandOutput, EngineError> {
    let mut touched = Vec::new();
    let mut next = state.clone();
    if all {
        touched.extend(state.unstaged_paths());
        if let Some(merge) = &state.merge_state {
            touched.extend(merge.conflicts.iter().cloned());
        }
        next = next.stage_all()?;
    }
    for spec in paths {
        for path in expand_pathspec(state, spec)? {
            next = next.stage_file(&path)?;
            touched.push(path);
        }
    }

    let (next, still_marked) = settle_conflicts(next, &touched);
    let text: String = still_marked
        .iter()
        .map(|p| format!("hint: '{p}' still contains conflict markers; edit it and run 'git add {p}' again\n"))
        .collect();
    Ok(CommandOutput::new(text.trim_end(), next))
}

pub(super) fn commit(
    engine: &Engine,
    state: &RepositoryState,
    message: Option<&str>,
    all: bool,
) -> Result<CommandOutput, EngineError> {
    let mut staged = state.clone();
    if all {
        let index = state.index_view();
        let tracked: Vec<String> = state
            .unstaged_paths()
            .into_iter()
            .filter(|p| index.contains_key(p))
            .collect();
        for path in &tracked {
            staged = staged.stage_file(path)?;
        }
        staged = settle_conflicts(staged, &tracked).0;
    }

    let message = match (message, &state.merge_state) {
        (Some(m), _) => m.to_string(),
        (None, Some(merge)) => merge.message.clone(),
        (None, None) => return Err(StateError::EmptyMessage.into()),
    };

    let old_tree = state.head_tree();
    let was_detached = state.is_detached();
    let root = state.head_oid().is_none();
    let merging = state.merge_state.is_some();
    let next = staged.record_commit(&message, &engine.author(), engine.now())?;

    let Some(commit) = next.head_commit() else {
        return Ok(CommandOutput::new(String::new(), next));
    };
    let location = match (was_detached, next.current_branch()) {
        (false, Some(branch)) => branch.name.to_string(),
        _ => "detached HEAD".to_string(),
    };
    let root_marker = if root { " (root-commit)" } else { "" };
    let mut text = format!(
        "[{location}{root_marker} {}] {}\n",
        engine.short(&commit.hash),
        commit.summary()
    );
    if !merging || commit.tree != old_tree {
        text.push_str(&change_summary(&old_tree, &commit.tree));
    }
    Ok(CommandOutput::new(text.trim_end(), next))
}

pub(super) fn restore(
    state: &RepositoryState,
    paths: &[String],
    staged: bool,
) -> Result<CommandOutput, EngineError> {
    let mut next = state.clone();
    for spec in paths {
        for path in expand_pathspec(state, spec)? {
            next = if staged {
                next.unstage_file(&path)?
            } else {
                next.discard_working_changes(&path)?
            };
        }
    }
    Ok(CommandOutput::new(String::new(), next))
}

pub(super) fn help(state: &RepositoryState) -> CommandOutput {
    const HELP: &str = "usage: git <command> [<args>]

start a working area
   init       Create an empty Git repository
   clone      Clone a repository

work on the current change
   add        Add file contents to the index
   restore    Restore working tree files
   reset      Reset current HEAD to the specified state

examine the history and state
   status     Show the working tree status
   log        Show commit logs
   diff       Show changes between commits, commit and working tree, etc

grow, mark and tweak your common history
   branch     List, create, or delete branches
   checkout   Switch branches or restore working tree files
   commit     Record changes to the repository
   merge      Join two development histories together
   revert     Revert an existing commit

collaborate
   remote     Manage set of tracked repositories
   fetch      Download objects and refs from another repository
   pull       Fetch from and integrate with another repository
   push       Update remote refs along with associated objects";
    CommandOutput::unchanged(HELP, state)
}
