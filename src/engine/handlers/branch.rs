//! branch, checkout

use super::{carry_changes, expand_pathspec, overwrite_error, CommandOutput, EngineError};
use crate::core::state::{HeadRef, RepositoryState, StateError};
use crate::core::types::Oid;
use crate::engine::command::{BranchAction, CheckoutTarget};
use crate::engine::Engine;

pub(super) fn branch(
    engine: &Engine,
    state: &RepositoryState,
    action: &BranchAction,
) -> Result<CommandOutput, EngineError> {
    match action {
        BranchAction::List => Ok(CommandOutput::unchanged(list(engine, state), state)),
        BranchAction::Create { name, start } => {
            let start = match start {
                Some(spec) => Some(
                    state
                        .resolve_ref(spec)
                        .ok_or_else(|| StateError::NoCommitsYet(spec.clone()))?,
                ),
                None => None,
            };
            let next = state.create_branch(name, start)?;
            Ok(CommandOutput::new(String::new(), next))
        }
        BranchAction::Delete { name, force } => {
            let tip = state
                .find_branch(name)
                .and_then(|b| b.commit_hash.clone());
            let next = state.delete_branch(name, *force)?;
            let text = match tip {
                Some(oid) => format!("Deleted branch {name} (was {}).", engine.short(&oid)),
                None => format!("Deleted branch {name}."),
            };
            Ok(CommandOutput::new(text, next))
        }
    }
}

fn list(engine: &Engine, state: &RepositoryState) -> String {
    let mut lines = Vec::new();
    if let HeadRef::Detached(oid) = state.head_ref() {
        lines.push(format!("* (HEAD detached at {})", engine.short(&oid)));
    }
    let mut names: Vec<&str> = state
        .branches
        .iter()
        .filter(|b| b.commit_hash.is_some())
        .map(|b| b.name.as_str())
        .collect();
    names.sort();
    for name in names {
        let marker = if state.head == name { "*" } else { " " };
        lines.push(format!("{marker} {name}"));
    }
    lines.join("\n")
}

/// `Previous HEAD position was ...` when leaving a detached HEAD.
fn previous_position(engine: &Engine, state: &RepositoryState) -> Option<String> {
    if !state.is_detached() {
        return None;
    }
    let commit = state.head_commit()?;
    Some(format!(
        "Previous HEAD position was {} {}\n",
        engine.short(&commit.hash),
        commit.summary()
    ))
}

/// Move HEAD to `head` (a branch name or full hash) whose tree is `target`,
/// carrying local changes along.
fn switch(
    state: &RepositoryState,
    head: &str,
    target: Option<&Oid>,
) -> Result<(RepositoryState, String), EngineError> {
    let tree = target
        .and_then(|oid| state.commit(oid))
        .map(|c| c.tree.clone())
        .unwrap_or_default();
    let carried = carry_changes(state, &tree)
        .map_err(|paths| overwrite_error(&paths, "checkout", "switch branches"))?;

    let mut next = state.set_head(head)?;
    // Leaving an unborn branch forgets it, as git never wrote the ref
    if let Some(unborn) = state.current_branch().filter(|b| b.commit_hash.is_none()) {
        if unborn.name.as_str() != head {
            next.branches.retain(|b| b.name != unborn.name);
        }
    }
    let next = next
        .with_working_snapshot(&carried.working)
        .with_staging(carried.staging);
    let modified: String = carried.modified.iter().map(|p| format!("M\t{p}\n")).collect();
    Ok((next, modified))
}

fn ensure_no_merge(state: &RepositoryState) -> Result<(), EngineError> {
    match &state.merge_state {
        Some(_) => Err(EngineError::precondition(
            "error: you need to resolve your current index first",
        )),
        None => Ok(()),
    }
}

/// The remote that has `branch`, `origin` first.
fn remote_with_branch<'a>(state: &'a RepositoryState, branch: &str) -> Option<(&'a str, Oid)> {
    state
        .remotes
        .iter()
        .filter(|r| r.branch_tip(branch).is_some())
        .min_by_key(|r| r.name.as_str() != "origin")
        .and_then(|r| Some((r.name.as_str(), r.branch_tip(branch)?.clone())))
}

pub(super) fn checkout(
    engine: &Engine,
    state: &RepositoryState,
    target: &CheckoutTarget,
) -> Result<CommandOutput, EngineError> {
    match target {
        CheckoutTarget::Ref(name) => checkout_ref(engine, state, name),
        CheckoutTarget::NewBranch { name, start } => {
            ensure_no_merge(state)?;
            checkout_new_branch(engine, state, name, start.as_deref())
        }
        CheckoutTarget::Paths(paths) => checkout_paths(state, paths),
    }
}

fn checkout_ref(
    engine: &Engine,
    state: &RepositoryState,
    name: &str,
) -> Result<CommandOutput, EngineError> {
    if let Some(branch) = state.find_branch(name) {
        ensure_no_merge(state)?;
        if state.head == name {
            return Ok(CommandOutput::unchanged(format!("Already on '{name}'"), state));
        }
        let previous = previous_position(engine, state).unwrap_or_default();
        let (next, modified) = switch(state, name, branch.commit_hash.as_ref())?;
        return Ok(CommandOutput::new(
            format!("{modified}{previous}Switched to branch '{name}'"),
            next,
        ));
    }

    if let Some(oid) = state.resolve_ref(name) {
        ensure_no_merge(state)?;
        let previous = previous_position(engine, state);
        let (next, modified) = switch(state, oid.as_str(), Some(&oid))?;
        let summary = next.head_commit().map(|c| c.summary()).unwrap_or_default();
        let intro = match previous {
            Some(previous) => previous,
            None => format!(
                "Note: switching to '{name}'.\n\n\
                 You are in 'detached HEAD' state. You can look around, make experimental\n\
                 changes and commit them, and you can discard any commits you make in this\n\
                 state without impacting any branches by switching back to a branch.\n\n"
            ),
        };
        let text = format!(
            "{modified}{intro}HEAD is now at {} {summary}",
            engine.short(&oid)
        );
        return Ok(CommandOutput::new(text, next));
    }

    if let Some((remote, tip)) = remote_with_branch(state, name) {
        ensure_no_merge(state)?;
        let remote = remote.to_string();
        let created = state.create_branch(name, Some(tip.clone()))?;
        let (next, modified) = switch(&created, name, Some(&tip))?;
        return Ok(CommandOutput::new(
            format!(
                "{modified}branch '{name}' set up to track '{remote}/{name}'.\nSwitched to a new branch '{name}'"
            ),
            next,
        ));
    }

    let index = state.index_view();
    if index.contains_key(name) || index.keys().any(|p| p.starts_with(&format!("{name}/"))) {
        return checkout_paths(state, &[name.to_string()]);
    }
    Err(StateError::UntrackedPath(name.to_string()).into())
}

fn checkout_new_branch(
    engine: &Engine,
    state: &RepositoryState,
    name: &str,
    start: Option<&str>,
) -> Result<CommandOutput, EngineError> {
    let switched = format!("Switched to a new branch '{name}'");
    let head = state.head_oid();
    if head.is_none() && start.is_none() {
        let next = state.start_unborn_branch(name)?;
        return Ok(CommandOutput::new(switched, next));
    }

    let start_oid = match start {
        Some(spec) => state
            .resolve_ref(spec)
            .ok_or_else(|| StateError::NoCommitsYet(spec.to_string()))?,
        None => head.ok_or_else(|| StateError::NoCommitsYet(state.head.clone()))?,
    };
    let created = state.create_branch(name, Some(start_oid.clone()))?;
    let previous = previous_position(engine, state).unwrap_or_default();
    let (next, modified) = switch(&created, name, Some(&start_oid))?;

    let tracking = start
        .and_then(|spec| spec.split_once('/'))
        .filter(|(remote, branch)| {
            state
                .find_remote(remote)
                .is_some_and(|r| r.branch_tip(branch).is_some())
        })
        .map(|(remote, branch)| format!("branch '{name}' set up to track '{remote}/{branch}'.\n"))
        .unwrap_or_default();
    Ok(CommandOutput::new(
        format!("{modified}{previous}{tracking}{switched}"),
        next,
    ))
}

/// `checkout -- <path>`: overwrite working files from the index.
fn checkout_paths(state: &RepositoryState, specs: &[String]) -> Result<CommandOutput, EngineError> {
    let conflicts = state
        .merge_state
        .as_ref()
        .map(|m| m.conflicts.clone())
        .unwrap_or_default();
    let index = state.index_view();
    let mut next = state.clone();
    let mut restored = 0;
    for spec in specs {
        for path in expand_pathspec(state, spec)? {
            if conflicts.contains(&path) {
                return Err(EngineError::precondition(format!("error: path '{path}' is unmerged")));
            }
            if !index.contains_key(&path) {
                return Err(StateError::UntrackedPath(path).into());
            }
            next = next.discard_working_changes(&path)?;
            restored += 1;
        }
    }
    let noun = if restored == 1 { "path" } else { "paths" };
    Ok(CommandOutput::new(
        format!("Updated {restored} {noun} from the index"),
        next,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UtcTimestamp;
    use crate::engine::FixedClock;

    fn engine() -> Engine {
        Engine::default().with_clock(FixedClock(UtcTimestamp::parse("2024-03-01T09:00:00Z").unwrap()))
    }

    fn run(state: &RepositoryState, lines: &[&str]) -> RepositoryState {
        let engine = engine();
        lines.iter().fold(state.clone(), |state, line| {
            let run = engine.execute(&state, line).unwrap();
            assert!(run.is_success(), "{line}: {:?}", run.error);
            run.new_state
        })
    }

    fn base() -> RepositoryState {
        let state = run(&RepositoryState::new("b"), &["git init"]).with_file("story.txt", "start\n");
        run(&state, &["git add story.txt", "git commit -m start"])
    }

    #[test]
    fn list_marks_current_branch() {
        let state = run(&base(), &["git branch zeta", "git branch alpha"]);
        assert_eq!(list(&engine(), &state), "  alpha\n* main\n  zeta");
    }

    #[test]
    fn delete_reports_old_tip() {
        let state = run(&base(), &["git branch old"]);
        let tip = state.head_oid().unwrap();
        let out = branch(
            &engine(),
            &state,
            &BranchAction::Delete {
                name: "old".into(),
                force: false,
            },
        )
        .unwrap();
        assert_eq!(out.text, format!("Deleted branch old (was {}).", tip.short(7)));
        assert!(out.state.find_branch("old").is_none());
    }

    #[test]
    fn switching_rewrites_working_tree() {
        let state = run(&base(), &["git checkout -b feature"]).with_file("story.txt", "feature\n");
        let state = run(&state, &["git commit -am feature"]);
        let out = checkout(&engine(), &state, &CheckoutTarget::Ref("main".into())).unwrap();
        assert_eq!(out.text, "Switched to branch 'main'");
        assert_eq!(out.state.working_directory["story.txt"].content, "start\n");
        assert_eq!(out.state.head, "main");
    }

    #[test]
    fn dirty_conflicting_file_blocks_checkout() {
        let state = run(&base(), &["git checkout -b feature"]).with_file("story.txt", "feature\n");
        let state = run(&state, &["git commit -am feature", "git checkout main"])
            .with_file("story.txt", "local edit\n");
        let err = checkout(&engine(), &state, &CheckoutTarget::Ref("feature".into())).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("error: Your local changes to the following files would be overwritten by checkout:\n\tstory.txt\n"));
    }

    #[test]
    fn detached_checkout_and_back() {
        let state = base();
        let oid = state.head_oid().unwrap();
        let out = checkout(&engine(), &state, &CheckoutTarget::Ref(oid.short(7).into())).unwrap();
        assert!(out.state.is_detached());
        assert!(out.text.ends_with(&format!("HEAD is now at {} start", oid.short(7))));

        let back = checkout(&engine(), &out.state, &CheckoutTarget::Ref("main".into())).unwrap();
        assert!(back.text.starts_with("Previous HEAD position was"));
        assert_eq!(back.state.head, "main");
        assert_eq!(list(&engine(), &out.state).lines().next(), Some(format!("* (HEAD detached at {})", oid.short(7)).as_str()));
    }

    #[test]
    fn unborn_checkout_b_renames_branch() {
        let state = run(&RepositoryState::new("u"), &["git init", "git checkout -b trunk"]);
        assert_eq!(state.head, "trunk");
        assert!(state.find_branch("main").is_none());
    }

    #[test]
    fn checkout_path_restores_from_index() {
        let state = base().with_file("story.txt", "scribbles\n");
        let out = checkout(&engine(), &state, &CheckoutTarget::Ref("story.txt".into())).unwrap();
        assert_eq!(out.text, "Updated 1 path from the index");
        assert_eq!(out.state.working_directory["story.txt"].content, "start\n");
        let err = checkout(&engine(), &state, &CheckoutTarget::Ref("nope".into())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "error: pathspec 'nope' did not match any file(s) known to git"
        );
    }

    #[test]
    fn remote_branch_dwim_creates_tracking_branch() {
        let state = base().add_remote("origin", "https://example.com/r.git").unwrap();
        let tip = state.head_oid().unwrap();
        let state = state.set_remote_branch("origin", "topic", tip).unwrap();
        let out = checkout(&engine(), &state, &CheckoutTarget::Ref("topic".into())).unwrap();
        assert!(out.text.starts_with("branch 'topic' set up to track 'origin/topic'."));
        assert_eq!(out.state.head, "topic");
    }
}
