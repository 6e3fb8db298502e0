//! log, diff

use std::collections::BTreeSet;

use super::{CommandOutput, EngineError};
use crate::core::files::{changed_paths, Snapshot};
use crate::core::graph::CommitGraph;
use crate::core::state::{Commit, HeadRef, RepositoryState};
use crate::engine::Engine;
use crate::merge::diff::unified_diff;

/// `HEAD -> main, origin/main, feature` for a commit, or empty.
fn decorations(state: &RepositoryState, commit: &Commit) -> String {
    let mut refs = Vec::new();
    let head = state.head_ref();
    let current = match &head {
        HeadRef::Branch(name) => Some(name.as_str()),
        _ => None,
    };
    if state.head_oid().as_ref() == Some(&commit.hash) {
        refs.push(match current {
            Some(name) => format!("HEAD -> {name}"),
            None => "HEAD".to_string(),
        });
    }
    let mut locals: Vec<&str> = state
        .branches
        .iter()
        .filter(|b| b.commit_hash.as_ref() == Some(&commit.hash))
        .map(|b| b.name.as_str())
        .filter(|name| Some(*name) != current || state.head_oid().as_ref() != Some(&commit.hash))
        .collect();
    locals.sort();
    let mut remotes: Vec<String> = state
        .remotes
        .iter()
        .flat_map(|r| {
            r.branches
                .iter()
                .filter(|b| b.commit_hash.as_ref() == Some(&commit.hash))
                .map(move |b| format!("{}/{}", r.name, b.name))
        })
        .collect();
    remotes.sort();
    refs.extend(remotes);
    refs.extend(locals.into_iter().map(str::to_string));
    refs.join(", ")
}

fn full_entry(engine: &Engine, state: &RepositoryState, commit: &Commit) -> String {
    let mut out = format!("commit {}", commit.hash);
    let refs = decorations(state, commit);
    if !refs.is_empty() {
        out.push_str(&format!(" ({refs})"));
    }
    out.push('\n');
    if commit.is_merge() {
        let parents: Vec<&str> = commit.parent_ids().into_iter().map(|p| engine.short(p)).collect();
        out.push_str(&format!("Merge: {}\n", parents.join(" ")));
    }
    out.push_str(&format!(
        "Author: {}\nDate:   {}\n\n",
        commit.author,
        commit.timestamp.git_display()
    ));
    for line in commit.message.lines() {
        out.push_str(&format!("    {line}\n"));
    }
    out
}

fn oneline_entry(engine: &Engine, state: &RepositoryState, commit: &Commit) -> String {
    let refs = decorations(state, commit);
    if refs.is_empty() {
        format!("{} {}", engine.short(&commit.hash), commit.summary())
    } else {
        format!("{} ({refs}) {}", engine.short(&commit.hash), commit.summary())
    }
}

pub(super) fn log(
    engine: &Engine,
    state: &RepositoryState,
    oneline: bool,
    limit: Option<usize>,
) -> Result<CommandOutput, EngineError> {
    let Some(head) = state.head_oid() else {
        return Err(EngineError::precondition(format!(
            "fatal: your current branch '{}' does not have any commits yet",
            state.head
        )));
    };
    let graph = CommitGraph::from_state(state);
    let entries: Vec<String> = graph
        .history(&head)
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .filter_map(|oid| state.commit(oid))
        .map(|commit| {
            if oneline {
                oneline_entry(engine, state, commit)
            } else {
                full_entry(engine, state, commit)
            }
        })
        .collect();
    Ok(CommandOutput::unchanged(entries.join("\n").trim_end(), state))
}

fn path_matches(path: &str, filter: Option<&str>) -> bool {
    match filter.map(|f| f.trim_end_matches('/')) {
        None | Some("") | Some(".") => true,
        Some(f) => path == f || path.starts_with(&format!("{f}/")),
    }
}

pub(super) fn diff(
    engine: &Engine,
    state: &RepositoryState,
    staged: bool,
    filter: Option<&str>,
) -> CommandOutput {
    let index = state.index_view();
    let (old, new): (Snapshot, Snapshot) = if staged {
        (state.head_tree(), index.clone())
    } else {
        // Untracked files are not part of `git diff`
        let tracked: Snapshot = state
            .working_snapshot()
            .into_iter()
            .filter(|(path, _)| index.contains_key(path))
            .collect();
        (index.clone(), tracked)
    };

    let paths: BTreeSet<String> = changed_paths(&old, &new)
        .into_iter()
        .filter(|p| path_matches(p, filter))
        .collect();
    let text: String = paths
        .iter()
        .map(|path| {
            unified_diff(
                path,
                old.get(path).map(String::as_str),
                new.get(path).map(String::as_str),
                engine.config().abbrev(),
            )
        })
        .collect();
    CommandOutput::unchanged(text.trim_end(), state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchName, UtcTimestamp};
    use crate::engine::FixedClock;

    fn engine() -> Engine {
        Engine::default().with_clock(FixedClock(UtcTimestamp::parse("2024-01-01T00:00:00Z").unwrap()))
    }

    fn two_commits() -> RepositoryState {
        let ts = UtcTimestamp::parse("2024-01-01T00:00:00Z").unwrap();
        RepositoryState::new("h")
            .initialize(&BranchName::default())
            .with_file("a.txt", "one\n")
            .stage_all()
            .unwrap()
            .record_commit("first", "Learner <l@x>", ts)
            .unwrap()
            .create_branch("feature", None)
            .unwrap()
            .with_file("a.txt", "two\n")
            .stage_all()
            .unwrap()
            .record_commit("second\n\nwith body", "Learner <l@x>", ts)
            .unwrap()
    }

    #[test]
    fn log_lists_newest_first_with_decorations() {
        let state = two_commits();
        let text = log(&engine(), &state, false, None).unwrap().text;
        let tip = state.head_oid().unwrap();
        assert!(text.starts_with(&format!("commit {tip} (HEAD -> main)\n")));
        assert!(text.contains("Author: Learner <l@x>\nDate:   Mon Jan 1 00:00:00 2024 +0000\n\n    second\n    \n    with body\n"));
        assert!(text.contains("(feature)"));
        assert_eq!(text.matches("commit ").count(), 2);
    }

    #[test]
    fn oneline_and_limit() {
        let state = two_commits();
        let text = log(&engine(), &state, true, Some(1)).unwrap().text;
        let tip = state.head_oid().unwrap();
        assert_eq!(text, format!("{} (HEAD -> main) second", tip.short(7)));
    }

    #[test]
    fn log_without_commits_fails() {
        let state = RepositoryState::new("e").initialize(&BranchName::default());
        let err = log(&engine(), &state, false, None).unwrap_err();
        assert!(err.to_string().contains("does not have any commits yet"));
    }

    #[test]
    fn diff_working_and_staged() {
        let state = two_commits().with_file("a.txt", "three\n").with_file("new.txt", "x\n");
        let text = diff(&engine(), &state, false, None).text;
        assert!(text.contains("-two\n+three"));
        assert!(!text.contains("new.txt"));

        let staged = state.stage_all().unwrap();
        assert_eq!(diff(&engine(), &staged, false, None).text, "");
        let text = diff(&engine(), &staged, true, None).text;
        assert!(text.contains("diff --git a/new.txt b/new.txt"));
        assert!(text.contains("diff --git a/a.txt b/a.txt"));
        let only_a = diff(&engine(), &staged, true, Some("a.txt")).text;
        assert!(!only_a.contains("new.txt"));
    }
}
