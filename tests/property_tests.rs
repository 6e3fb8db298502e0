//! Property-based tests for the repository model.
//!
//! These tests use proptest to check that invariants hold across randomly
//! generated file contents and command sequences.

use proptest::prelude::*;

use gitdojo::core::files::Snapshot;
use gitdojo::core::object::Blob;
use gitdojo::core::state::{Commit, RepositoryState};
use gitdojo::core::types::{BranchName, Oid, UtcTimestamp};
use gitdojo::core::verify::verify_state;
use gitdojo::engine::{Engine, FixedClock};
use gitdojo::merge::conflict::{accept_current, accept_incoming, has_conflict_markers, render_conflict};
use gitdojo::merge::merge_trees;

fn engine() -> Engine {
    Engine::default().with_clock(FixedClock(
        UtcTimestamp::parse("2024-01-01T00:00:00Z").unwrap(),
    ))
}

/// Strategy for short file paths.
fn path() -> impl Strategy<Value = String> {
    "[a-z]{1,6}(\\.txt)?"
}

/// Strategy for file contents: a few newline-terminated lines.
fn content() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z ]{0,12}", 0..5).prop_map(|lines| {
        lines.into_iter().map(|l| l + "\n").collect()
    })
}

fn snapshot() -> impl Strategy<Value = Snapshot> {
    prop::collection::btree_map(path(), content(), 1..5)
        .prop_map(|files| files.into_iter().collect())
}

fn committed(files: &Snapshot) -> RepositoryState {
    let state = files.iter().fold(
        RepositoryState::new("prop").initialize(&BranchName::default()),
        |state, (path, content)| state.with_file(path, content),
    );
    state
        .stage_all()
        .unwrap()
        .record_commit("snapshot", "Prop <prop@example.com>", UtcTimestamp::parse("2024-01-01T00:00:00Z").unwrap())
        .unwrap()
}

proptest! {
    /// Blob ids depend only on content.
    #[test]
    fn blob_hash_is_deterministic(text in ".{0,64}") {
        let a = Blob::from_content(text.clone());
        let b = Blob::from_content(text);
        prop_assert_eq!(&a.hash, &b.hash);
        prop_assert_eq!(a.hash.as_str().len(), 64);
        prop_assert!(Oid::new(a.hash.as_str()).is_ok());
    }

    /// Identical commit inputs give identical ids; any message change moves the id.
    #[test]
    fn commit_hash_is_deterministic(tree in snapshot(), message in "[a-z]{1,20}") {
        let at = UtcTimestamp::parse("2024-05-05T05:05:05Z").unwrap();
        let a = Commit::new(message.clone(), "A <a@x>", at, vec![], tree.clone());
        let b = Commit::new(message.clone(), "A <a@x>", at, vec![], tree.clone());
        prop_assert_eq!(&a.hash, &b.hash);
        let c = Commit::new(message + "!", "A <a@x>", at, vec![], tree);
        prop_assert_ne!(&a.hash, &c.hash);
    }

    /// Later commands never change a commit that already exists.
    #[test]
    fn commits_are_immutable(files in snapshot(), edit in content()) {
        let engine = engine();
        let state = committed(&files);
        let first = state.commits[0].clone();

        let path = files.keys().next().unwrap().clone();
        let edited = state.with_file(&path, &edit);
        let run = engine.execute(&edited, "git commit -am edit").unwrap();
        let next = run.new_state;
        prop_assert_eq!(&next.commits[0], &first);
        prop_assert!(verify_state(&next).ok);

        let reset = engine.execute(&next, &format!("git reset --hard {}", first.hash)).unwrap();
        prop_assert!(reset.is_success());
        prop_assert_eq!(&reset.new_state.commits[0], &first);
    }

    /// Hard reset restores the target tree exactly and leaves nothing pending.
    #[test]
    fn hard_reset_restores_tree(files in snapshot(), later in snapshot()) {
        let engine = engine();
        let state = committed(&files);
        let target = state.head_oid().unwrap();
        let messy = later
            .iter()
            .fold(state, |s, (path, content)| s.with_file(path, content));
        let messy = engine.execute(&messy, "git add -A").unwrap().new_state;

        let run = engine.execute(&messy, &format!("git reset --hard {target}")).unwrap();
        prop_assert!(run.is_success());
        let reset = run.new_state;
        prop_assert_eq!(reset.working_snapshot(), files);
        prop_assert!(!reset.has_staged_changes());
        prop_assert!(reset.unstaged_paths().is_empty());
    }

    /// Mixed reset keeps working content but empties the index delta.
    #[test]
    fn mixed_reset_keeps_working_tree(files in snapshot(), later in snapshot()) {
        let engine = engine();
        let state = committed(&files);
        let touched = later
            .iter()
            .fold(state, |s, (path, content)| s.with_file(path, content));
        let staged = engine.execute(&touched, "git add -A").unwrap().new_state;

        let run = engine.execute(&staged, "git reset").unwrap();
        prop_assert!(run.is_success());
        prop_assert_eq!(run.new_state.working_snapshot(), touched.working_snapshot());
        prop_assert!(!run.new_state.has_staged_changes());
    }

    /// Rendering a conflict and taking one side gives that side back.
    #[test]
    fn conflict_sides_round_trip(current in content(), incoming in content()) {
        let text = render_conflict(&current, &incoming, "topic");
        prop_assert!(has_conflict_markers(&text));
        prop_assert_eq!(accept_current(&text).unwrap(), current);
        prop_assert_eq!(accept_incoming(&text).unwrap(), incoming);
    }

    /// Merging a tree with itself changes nothing and never conflicts.
    #[test]
    fn self_merge_is_clean(base in snapshot(), ours in snapshot()) {
        let merged = merge_trees(&base, &ours, &ours, "self");
        prop_assert!(merged.is_clean());
        prop_assert_eq!(merged.merged, ours);
    }
}
