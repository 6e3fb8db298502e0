//! core::verify
//!
//! Structural verification of a repository state.
//!
//! # Checks
//!
//! - Branch and remote-branch pointers name existing commits
//! - Parent links name commits that appear earlier in the log
//! - Commit hashes are unique; merge commits list exactly two parents
//! - A detached HEAD names an existing commit
//! - An in-progress merge names an existing incoming commit
//! - The parent graph is acyclic
//!
//! # Invariants
//!
//! - Never mutates the state
//! - Deterministic: errors are reported in a stable order
//!
//! The engine runs this after every successful command. A failure there is
//! an engine bug, not a learner mistake.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::graph::CommitGraph;
use super::state::{HeadRef, RepositoryState};

/// Errors from verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("branch '{branch}' points at unknown commit {oid}")]
    DanglingBranch { branch: String, oid: String },

    #[error("remote branch '{remote}/{branch}' points at unknown commit {oid}")]
    DanglingRemoteBranch {
        remote: String,
        branch: String,
        oid: String,
    },

    #[error("duplicate branch name '{0}'")]
    DuplicateBranch(String),

    #[error("commit {commit} has parent {parent} that is missing or appears later in the log")]
    MissingParent { commit: String, parent: String },

    #[error("commit {0} appears more than once")]
    DuplicateCommit(String),

    #[error("commit {0} has a malformed parent list")]
    MalformedParents(String),

    #[error("detached HEAD points at unknown commit {0}")]
    DanglingHead(String),

    #[error("merge in progress references unknown commit {0}")]
    DanglingMerge(String),

    #[error("cycle detected in commit graph at {0}")]
    CycleDetected(String),
}

/// Result of verification.
#[derive(Debug)]
pub struct VerifyResult {
    /// Whether verification passed
    pub ok: bool,
    /// Errors found during verification
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    /// Create a failed result with errors.
    pub fn failure(errors: Vec<VerifyError>) -> Self {
        Self { ok: false, errors }
    }

    /// First error, if any.
    pub fn into_result(self) -> Result<(), VerifyError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Verify every structural invariant of `state`.
pub fn verify_state(state: &RepositoryState) -> VerifyResult {
    let mut errors = Vec::new();

    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (position, commit) in state.commits.iter().enumerate() {
        if positions.insert(commit.hash.as_str(), position).is_some() {
            errors.push(VerifyError::DuplicateCommit(commit.hash.to_string()));
        }
    }

    for (position, commit) in state.commits.iter().enumerate() {
        if let Some(parents) = &commit.parents {
            if parents.len() != 2 || commit.parent.as_ref() != parents.first() {
                errors.push(VerifyError::MalformedParents(commit.hash.to_string()));
            }
        }
        for parent in commit.parent_ids() {
            let earlier = positions
                .get(parent.as_str())
                .is_some_and(|p| *p < position);
            if !earlier {
                errors.push(VerifyError::MissingParent {
                    commit: commit.hash.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
    }

    let mut names = HashSet::new();
    for branch in &state.branches {
        if !names.insert(branch.name.as_str()) {
            errors.push(VerifyError::DuplicateBranch(branch.name.to_string()));
        }
        if let Some(oid) = &branch.commit_hash {
            if !positions.contains_key(oid.as_str()) {
                errors.push(VerifyError::DanglingBranch {
                    branch: branch.name.to_string(),
                    oid: oid.to_string(),
                });
            }
        }
    }

    for remote in &state.remotes {
        for branch in &remote.branches {
            if let Some(oid) = &branch.commit_hash {
                if !positions.contains_key(oid.as_str()) {
                    errors.push(VerifyError::DanglingRemoteBranch {
                        remote: remote.name.to_string(),
                        branch: branch.name.to_string(),
                        oid: oid.to_string(),
                    });
                }
            }
        }
    }

    if let HeadRef::Detached(oid) = state.head_ref() {
        if !positions.contains_key(oid.as_str()) {
            errors.push(VerifyError::DanglingHead(oid.to_string()));
        }
    }

    if let Some(merge) = &state.merge_state {
        if !positions.contains_key(merge.incoming.as_str()) {
            errors.push(VerifyError::DanglingMerge(merge.incoming.to_string()));
        }
    }

    if let Some(oid) = CommitGraph::from_state(state).find_cycle() {
        errors.push(VerifyError::CycleDetected(oid.to_string()));
    }

    if errors.is_empty() {
        VerifyResult::success()
    } else {
        VerifyResult::failure(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{Branch, Commit};
    use crate::core::types::{BranchName, Oid, UtcTimestamp};

    fn base() -> RepositoryState {
        RepositoryState::new("v")
            .initialize(&BranchName::new("main").unwrap())
            .with_file("a.txt", "1")
            .stage_all()
            .unwrap()
            .record_commit("init", "T", UtcTimestamp::now())
            .unwrap()
    }

    #[test]
    fn fresh_state_verifies() {
        assert!(verify_state(&RepositoryState::new("empty")).ok);
        assert!(verify_state(&base()).ok);
    }

    #[test]
    fn dangling_branch_detected() {
        let mut state = base();
        state.branches.push(Branch {
            name: BranchName::new("ghost").unwrap(),
            commit_hash: Some(Oid::hash_object("commit", b"nowhere")),
        });
        let result = verify_state(&state);
        assert!(!result.ok);
        assert!(matches!(
            result.errors[0],
            VerifyError::DanglingBranch { .. }
        ));
    }

    #[test]
    fn parent_must_precede_child() {
        let mut state = base();
        let orphan = Commit::new(
            "orphan",
            "T",
            UtcTimestamp::now(),
            vec![Oid::hash_object("commit", b"missing")],
            Default::default(),
        );
        state.commits.push_back(orphan);
        assert!(matches!(
            verify_state(&state).into_result(),
            Err(VerifyError::MissingParent { .. })
        ));
    }

    #[test]
    fn duplicate_commit_detected() {
        let mut state = base();
        let first = state.commits[0].clone();
        state.commits.push_back(first);
        assert!(verify_state(&state)
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::DuplicateCommit(_))));
    }

    #[test]
    fn detached_head_must_exist() {
        let mut state = base();
        state.head = Oid::hash_object("commit", b"gone").to_string();
        assert!(matches!(
            verify_state(&state).into_result(),
            Err(VerifyError::DanglingHead(_))
        ));
    }
}
