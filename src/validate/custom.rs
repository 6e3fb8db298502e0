//! validate::custom
//!
//! Hand-written quest validators, selected by name in criteria JSON:
//!
//! ```json
//! { "type": "custom",
//!   "validator": { "name": "requiredCommitHashes", "hashes": ["3f2a9c1"] } }
//! ```
//!
//! The set is closed. A quest naming a validator that does not exist fails
//! to deserialize instead of failing at grading time.

use serde::{Deserialize, Serialize};

use super::Verdict;
use crate::core::graph::CommitGraph;
use crate::core::object::{tree_from_files, tree_from_snapshot};
use crate::core::state::RepositoryState;
use crate::merge::conflict::has_conflict_markers;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum CustomValidator {
    /// HEAD is at one of `hashes` (full or abbreviated).
    RequiredCommitHashes { hashes: Vec<String> },
    BranchDeleted { branch: String },
    /// No working file holds conflict markers and no conflict is pending.
    NoConflictMarkers,
    /// Nothing staged, nothing modified, nothing untracked.
    CleanWorkingTree,
    HeadOnBranch { branch: String },
    /// Some commit reachable from HEAD mentions `text`, ignoring case.
    CommitMessageContains { text: String },
}

impl CustomValidator {
    pub(super) fn check(&self, state: &RepositoryState) -> Verdict {
        match self {
            CustomValidator::RequiredCommitHashes { hashes } => {
                let head = state.head_oid();
                let hit = head.as_ref().is_some_and(|oid| {
                    hashes
                        .iter()
                        .any(|h| h.len() >= 4 && oid.starts_with(h))
                });
                let actual = head.map(|oid| oid.to_string()).unwrap_or_default();
                Verdict::new(
                    hit,
                    if hit {
                        "HEAD is at the expected commit.".to_string()
                    } else {
                        "HEAD is not at any of the expected commits.".to_string()
                    },
                )
                .with_details(serde_json::json!({ "expected": hashes, "actual": actual }))
            }
            CustomValidator::BranchDeleted { branch } => {
                let gone = state.find_branch(branch).is_none();
                Verdict::new(
                    gone,
                    if gone {
                        format!("Branch '{branch}' has been deleted.")
                    } else {
                        format!("Branch '{branch}' still exists.")
                    },
                )
            }
            CustomValidator::NoConflictMarkers => {
                let mut marked: Vec<String> = state
                    .working_directory
                    .iter()
                    .filter(|(_, entry)| has_conflict_markers(&entry.content))
                    .map(|(path, _)| path.clone())
                    .collect();
                if let Some(merge) = &state.merge_state {
                    marked.extend(merge.conflicts.iter().cloned());
                }
                marked.sort();
                marked.dedup();
                let clean = marked.is_empty();
                Verdict::new(
                    clean,
                    if clean {
                        "No conflict markers remain.".to_string()
                    } else {
                        format!("Unresolved conflicts in: {}", marked.join(", "))
                    },
                )
                .with_details(serde_json::json!({ "conflicted": marked }))
            }
            CustomValidator::CleanWorkingTree => {
                let dirty = state.unstaged_paths();
                let working = tree_from_files(&state.working_directory).hash;
                let head = tree_from_snapshot(&state.head_tree()).hash;
                let clean = working == head && dirty.is_empty() && !state.has_staged_changes();
                Verdict::new(
                    clean,
                    if clean {
                        "The working tree is clean.".to_string()
                    } else {
                        "The working tree has uncommitted changes.".to_string()
                    },
                )
                .with_details(serde_json::json!({
                    "unstaged": dirty,
                    "workingTree": working.to_string(),
                    "headTree": head.to_string(),
                }))
            }
            CustomValidator::HeadOnBranch { branch } => {
                let on = !state.is_detached() && state.head == *branch;
                Verdict::new(
                    on,
                    if on {
                        format!("HEAD is on '{branch}'.")
                    } else {
                        format!("HEAD should be on '{branch}' but is on '{}'.", state.head)
                    },
                )
            }
            CustomValidator::CommitMessageContains { text } => {
                let needle = text.to_lowercase();
                let found = state.head_oid().is_some_and(|head| {
                    CommitGraph::from_state(state)
                        .history(&head)
                        .iter()
                        .filter_map(|oid| state.commit(oid))
                        .any(|c| c.message.to_lowercase().contains(&needle))
                });
                Verdict::new(
                    found,
                    if found {
                        format!("Found a commit mentioning \"{text}\".")
                    } else {
                        format!("No commit message mentions \"{text}\".")
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchName, UtcTimestamp};

    fn committed() -> RepositoryState {
        RepositoryState::new("c")
            .initialize(&BranchName::default())
            .with_file("a", "1\n")
            .stage_all()
            .unwrap()
            .record_commit("Fix the timeline", "T <t@x>", UtcTimestamp::now())
            .unwrap()
    }

    #[test]
    fn required_hashes_accept_prefixes() {
        let state = committed();
        let head = state.head_oid().unwrap();
        let ok = CustomValidator::RequiredCommitHashes {
            hashes: vec!["ffff".into(), head.short(7).into()],
        };
        assert!(ok.check(&state).success);
        let short = CustomValidator::RequiredCommitHashes {
            hashes: vec![head.short(2).into()],
        };
        assert!(!short.check(&state).success);
    }

    #[test]
    fn conflict_markers_are_found() {
        let state = committed().with_file("a", "<<<<<<< HEAD\nx\n=======\ny\n>>>>>>> b\n");
        let verdict = CustomValidator::NoConflictMarkers.check(&state);
        assert!(!verdict.success);
        assert_eq!(verdict.feedback, "Unresolved conflicts in: a");
        assert!(CustomValidator::NoConflictMarkers.check(&committed()).success);
    }

    #[test]
    fn clean_tree_and_head_branch() {
        let state = committed();
        assert!(CustomValidator::CleanWorkingTree.check(&state).success);
        assert!(!CustomValidator::CleanWorkingTree
            .check(&state.with_file("new", "x"))
            .success);
        let staged_only = committed()
            .with_file("a", "changed\n")
            .stage_file("a")
            .unwrap();
        assert!(!CustomValidator::CleanWorkingTree.check(&staged_only).success);

        let verdict = CustomValidator::CleanWorkingTree.check(&state.without_file("a"));
        assert!(!verdict.success);
        let details = verdict.details.as_ref().expect("details present");
        assert_ne!(details["workingTree"], details["headTree"]);
        assert!(CustomValidator::HeadOnBranch { branch: "main".into() }
            .check(&state)
            .success);
    }

    #[test]
    fn message_search_ignores_case() {
        let state = committed();
        let v = CustomValidator::CommitMessageContains {
            text: "TIMELINE".into(),
        };
        assert!(v.check(&state).success);
        assert!(CustomValidator::BranchDeleted {
            branch: "gone".into()
        }
        .check(&state)
        .success);
    }

    #[test]
    fn unknown_validator_fails_to_parse() {
        let parsed: Result<CustomValidator, _> =
            serde_json::from_str(r#"{ "name": "doesNotExist" }"#);
        assert!(parsed.is_err());
        let parsed: CustomValidator =
            serde_json::from_str(r#"{ "name": "headOnBranch", "branch": "main" }"#).unwrap();
        assert_eq!(parsed, CustomValidator::HeadOnBranch { branch: "main".into() });
    }
}
