//! validate
//!
//! Grading of a finished repository state.
//!
//! # Architecture
//!
//! Validation is a pure predicate over a [`RepositoryState`]. A quest
//! supplies one [`ValidationCriteria`]; a boss battle supplies an ordered
//! list, evaluated front to back. The first failing criterion ends the
//! battle and its feedback is what the learner sees. When every criterion
//! passes, their bonus XP is summed.
//!
//! # Example
//!
//! ```
//! use gitdojo::core::state::RepositoryState;
//! use gitdojo::engine::Engine;
//! use gitdojo::validate::{validate, CriteriaSet, Criterion, ValidationCriteria};
//!
//! let engine = Engine::default();
//! let state = engine.execute(&RepositoryState::new("q"), "git init").unwrap().new_state;
//!
//! let quest: CriteriaSet = ValidationCriteria::new(Criterion::BranchExists {
//!     branch_name: "main".into(),
//! })
//! .into();
//! assert!(validate(&quest, &state).success);
//! ```

pub mod criteria;
pub mod custom;

pub use criteria::{CriteriaSet, Criterion, ValidationCriteria};
pub use custom::CustomValidator;

use serde::{Deserialize, Serialize};

use crate::core::graph::CommitGraph;
use crate::core::state::RepositoryState;
use crate::core::types::Oid;

/// Outcome of grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub success: bool,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_xp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Result of one check before feedback overrides apply.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Verdict {
    pub success: bool,
    pub feedback: String,
    pub details: Option<serde_json::Value>,
}

impl Verdict {
    pub(crate) fn new(success: bool, feedback: impl Into<String>) -> Self {
        Self {
            success,
            feedback: feedback.into(),
            details: None,
        }
    }

    pub(crate) fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Grade a quest criterion or a boss battle.
pub fn validate(criteria: &CriteriaSet, state: &RepositoryState) -> ValidationResult {
    match criteria {
        CriteriaSet::Single(one) => evaluate(one, state),
        CriteriaSet::BossBattle(list) => boss_battle(list, state),
    }
}

/// Grade one criterion.
pub fn evaluate(criteria: &ValidationCriteria, state: &RepositoryState) -> ValidationResult {
    let verdict = check(&criteria.check, state);
    tracing::debug!(success = verdict.success, "criterion evaluated");
    let override_message = if verdict.success {
        criteria.success_message.clone()
    } else {
        criteria.failure_message.clone()
    };
    ValidationResult {
        success: verdict.success,
        feedback: override_message.unwrap_or(verdict.feedback),
        bonus_xp: criteria.bonus_xp.filter(|_| verdict.success),
        details: verdict.details,
    }
}

fn boss_battle(list: &[ValidationCriteria], state: &RepositoryState) -> ValidationResult {
    let mut feedback = Vec::with_capacity(list.len());
    let mut bonus: Option<u32> = None;
    for (index, criteria) in list.iter().enumerate() {
        let result = evaluate(criteria, state);
        if !result.success {
            let mut details = result.details.unwrap_or_else(|| serde_json::json!({}));
            if let Some(map) = details.as_object_mut() {
                map.insert("failedIndex".into(), index.into());
            }
            return ValidationResult {
                details: Some(details),
                ..result
            };
        }
        if let Some(xp) = result.bonus_xp {
            bonus = Some(bonus.unwrap_or(0).saturating_add(xp));
        }
        feedback.push(result.feedback);
    }
    ValidationResult {
        success: true,
        feedback: feedback.join("\n"),
        bonus_xp: bonus,
        details: None,
    }
}

fn check(criterion: &Criterion, state: &RepositoryState) -> Verdict {
    match criterion {
        Criterion::CommitExists { min_count, branch } => commit_exists(state, *min_count, branch.as_deref()),
        Criterion::BranchExists { branch_name } => {
            let exists = state.find_branch(branch_name).is_some();
            Verdict::new(
                exists,
                if exists {
                    format!("Branch '{branch_name}' exists.")
                } else {
                    format!("Branch '{branch_name}' does not exist yet.")
                },
            )
        }
        Criterion::FileContent {
            path,
            content,
            must_exist,
        } => file_content(state, path, content.as_deref(), *must_exist),
        Criterion::MergeCompleted {
            branch,
            source,
            allow_fast_forward,
        } => merge_completed(state, branch, source.as_deref(), *allow_fast_forward),
        Criterion::Custom { validator } => validator.check(state),
    }
}

fn commit_exists(state: &RepositoryState, min_count: usize, branch: Option<&str>) -> Verdict {
    let tip = match branch {
        Some(name) => match state.find_branch(name) {
            Some(b) => b.commit_hash.clone(),
            None => return Verdict::new(false, format!("Branch '{name}' does not exist.")),
        },
        None => state.head_oid(),
    };
    let count = tip.map_or(0, |oid| CommitGraph::from_state(state).ancestors(&oid).len());
    let scope = branch.map(|b| format!(" on '{b}'")).unwrap_or_default();
    let noun = if min_count == 1 { "commit" } else { "commits" };
    let success = count >= min_count;
    Verdict::new(
        success,
        if success {
            format!("Found {count} commit(s){scope}.")
        } else {
            format!("Expected at least {min_count} {noun}{scope}, found {count}.")
        },
    )
    .with_details(serde_json::json!({ "minCount": min_count, "found": count }))
}

fn file_content(state: &RepositoryState, path: &str, expected: Option<&str>, must_exist: bool) -> Verdict {
    let actual = state.working_directory.get(path).map(|e| e.content.as_str());
    match (expected, actual) {
        (Some(_), None) => Verdict::new(false, format!("File '{path}' does not exist.")),
        (Some(expected), Some(actual)) => {
            // Editors disagree about the final newline
            let matches = expected.trim_end() == actual.trim_end();
            Verdict::new(
                matches,
                if matches {
                    format!("'{path}' has the expected content.")
                } else {
                    format!("'{path}' does not have the expected content.")
                },
            )
        }
        (None, found) => {
            let ok = found.is_some() == must_exist;
            let message = match (must_exist, ok) {
                (true, true) => format!("File '{path}' exists."),
                (true, false) => format!("File '{path}' does not exist."),
                (false, true) => format!("File '{path}' is gone."),
                (false, false) => format!("File '{path}' should not exist."),
            };
            Verdict::new(ok, message)
        }
    }
}

/// Whether `source` has landed on `branch`.
///
/// A merge commit at or below the branch tip whose incoming side contains
/// the source counts. With `allow_fast_forward`, the source tip merely being
/// reachable from the branch tip counts too.
fn merge_completed(
    state: &RepositoryState,
    branch: &str,
    source: Option<&str>,
    allow_fast_forward: bool,
) -> Verdict {
    if state.merge_state.is_some() && state.head == branch {
        return Verdict::new(false, "The merge is still in progress; resolve and commit it.");
    }
    let Some(tip) = state.find_branch(branch).and_then(|b| b.commit_hash.clone()) else {
        return Verdict::new(false, format!("Branch '{branch}' has no commits."));
    };
    let graph = CommitGraph::from_state(state);
    let source_tip: Option<Oid> = source.and_then(|s| state.resolve_ref(s));
    if let (Some(_), None) = (source, &source_tip) {
        tracing::debug!(?source, "merge source no longer resolves; checking merge commits only");
    }

    let merge_commit = graph.history(&tip).into_iter().find(|oid| {
        let Some(commit) = state.commit(oid) else {
            return false;
        };
        if !commit.is_merge() {
            return false;
        }
        match (&source_tip, source) {
            (Some(src), _) => commit
                .parent_ids()
                .iter()
                .skip(1)
                .any(|p| graph.is_ancestor(src, p)),
            (None, Some(name)) => commit.message.contains(name),
            (None, None) => true,
        }
    });

    let label = source.map(|s| format!("'{s}'")).unwrap_or_else(|| "a branch".into());
    if let Some(oid) = merge_commit {
        return Verdict::new(true, format!("{label} was merged into '{branch}'."))
            .with_details(serde_json::json!({ "mergeCommit": oid.to_string(), "fastForward": false }));
    }
    let fast_forwarded = allow_fast_forward
        && source_tip
            .as_ref()
            .is_some_and(|src| graph.is_ancestor(src, &tip));
    if fast_forwarded {
        return Verdict::new(true, format!("{label} was merged into '{branch}'."))
            .with_details(serde_json::json!({ "fastForward": true }));
    }
    Verdict::new(false, format!("{label} has not been merged into '{branch}' yet."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, FixedClock};
    use crate::core::types::UtcTimestamp;

    fn run(state: &RepositoryState, lines: &[&str]) -> RepositoryState {
        let engine = Engine::default().with_clock(FixedClock(UtcTimestamp::parse("2024-08-08T08:00:00Z").unwrap()));
        lines.iter().fold(state.clone(), |state, line| {
            let run = engine.execute(&state, line).unwrap();
            assert!(run.is_success(), "{line}: {:?}", run.error);
            run.new_state
        })
    }

    fn two_commits() -> RepositoryState {
        let state = run(&RepositoryState::new("v"), &["git init"]).with_file("a.txt", "one\n");
        let state = run(&state, &["git add a.txt", "git commit -m one"]).with_file("a.txt", "two\n");
        run(&state, &["git commit -am two"])
    }

    fn single(check: Criterion) -> CriteriaSet {
        ValidationCriteria::new(check).into()
    }

    #[test]
    fn commit_count_on_branch() {
        let state = two_commits();
        let ok = validate(&single(Criterion::CommitExists { min_count: 2, branch: Some("main".into()) }), &state);
        assert!(ok.success);
        let short = validate(&single(Criterion::CommitExists { min_count: 3, branch: None }), &state);
        assert!(!short.success);
        assert_eq!(short.feedback, "Expected at least 3 commits, found 2.");
        let missing = validate(&single(Criterion::CommitExists { min_count: 1, branch: Some("nope".into()) }), &state);
        assert!(!missing.success);
    }

    #[test]
    fn overrides_and_bonus() {
        let state = two_commits();
        let criteria = ValidationCriteria::new(Criterion::BranchExists { branch_name: "main".into() })
            .with_success_message("Nice branch!")
            .with_bonus_xp(15);
        let result = evaluate(&criteria, &state);
        assert_eq!(result.feedback, "Nice branch!");
        assert_eq!(result.bonus_xp, Some(15));

        let failing = ValidationCriteria::new(Criterion::BranchExists { branch_name: "x".into() })
            .with_failure_message("Create the x branch first.")
            .with_bonus_xp(15);
        let result = evaluate(&failing, &state);
        assert_eq!(result.feedback, "Create the x branch first.");
        assert_eq!(result.bonus_xp, None);
    }

    #[test]
    fn file_content_forms() {
        let state = two_commits();
        let exact = |content: &str| {
            validate(
                &single(Criterion::FileContent { path: "a.txt".into(), content: Some(content.into()), must_exist: true }),
                &state,
            )
            .success
        };
        assert!(exact("two"));
        assert!(!exact("one"));
        let absent = single(Criterion::FileContent { path: "gone.txt".into(), content: None, must_exist: false });
        assert!(validate(&absent, &state).success);
    }

    #[test]
    fn boss_battle_short_circuits() {
        let state = two_commits();
        let battle = CriteriaSet::BossBattle(vec![
            ValidationCriteria::new(Criterion::BranchExists { branch_name: "main".into() }).with_bonus_xp(10),
            ValidationCriteria::new(Criterion::BranchExists { branch_name: "hydra".into() })
                .with_failure_message("The hydra branch is missing."),
            ValidationCriteria::new(Criterion::Custom { validator: CustomValidator::CleanWorkingTree }),
        ]);
        let result = validate(&battle, &state);
        assert!(!result.success);
        assert_eq!(result.feedback, "The hydra branch is missing.");
        assert_eq!(result.details.unwrap()["failedIndex"], 1);
    }

    #[test]
    fn boss_battle_sums_bonus() {
        let state = two_commits();
        let battle = CriteriaSet::BossBattle(vec![
            ValidationCriteria::new(Criterion::BranchExists { branch_name: "main".into() }).with_bonus_xp(10),
            ValidationCriteria::new(Criterion::CommitExists { min_count: 2, branch: None }).with_bonus_xp(25),
            ValidationCriteria::new(Criterion::Custom { validator: CustomValidator::CleanWorkingTree }),
        ]);
        let result = validate(&battle, &state);
        assert!(result.success);
        assert_eq!(result.bonus_xp, Some(35));
    }

    #[test]
    fn fast_forward_counts_only_when_allowed() {
        let state = run(&RepositoryState::new("ff"), &["git init"]).with_file("a", "1\n");
        let state = run(&state, &["git add a", "git commit -m one", "git checkout -b topic"]).with_file("a", "2\n");
        let state = run(&state, &["git commit -am two", "git checkout main", "git merge topic"]);
        let check = |allow| Criterion::MergeCompleted {
            branch: "main".into(),
            source: Some("topic".into()),
            allow_fast_forward: allow,
        };
        assert!(!validate(&single(check(false)), &state).success);
        assert!(validate(&single(check(true)), &state).success);
    }
}
