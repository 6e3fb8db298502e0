//! validate::criteria
//!
//! Serde shapes of grading criteria.
//!
//! A criterion is a JSON object tagged by `type`, with optional feedback
//! overrides and a bonus next to the check's own fields:
//!
//! ```json
//! { "type": "commit_exists", "minCount": 2, "branch": "main",
//!   "successMessage": "Two snapshots saved!", "bonusXp": 10 }
//! ```
//!
//! A boss battle is a JSON array of criteria.

use serde::{Deserialize, Serialize};

use super::custom::CustomValidator;

fn one() -> usize {
    1
}

fn yes() -> bool {
    true
}

/// The check itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Criterion {
    /// At least `min_count` commits reachable from `branch` (default HEAD).
    CommitExists {
        #[serde(rename = "minCount", default = "one")]
        min_count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
    },
    BranchExists {
        #[serde(rename = "branchName")]
        branch_name: String,
    },
    /// Working-directory file check. With `content` the file must match it;
    /// without, `must_exist` says whether it must be present or absent.
    FileContent {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(rename = "mustExist", default = "yes")]
        must_exist: bool,
    },
    /// `source` has been merged into `branch`, by a merge commit or (unless
    /// `allow_fast_forward` is turned off) a fast-forward.
    MergeCompleted {
        branch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(rename = "allowFastForward", default = "yes")]
        allow_fast_forward: bool,
    },
    Custom { validator: CustomValidator },
}

/// A criterion with its feedback overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationCriteria {
    #[serde(flatten)]
    pub check: Criterion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_xp: Option<u32>,
}

impl ValidationCriteria {
    pub fn new(check: Criterion) -> Self {
        Self {
            check,
            success_message: None,
            failure_message: None,
            bonus_xp: None,
        }
    }

    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    pub fn with_bonus_xp(mut self, xp: u32) -> Self {
        self.bonus_xp = Some(xp);
        self
    }
}

impl From<Criterion> for ValidationCriteria {
    fn from(check: Criterion) -> Self {
        Self::new(check)
    }
}

/// One quest criterion or a boss battle's ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriteriaSet {
    Single(ValidationCriteria),
    BossBattle(Vec<ValidationCriteria>),
}

impl From<ValidationCriteria> for CriteriaSet {
    fn from(criteria: ValidationCriteria) -> Self {
        CriteriaSet::Single(criteria)
    }
}

impl From<Vec<ValidationCriteria>> for CriteriaSet {
    fn from(list: Vec<ValidationCriteria>) -> Self {
        CriteriaSet::BossBattle(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quest_json() {
        let json = r#"{ "type": "commit_exists", "minCount": 2, "branch": "main",
                        "successMessage": "saved", "bonusXp": 10 }"#;
        let criteria: ValidationCriteria = serde_json::from_str(json).unwrap();
        assert_eq!(
            criteria.check,
            Criterion::CommitExists {
                min_count: 2,
                branch: Some("main".into())
            }
        );
        assert_eq!(criteria.success_message.as_deref(), Some("saved"));
        assert_eq!(criteria.bonus_xp, Some(10));
    }

    #[test]
    fn defaults_apply() {
        let criteria: ValidationCriteria =
            serde_json::from_str(r#"{ "type": "file_content", "path": "a.txt" }"#).unwrap();
        assert_eq!(
            criteria.check,
            Criterion::FileContent {
                path: "a.txt".into(),
                content: None,
                must_exist: true
            }
        );
        let criteria: ValidationCriteria =
            serde_json::from_str(r#"{ "type": "commit_exists" }"#).unwrap();
        assert!(matches!(criteria.check, Criterion::CommitExists { min_count: 1, .. }));
    }

    #[test]
    fn merge_completed_accepts_fast_forward_by_default() {
        let criteria: ValidationCriteria =
            serde_json::from_str(r#"{ "type": "merge_completed", "branch": "main", "source": "feature" }"#)
                .unwrap();
        assert_eq!(
            criteria.check,
            Criterion::MergeCompleted {
                branch: "main".into(),
                source: Some("feature".into()),
                allow_fast_forward: true
            }
        );
    }

    #[test]
    fn array_is_a_boss_battle() {
        let json = r#"[
            { "type": "branch_exists", "branchName": "feature" },
            { "type": "custom", "validator": { "name": "cleanWorkingTree" } }
        ]"#;
        let set: CriteriaSet = serde_json::from_str(json).unwrap();
        let CriteriaSet::BossBattle(list) = set else {
            panic!("expected a list");
        };
        assert_eq!(list.len(), 2);
        assert_eq!(
            list[1].check,
            Criterion::Custom {
                validator: CustomValidator::CleanWorkingTree
            }
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<ValidationCriteria, _> =
            serde_json::from_str(r#"{ "type": "vibes_check" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let criteria = ValidationCriteria::new(Criterion::MergeCompleted {
            branch: "main".into(),
            source: Some("feature".into()),
            allow_fast_forward: true,
        })
        .with_bonus_xp(5);
        let json = serde_json::to_value(&criteria).unwrap();
        assert_eq!(json["type"], "merge_completed");
        assert_eq!(json["allowFastForward"], true);
        assert_eq!(json["bonusXp"], 5);
    }
}
