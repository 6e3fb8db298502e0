//! merge
//!
//! Three-way merging of file contents and trees.
//!
//! # Modules
//!
//! - [`diff`] - LCS line diff, unified output and line stats
//! - [`conflict`] - Conflict marker writing, parsing and resolution
//!
//! # Algorithm
//!
//! Text merges follow diff3: lines of the base that both sides kept
//! unchanged are stable anchors, and each span between anchors is resolved
//! independently. A span changed on one side only takes that side; a span
//! changed identically on both sides takes either; anything else is a
//! conflict region. Tree merges apply the same rule per path, with file
//! presence treated as part of the content.

pub mod conflict;
pub mod diff;

use crate::core::files::Snapshot;
use crate::core::graph::CommitGraph;
use crate::core::types::Oid;

use diff::{lcs_matches, split_lines};

/// Outcome of merging one file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergedText {
    Clean(String),
    /// Text containing `regions` conflict blocks.
    Conflicted { text: String, regions: usize },
}

impl MergedText {
    pub fn text(&self) -> &str {
        match self {
            MergedText::Clean(text) | MergedText::Conflicted { text, .. } => text,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, MergedText::Clean(_))
    }
}

/// For each line of `base`, the matching line index in `side`.
fn match_map(base: &[&str], side: &[&str]) -> Vec<Option<usize>> {
    let mut map = vec![None; base.len()];
    for (b, s) in lcs_matches(base, side) {
        map[b] = Some(s);
    }
    map
}

/// Merge `ours` and `theirs` against their common `base`.
///
/// `label` names the incoming side in conflict markers.
pub fn merge_text(base: &str, ours: &str, theirs: &str, label: &str) -> MergedText {
    if ours == theirs || theirs == base {
        return MergedText::Clean(ours.to_string());
    }
    if ours == base {
        return MergedText::Clean(theirs.to_string());
    }

    let (b, o, t) = (split_lines(base), split_lines(ours), split_lines(theirs));
    let (to_ours, to_theirs) = (match_map(&b, &o), match_map(&b, &t));

    let mut out = String::with_capacity(ours.len().max(theirs.len()));
    let mut regions = 0;
    let (mut i, mut j, mut k) = (0, 0, 0);

    loop {
        let anchor = (i..b.len()).find_map(|x| match (to_ours[x], to_theirs[x]) {
            (Some(oj), Some(tk)) => Some((x, oj, tk)),
            _ => None,
        });
        let (bx, oj, tk) = anchor.unwrap_or((b.len(), o.len(), t.len()));

        if (bx, oj, tk) == (i, j, k) {
            if bx == b.len() {
                break;
            }
            out.push_str(b[i]);
            i += 1;
            j += 1;
            k += 1;
            continue;
        }

        let (base_span, ours_span, theirs_span) = (&b[i..bx], &o[j..oj], &t[k..tk]);
        if ours_span == theirs_span || theirs_span == base_span {
            out.extend(ours_span.iter().copied());
        } else if ours_span == base_span {
            out.extend(theirs_span.iter().copied());
        } else {
            conflict::write_region(&mut out, &ours_span.concat(), &theirs_span.concat(), label);
            regions += 1;
        }
        (i, j, k) = (bx, oj, tk);
    }

    if regions == 0 {
        MergedText::Clean(out)
    } else {
        MergedText::Conflicted { text: out, regions }
    }
}

/// Why a path could not be merged automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both sides edited overlapping lines.
    Content,
    /// Both sides added the file with different contents.
    AddAdd,
    /// One side deleted the file, the other modified it.
    ModifyDelete { deleted_in_head: bool },
}

impl ConflictKind {
    /// The `CONFLICT (...)` tag git prints.
    pub fn tag(self) -> &'static str {
        match self {
            ConflictKind::Content => "content",
            ConflictKind::AddAdd => "add/add",
            ConflictKind::ModifyDelete { .. } => "modify/delete",
        }
    }
}

/// One unmerged path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConflict {
    pub path: String,
    pub kind: ConflictKind,
    /// What the working directory gets: marker text, or the surviving side
    /// of a modify/delete.
    pub working: String,
}

/// Result of merging two trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeMerge {
    /// Merged tree for every cleanly merged path.
    pub merged: Snapshot,
    /// Paths needing learner resolution, sorted.
    pub conflicts: Vec<PathConflict>,
    /// Paths where both sides changed and a content merge ran.
    pub auto_merged: Vec<String>,
}

impl TreeMerge {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// `merged` plus the working content of each conflicted path.
    pub fn working_tree(&self) -> Snapshot {
        let mut tree = self.merged.clone();
        for conflict in &self.conflicts {
            tree.insert(conflict.path.clone(), conflict.working.clone());
        }
        tree
    }

    pub fn conflict_paths(&self) -> Vec<String> {
        self.conflicts.iter().map(|c| c.path.clone()).collect()
    }
}

/// Merge `theirs` into `ours` relative to `base`.
pub fn merge_trees(base: &Snapshot, ours: &Snapshot, theirs: &Snapshot, label: &str) -> TreeMerge {
    let mut result = TreeMerge::default();
    let mut paths: Vec<&String> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();
    paths.sort();
    paths.dedup();

    for path in paths {
        let (b, o, t) = (base.get(path), ours.get(path), theirs.get(path));
        let resolved = if o == t || t == b {
            o.cloned()
        } else if o == b {
            t.cloned()
        } else {
            match (b, o, t) {
                (_, Some(o), Some(t)) => {
                    result.auto_merged.push(path.clone());
                    match merge_text(b.map_or("", String::as_str), o, t, label) {
                        MergedText::Clean(text) => Some(text),
                        MergedText::Conflicted { text, .. } => {
                            result.conflicts.push(PathConflict {
                                path: path.clone(),
                                kind: if b.is_some() {
                                    ConflictKind::Content
                                } else {
                                    ConflictKind::AddAdd
                                },
                                working: text,
                            });
                            continue;
                        }
                    }
                }
                (_, Some(survivor), None) | (_, None, Some(survivor)) => {
                    result.conflicts.push(PathConflict {
                        path: path.clone(),
                        kind: ConflictKind::ModifyDelete {
                            deleted_in_head: o.is_none(),
                        },
                        working: survivor.clone(),
                    });
                    continue;
                }
                (_, None, None) => None,
            }
        };
        if let Some(content) = resolved {
            result.merged.insert(path.clone(), content);
        }
    }
    result
}

/// How a merge of `theirs` into `ours` should proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePlan {
    /// `theirs` is already contained in `ours`.
    UpToDate,
    /// `ours` is an ancestor of `theirs` (or does not exist yet).
    FastForward { from: Option<Oid>, to: Oid },
    /// True merge against `base`.
    ThreeWay { base: Oid },
    /// No common ancestor.
    Unrelated,
}

/// Classify a merge using commit ancestry.
pub fn plan(graph: &CommitGraph, ours: Option<&Oid>, theirs: &Oid) -> MergePlan {
    let Some(ours) = ours else {
        return MergePlan::FastForward {
            from: None,
            to: theirs.clone(),
        };
    };
    if graph.is_ancestor(theirs, ours) {
        return MergePlan::UpToDate;
    }
    if graph.is_ancestor(ours, theirs) {
        return MergePlan::FastForward {
            from: Some(ours.clone()),
            to: theirs.clone(),
        };
    }
    match graph.merge_base(ours, theirs) {
        Some(base) => MergePlan::ThreeWay { base },
        None => MergePlan::Unrelated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(entries: &[(&str, &str)]) -> Snapshot {
        entries
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect()
    }

    #[test]
    fn one_sided_change_wins() {
        let merged = merge_text("a\nb\nc\n", "a\nB\nc\n", "a\nb\nc\n", "x");
        assert_eq!(merged, MergedText::Clean("a\nB\nc\n".into()));
    }

    #[test]
    fn distant_edits_combine() {
        let base = "1\n2\n3\n4\n5\n6\n7\n";
        let ours = "one\n2\n3\n4\n5\n6\n7\n";
        let theirs = "1\n2\n3\n4\n5\n6\nseven\n";
        assert_eq!(
            merge_text(base, ours, theirs, "x"),
            MergedText::Clean("one\n2\n3\n4\n5\n6\nseven\n".into())
        );
    }

    #[test]
    fn identical_edits_do_not_conflict() {
        let merged = merge_text("a\n", "b\n", "b\n", "x");
        assert!(merged.is_clean());
        assert_eq!(merged.text(), "b\n");
    }

    #[test]
    fn overlapping_edits_conflict_at_region_level() {
        let base = "Once upon a time\nthe hero waited.\nThe end.\n";
        let ours = "Once upon a time\nthe hero stayed home.\nThe end.\n";
        let theirs = "Once upon a time\nthe hero sailed away.\nThe end.\n";
        let merged = merge_text(base, ours, theirs, "feature-alternate-story");
        assert_eq!(
            merged,
            MergedText::Conflicted {
                text: "Once upon a time\n\
                       <<<<<<< HEAD\n\
                       the hero stayed home.\n\
                       =======\n\
                       the hero sailed away.\n\
                       >>>>>>> feature-alternate-story\n\
                       The end.\n"
                    .into(),
                regions: 1,
            }
        );
    }

    #[test]
    fn conflict_without_trailing_newline_still_well_formed() {
        let merged = merge_text("a", "b", "c", "other");
        assert_eq!(
            merged.text(),
            "<<<<<<< HEAD\nb\n=======\nc\n>>>>>>> other\n"
        );
        assert_eq!(conflict::count_regions(merged.text()).unwrap(), 1);
    }

    #[test]
    fn tree_merge_unions_disjoint_changes() {
        let base = snap(&[("a", "1\n"), ("b", "1\n")]);
        let ours = snap(&[("a", "2\n"), ("b", "1\n"), ("new_ours", "x\n")]);
        let theirs = snap(&[("a", "1\n"), ("b", "2\n")]);
        let merged = merge_trees(&base, &ours, &theirs, "feature");
        assert!(merged.is_clean());
        assert_eq!(
            merged.merged,
            snap(&[("a", "2\n"), ("b", "2\n"), ("new_ours", "x\n")])
        );
        assert!(merged.auto_merged.is_empty());
    }

    #[test]
    fn tree_merge_respects_deletions() {
        let base = snap(&[("gone", "1\n"), ("kept", "1\n")]);
        let ours = snap(&[("kept", "1\n")]);
        let theirs = base.clone();
        let merged = merge_trees(&base, &ours, &theirs, "feature");
        assert_eq!(merged.merged, snap(&[("kept", "1\n")]));
    }

    #[test]
    fn modify_delete_keeps_survivor() {
        let base = snap(&[("f", "1\n")]);
        let ours = Snapshot::new();
        let theirs = snap(&[("f", "2\n")]);
        let merged = merge_trees(&base, &ours, &theirs, "feature");
        assert_eq!(merged.conflicts.len(), 1);
        let conflict = &merged.conflicts[0];
        assert_eq!(
            conflict.kind,
            ConflictKind::ModifyDelete {
                deleted_in_head: true
            }
        );
        assert_eq!(conflict.working, "2\n");
        assert_eq!(merged.working_tree(), snap(&[("f", "2\n")]));
    }

    #[test]
    fn add_add_conflict() {
        let merged = merge_trees(
            &Snapshot::new(),
            &snap(&[("f", "mine\n")]),
            &snap(&[("f", "theirs\n")]),
            "b",
        );
        assert_eq!(merged.conflicts[0].kind, ConflictKind::AddAdd);
        assert!(conflict::has_conflict_markers(&merged.conflicts[0].working));
        assert_eq!(merged.auto_merged, vec!["f".to_string()]);
    }

    #[test]
    fn plan_classifies_ancestry() {
        let a = Oid::hash_object("commit", b"a");
        let b = Oid::hash_object("commit", b"b");
        let c = Oid::hash_object("commit", b"c");
        let z = Oid::hash_object("commit", b"z");
        let mut graph = CommitGraph::new();
        graph.add_commit(a.clone(), vec![], 0);
        graph.add_commit(b.clone(), vec![a.clone()], 1);
        graph.add_commit(c.clone(), vec![a.clone()], 2);
        graph.add_commit(z.clone(), vec![], 3);

        assert_eq!(plan(&graph, Some(&b), &a), MergePlan::UpToDate);
        assert_eq!(
            plan(&graph, Some(&a), &b),
            MergePlan::FastForward {
                from: Some(a.clone()),
                to: b.clone()
            }
        );
        assert_eq!(
            plan(&graph, Some(&b), &c),
            MergePlan::ThreeWay { base: a.clone() }
        );
        assert_eq!(plan(&graph, Some(&b), &z), MergePlan::Unrelated);
        assert_eq!(
            plan(&graph, None, &z),
            MergePlan::FastForward { from: None, to: z }
        );
    }
}
