//! core::files
//!
//! File-tree value types shared by the working directory, staging area and
//! commit snapshots.
//!
//! Both maps are persistent `im::OrdMap`s: cloning a tree is O(1) and an
//! edit produces a new map that shares structure with the old one. Ordered
//! keys keep every listing (status, diff, tree hashing) deterministic.

use serde::{Deserialize, Serialize};

/// One path in a working directory or staging area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Full text content.
    pub content: String,

    /// Working directory: differs from the staged/committed version, or is
    /// untracked. Staging area: always false.
    #[serde(default)]
    pub modified: bool,

    /// Staging area only: the path is staged for removal.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl FileEntry {
    /// An entry with the given content and no flags set.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            modified: false,
            deleted: false,
        }
    }

    /// A staged removal.
    pub fn removal() -> Self {
        Self {
            content: String::new(),
            modified: false,
            deleted: true,
        }
    }
}

/// Path → entry mapping for the working directory and staging area.
pub type FileTree = im::OrdMap<String, FileEntry>;

/// Path → content mapping captured by a commit.
pub type Snapshot = im::OrdMap<String, String>;

/// Build a working-directory tree from a snapshot, with every entry clean.
pub fn tree_from_snapshot(snapshot: &Snapshot) -> FileTree {
    snapshot
        .iter()
        .map(|(path, content)| (path.clone(), FileEntry::new(content.clone())))
        .collect()
}

/// Flatten a working-directory tree into the content snapshot it represents.
///
/// Staged removals are skipped.
pub fn snapshot_of(tree: &FileTree) -> Snapshot {
    tree.iter()
        .filter(|(_, entry)| !entry.deleted)
        .map(|(path, entry)| (path.clone(), entry.content.clone()))
        .collect()
}

/// Overlay a staging delta onto a base snapshot.
pub fn apply_delta(base: &Snapshot, delta: &FileTree) -> Snapshot {
    let mut out = base.clone();
    for (path, entry) in delta {
        if entry.deleted {
            out.remove(path);
        } else {
            out.insert(path.clone(), entry.content.clone());
        }
    }
    out
}

/// The staging delta that turns `base` into `target`.
///
/// Inverse of [`apply_delta`]: `apply_delta(base, &delta_between(base, target)) == target`.
pub fn delta_between(base: &Snapshot, target: &Snapshot) -> FileTree {
    let mut delta = FileTree::new();
    for (path, content) in target {
        if base.get(path) != Some(content) {
            delta.insert(path.clone(), FileEntry::new(content.clone()));
        }
    }
    for path in base.keys() {
        if !target.contains_key(path) {
            delta.insert(path.clone(), FileEntry::removal());
        }
    }
    delta
}

/// Paths whose presence or content differs between two snapshots, sorted.
pub fn changed_paths(a: &Snapshot, b: &Snapshot) -> Vec<String> {
    let mut paths: Vec<String> = a
        .iter()
        .filter(|(path, content)| b.get(*path) != Some(*content))
        .map(|(path, _)| path.clone())
        .collect();
    paths.extend(b.keys().filter(|path| !a.contains_key(*path)).cloned());
    paths.sort();
    paths
}
