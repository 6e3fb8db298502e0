//! core::object
//!
//! Content-addressed object store: blobs and directory trees.
//!
//! # Hashing
//!
//! - Blob: `sha256("blob " + content)`
//! - Tree: `sha256("tree " + entries)` where each entry, in name order, is
//!   `"<mode> <kind> <hash>\t<name>\n"`
//!
//! Everything here is pure. Identical content always yields the identical
//! hash, and insertion order never affects a tree hash.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::files::{snapshot_of, FileTree, Snapshot};
use super::types::Oid;

/// Errors from object construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectError {
    #[error("file content is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidUtf8 { offset: usize },
}

/// Immutable file content and its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub hash: Oid,
    pub content: String,
}

impl Blob {
    /// Hash text content.
    pub fn from_content(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            hash: Oid::hash_object("blob", content.as_bytes()),
            content,
        }
    }

    /// Hash raw bytes, rejecting anything that is not UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ObjectError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ObjectError::InvalidUtf8 {
            offset: e.valid_up_to(),
        })?;
        Ok(Self::from_content(text))
    }
}

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
}

impl EntryKind {
    /// The file mode git writes for this kind.
    pub fn mode(self) -> &'static str {
        match self {
            EntryKind::Blob => "100644",
            EntryKind::Tree => "040000",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            EntryKind::Blob => "blob",
            EntryKind::Tree => "tree",
        }
    }
}

/// One named entry in a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub hash: Oid,
    pub mode: String,
}

/// A directory snapshot: entries keyed (and therefore sorted) by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub hash: Oid,
    pub entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    fn from_entries(entries: BTreeMap<String, TreeEntry>) -> Self {
        let mut body = String::new();
        for entry in entries.values() {
            body.push_str(&format!(
                "{} {} {}\t{}\n",
                entry.mode,
                entry.kind.as_str(),
                entry.hash,
                entry.name
            ));
        }
        Self {
            hash: Oid::hash_object("tree", body.as_bytes()),
            entries,
        }
    }

    /// The tree of an empty directory.
    pub fn empty() -> Self {
        Self::from_entries(BTreeMap::new())
    }
}

/// Build the root tree for a path → content snapshot.
///
/// Paths containing `/` become nested subtrees. If a name is used both as a
/// file and as a directory, the directory entry wins.
pub fn tree_from_snapshot(snapshot: &Snapshot) -> Tree {
    build(snapshot.iter().map(|(p, c)| (p.as_str(), c.as_str())))
}

/// Build the root tree for a working directory or staging area.
pub fn tree_from_files(files: &FileTree) -> Tree {
    tree_from_snapshot(&snapshot_of(files))
}

fn build<'a>(files: impl Iterator<Item = (&'a str, &'a str)>) -> Tree {
    let mut blobs: BTreeMap<&str, &str> = BTreeMap::new();
    let mut dirs: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();

    for (path, content) in files {
        match path.split_once('/') {
            Some((dir, rest)) if !rest.is_empty() => {
                dirs.entry(dir).or_default().push((rest, content));
            }
            _ => {
                blobs.insert(path.trim_end_matches('/'), content);
            }
        }
    }

    let mut entries = BTreeMap::new();
    for (name, content) in blobs {
        let blob = Blob::from_content(content);
        entries.insert(
            name.to_string(),
            TreeEntry {
                name: name.to_string(),
                kind: EntryKind::Blob,
                hash: blob.hash,
                mode: EntryKind::Blob.mode().to_string(),
            },
        );
    }
    for (name, children) in dirs {
        let subtree = build(children.into_iter());
        entries.insert(
            name.to_string(),
            TreeEntry {
                name: name.to_string(),
                kind: EntryKind::Tree,
                hash: subtree.hash,
                mode: EntryKind::Tree.mode().to_string(),
            },
        );
    }
    Tree::from_entries(entries)
}
