//! core::state
//!
//! The repository aggregate and its invariant-preserving mutators.
//!
//! # Model
//!
//! - `working_directory` holds every file the learner can see.
//! - `staging_area` is a delta over HEAD's tree: only paths whose
//!   to-be-committed content differs from HEAD (or that are staged for
//!   removal) appear in it. HEAD's tree overlaid with this delta is the
//!   *index view*.
//! - `commits` is append-only, parents before children.
//! - `head` is a branch name, a commit hash (detached), or empty before
//!   `init`.
//!
//! # Invariants
//!
//! Every mutator takes `&self` and returns a new state or a [`StateError`].
//! The receiver is never modified, so a failed command leaves the caller's
//! value exactly as it was.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::files::{apply_delta, FileEntry, FileTree, Snapshot};
use super::graph::CommitGraph;
use super::object::tree_from_snapshot;
use super::types::{BranchName, Oid, RemoteName, TypeError, UtcTimestamp};

/// Precondition failures from state mutators and ref resolution.
///
/// Messages are what a learner sees, so they follow git's wording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("fatal: not a git repository (or any of the parent directories): .git")]
    NotARepository,

    #[error("fatal: pathspec '{0}' did not match any files")]
    PathspecNotFound(String),

    #[error("error: pathspec '{0}' did not match any file(s) known to git")]
    UntrackedPath(String),

    #[error("nothing to commit, working tree clean")]
    NothingToCommit,

    #[error("no changes added to commit (use \"git add\" and/or \"git commit -a\")")]
    NoChangesAdded,

    #[error("Aborting commit due to empty commit message.")]
    EmptyMessage,

    #[error(
        "error: Committing is not possible because you have unmerged files.\n\
         hint: Fix them up in the work tree, and then use 'git add <file>'\n\
         hint: as appropriate to mark resolution and make a commit.\n\
         fatal: Exiting because of an unresolved conflict."
    )]
    UnmergedFiles(Vec<String>),

    #[error("fatal: a branch named '{0}' already exists")]
    BranchExists(String),

    #[error("error: branch '{0}' not found.")]
    BranchNotFound(String),

    #[error("error: Cannot delete branch '{0}' checked out")]
    CannotDeleteCurrent(String),

    #[error(
        "error: The branch '{0}' is not fully merged.\n\
         If you are sure you want to delete it, run 'git branch -D {0}'."
    )]
    BranchNotMerged(String),

    #[error("fatal: Not a valid object name: '{0}'.")]
    NoCommitsYet(String),

    #[error("fatal: ambiguous argument '{0}': unknown revision or path not in the working tree.")]
    UnknownRevision(String),

    #[error("fatal: bad object {0}")]
    UnknownCommit(Oid),

    #[error("error: remote {0} already exists.")]
    RemoteExists(String),

    #[error("fatal: '{0}' does not appear to be a git repository")]
    RemoteNotFound(String),

    #[error("fatal: commit {commit} references missing parent {parent}")]
    MissingParent { commit: Oid, parent: Oid },

    #[error("fatal: {0}")]
    InvalidName(#[from] TypeError),
}

/// An immutable, hash-identified snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: Oid,
    pub message: String,
    pub author: String,
    pub timestamp: UtcTimestamp,
    /// First parent, or `None` for a root commit.
    pub parent: Option<Oid>,
    /// Both parents of a merge commit; absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<Oid>>,
    pub tree: Snapshot,
}

impl Commit {
    /// Build a commit and compute its hash.
    ///
    /// Two or more `parents` make a merge commit.
    pub fn new(
        message: impl Into<String>,
        author: impl Into<String>,
        timestamp: UtcTimestamp,
        parents: Vec<Oid>,
        tree: Snapshot,
    ) -> Self {
        let message = message.into();
        let author = author.into();
        let hash = Self::compute_hash(&message, &author, &timestamp, &parents, &tree);
        let parent = parents.first().cloned();
        let parents = (parents.len() > 1).then_some(parents);
        Self {
            hash,
            message,
            author,
            timestamp,
            parent,
            parents,
            tree,
        }
    }

    fn compute_hash(
        message: &str,
        author: &str,
        timestamp: &UtcTimestamp,
        parents: &[Oid],
        tree: &Snapshot,
    ) -> Oid {
        let mut body = format!("tree {}\n", tree_from_snapshot(tree).hash);
        for parent in parents {
            body.push_str(&format!("parent {parent}\n"));
        }
        body.push_str(&format!("author {author}\ndate {timestamp}\n\n{message}"));
        Oid::hash_object("commit", body.as_bytes())
    }

    /// All parent ids, first parent first.
    pub fn parent_ids(&self) -> Vec<&Oid> {
        match &self.parents {
            Some(parents) if !parents.is_empty() => parents.iter().collect(),
            _ => self.parent.iter().collect(),
        }
    }

    /// A commit with two parents.
    pub fn is_merge(&self) -> bool {
        self.parent_ids().len() > 1
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

mod empty_oid {
    //! Serde for `Option<Oid>` spelled as `""` when absent.

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::core::types::Oid;

    pub fn serialize<S: Serializer>(oid: &Option<Oid>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(oid.as_ref().map(Oid::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Oid>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.is_empty() {
            Ok(None)
        } else {
            Oid::new(raw).map(Some).map_err(serde::de::Error::custom)
        }
    }
}

/// A movable named pointer into the commit DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: BranchName,
    /// `None` for an unborn branch.
    #[serde(with = "empty_oid", default)]
    pub commit_hash: Option<Oid>,
}

/// A locally simulated view of another repository's branch pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
    pub name: RemoteName,
    pub url: String,
    #[serde(default)]
    pub branches: Vec<Branch>,
}

impl Remote {
    /// Tip of a remote branch.
    pub fn branch_tip(&self, branch: &str) -> Option<&Oid> {
        self.branches
            .iter()
            .find(|b| b.name.as_str() == branch)
            .and_then(|b| b.commit_hash.as_ref())
    }
}

/// What kind of operation left the repository mid-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeKind {
    Merge,
    Revert,
}

/// An in-progress merge or revert waiting for conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeState {
    pub kind: MergeKind,
    /// Incoming tip (merge) or reverted commit (revert).
    pub incoming: Oid,
    /// Name shown after `>>>>>>>`.
    pub label: String,
    /// Paths still unresolved.
    pub conflicts: Vec<String>,
    /// Message used if the learner commits without `-m`.
    pub message: String,
}

/// Where HEAD points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadRef {
    /// Before `init`.
    Uninitialized,
    /// On a branch (possibly unborn).
    Branch(BranchName),
    /// Directly at a commit.
    Detached(Oid),
}

/// The full simulated repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryState {
    pub id: String,
    #[serde(default)]
    pub working_directory: FileTree,
    #[serde(default)]
    pub staging_area: FileTree,
    #[serde(default)]
    pub commits: im::Vector<Commit>,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub head: String,
    #[serde(default)]
    pub remotes: Vec<Remote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_state: Option<MergeState>,
}

impl RepositoryState {
    /// An empty, uninitialized repository.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            working_directory: FileTree::new(),
            staging_area: FileTree::new(),
            commits: im::Vector::new(),
            branches: Vec::new(),
            head: String::new(),
            remotes: Vec::new(),
            merge_state: None,
        }
    }

    /// An empty repository with a random id.
    pub fn with_random_id() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Whether `init` (or `clone`) has run.
    pub fn is_initialized(&self) -> bool {
        !self.head.is_empty()
    }

    /// Classify `head`.
    pub fn head_ref(&self) -> HeadRef {
        if self.head.is_empty() {
            return HeadRef::Uninitialized;
        }
        if let Some(branch) = self.find_branch(&self.head) {
            return HeadRef::Branch(branch.name.clone());
        }
        match Oid::new(self.head.clone()) {
            Ok(oid) => HeadRef::Detached(oid),
            // A head naming neither a branch nor a hash is a branch that has
            // not been created yet.
            Err(_) => match BranchName::new(self.head.clone()) {
                Ok(name) => HeadRef::Branch(name),
                Err(_) => HeadRef::Uninitialized,
            },
        }
    }

    /// The checked-out branch, if HEAD is attached to an existing branch.
    pub fn current_branch(&self) -> Option<&Branch> {
        self.find_branch(&self.head)
    }

    /// True when HEAD holds a commit hash rather than a branch name.
    pub fn is_detached(&self) -> bool {
        matches!(self.head_ref(), HeadRef::Detached(_))
    }

    /// Hash HEAD resolves to; `None` on an unborn branch.
    pub fn head_oid(&self) -> Option<Oid> {
        match self.head_ref() {
            HeadRef::Uninitialized => None,
            HeadRef::Branch(name) => self
                .find_branch(name.as_str())
                .and_then(|b| b.commit_hash.clone()),
            HeadRef::Detached(oid) => Some(oid),
        }
    }

    /// The commit HEAD resolves to.
    pub fn head_commit(&self) -> Option<&Commit> {
        self.head_oid().and_then(|oid| self.commit(&oid))
    }

    /// Look up a commit by full hash.
    pub fn commit(&self, oid: &Oid) -> Option<&Commit> {
        self.commits.iter().find(|c| &c.hash == oid)
    }

    /// Position of a commit in the append-only log.
    pub fn commit_position(&self, oid: &Oid) -> Option<usize> {
        self.commits.iter().position(|c| &c.hash == oid)
    }

    /// Look up a local branch.
    pub fn find_branch(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.name.as_str() == name)
    }

    /// Look up a remote.
    pub fn find_remote(&self, name: &str) -> Option<&Remote> {
        self.remotes.iter().find(|r| r.name.as_str() == name)
    }

    /// Tree of the HEAD commit (empty when unborn).
    pub fn head_tree(&self) -> Snapshot {
        self.head_commit()
            .map(|c| c.tree.clone())
            .unwrap_or_default()
    }

    /// HEAD's tree overlaid with the staging delta.
    pub fn index_view(&self) -> Snapshot {
        apply_delta(&self.head_tree(), &self.staging_area)
    }

    /// Working directory contents without flags.
    pub fn working_snapshot(&self) -> Snapshot {
        super::files::snapshot_of(&self.working_directory)
    }

    /// Resolve a revision to a commit hash.
    ///
    /// Accepts `HEAD`, local branches, `<remote>/<branch>`, full hashes,
    /// unique prefixes of at least four hex characters, and any chain of
    /// `~N` / `^N` suffixes.
    pub fn resolve_ref(&self, spec: &str) -> Option<Oid> {
        let split = spec.find(['~', '^']).unwrap_or(spec.len());
        let (base, mut suffix) = spec.split_at(split);
        let mut oid = self.resolve_base(base)?;

        while let Some(op) = suffix.chars().next() {
            if !matches!(op, '~' | '^') {
                return None;
            }
            suffix = &suffix[1..];
            let digits: String = suffix.chars().take_while(char::is_ascii_digit).collect();
            suffix = &suffix[digits.len()..];
            let n: usize = if digits.is_empty() { 1 } else { digits.parse().ok()? };
            if op == '~' {
                for _ in 0..n {
                    oid = self.commit(&oid)?.parent.clone()?;
                }
            } else if n > 0 {
                oid = self
                    .commit(&oid)?
                    .parent_ids()
                    .get(n - 1)
                    .map(|p| (*p).clone())?;
            }
        }
        Some(oid)
    }

    fn resolve_base(&self, base: &str) -> Option<Oid> {
        if base == "HEAD" || base == "@" {
            return self.head_oid();
        }
        if let Some(branch) = self.find_branch(base) {
            return branch.commit_hash.clone();
        }
        if let Some((remote, branch)) = base.split_once('/') {
            if let Some(tip) = self.find_remote(remote).and_then(|r| r.branch_tip(branch)) {
                return Some(tip.clone());
            }
        }
        if base.len() >= 4 && base.chars().all(|c| c.is_ascii_hexdigit()) {
            let mut matches = self.commits.iter().filter(|c| c.hash.starts_with(base));
            let first = matches.next()?;
            if matches.next().is_none() {
                return Some(first.hash.clone());
            }
        }
        None
    }

    /// Resolve a revision or fail with git's "unknown revision" message.
    pub fn require_ref(&self, spec: &str) -> Result<Oid, StateError> {
        self.resolve_ref(spec)
            .ok_or_else(|| StateError::UnknownRevision(spec.to_string()))
    }

    /// Paths whose working content differs from the index view, including
    /// untracked files and files deleted from the working directory.
    pub fn unstaged_paths(&self) -> Vec<String> {
        let index = self.index_view();
        let mut paths: Vec<String> = self
            .working_directory
            .iter()
            .filter(|(path, entry)| index.get(*path) != Some(&entry.content))
            .map(|(path, _)| path.clone())
            .collect();
        paths.extend(
            index
                .keys()
                .filter(|path| !self.working_directory.contains_key(*path))
                .cloned(),
        );
        paths.sort();
        paths
    }

    /// Whether the staging delta records any change relative to HEAD.
    pub fn has_staged_changes(&self) -> bool {
        self.index_view() != self.head_tree()
    }

    fn ensure_initialized(&self) -> Result<(), StateError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(StateError::NotARepository)
        }
    }

    // ---------------------------------------------------------------------
    // Mutators
    // ---------------------------------------------------------------------

    /// Initialize with an unborn `default_branch` checked out.
    ///
    /// Re-initializing an existing repository changes nothing.
    pub fn initialize(&self, default_branch: &BranchName) -> Self {
        if self.is_initialized() {
            return self.clone();
        }
        let mut next = self.clone();
        next.head = default_branch.to_string();
        if next.find_branch(default_branch.as_str()).is_none() {
            next.branches.push(Branch {
                name: default_branch.clone(),
                commit_hash: None,
            });
        }
        next.refreshed()
    }

    /// Copy a working-directory path into the staging area.
    ///
    /// A path missing from the working directory but present in the index
    /// view is staged as a removal.
    pub fn stage_file(&self, path: &str) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        let head_tree = self.head_tree();
        let mut next = self.clone();

        if let Some(entry) = self.working_directory.get(path) {
            if head_tree.get(path) == Some(&entry.content) {
                next.staging_area.remove(path);
            } else {
                next.staging_area
                    .insert(path.to_string(), FileEntry::new(entry.content.clone()));
            }
        } else if self.index_view().contains_key(path) {
            if head_tree.contains_key(path) {
                next.staging_area
                    .insert(path.to_string(), FileEntry::removal());
            } else {
                next.staging_area.remove(path);
            }
        } else {
            return Err(StateError::PathspecNotFound(path.to_string()));
        }
        Ok(next.refreshed())
    }

    /// Stage every change in the working directory, removals included.
    pub fn stage_all(&self) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        let mut next = self.clone();
        for path in self.unstaged_paths() {
            next = next.stage_file(&path)?;
        }
        Ok(next)
    }

    /// Drop a path from the staging delta.
    pub fn unstage_file(&self, path: &str) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        let known = self.staging_area.contains_key(path)
            || self.working_directory.contains_key(path)
            || self.head_tree().contains_key(path);
        if !known {
            return Err(StateError::PathspecNotFound(path.to_string()));
        }
        let mut next = self.clone();
        next.staging_area.remove(path);
        Ok(next.refreshed())
    }

    /// Restore a working-directory path from the index view.
    pub fn discard_working_changes(&self, path: &str) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        let index = self.index_view();
        let content = index
            .get(path)
            .ok_or_else(|| StateError::UntrackedPath(path.to_string()))?;
        let mut next = self.clone();
        next.working_directory
            .insert(path.to_string(), FileEntry::new(content.clone()));
        Ok(next.refreshed())
    }

    /// Record the index view as a new commit and advance HEAD.
    ///
    /// With a merge in progress the commit gets the incoming tip as its
    /// second parent, and every conflict must already be resolved.
    pub fn record_commit(
        &self,
        message: &str,
        author: &str,
        timestamp: UtcTimestamp,
    ) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        if message.trim().is_empty() {
            return Err(StateError::EmptyMessage);
        }
        if let Some(merge) = &self.merge_state {
            if !merge.conflicts.is_empty() {
                return Err(StateError::UnmergedFiles(merge.conflicts.clone()));
            }
        } else if self.staging_area.is_empty() {
            return Err(if self.unstaged_paths().is_empty() {
                StateError::NothingToCommit
            } else {
                StateError::NoChangesAdded
            });
        }

        let mut parents: Vec<Oid> = self.head_oid().into_iter().collect();
        if let Some(merge) = &self.merge_state {
            if merge.kind == MergeKind::Merge {
                parents.push(merge.incoming.clone());
            }
        }
        let commit = Commit::new(message, author, timestamp, parents, self.index_view());
        let oid = commit.hash.clone();

        let mut next = self.clone();
        // Identical content, parents and time give the same object again
        if next.commit(&oid).is_none() {
            next.commits.push_back(commit);
        }
        next.move_head_to(oid);
        next.staging_area = FileTree::new();
        next.merge_state = None;
        Ok(next.refreshed())
    }

    /// Create a branch at `start` (default: HEAD).
    pub fn create_branch(&self, name: &str, start: Option<Oid>) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        let name = BranchName::new(name)?;
        if self.find_branch(name.as_str()).is_some() {
            return Err(StateError::BranchExists(name.to_string()));
        }
        let start = match start {
            Some(oid) => {
                if self.commit(&oid).is_none() {
                    return Err(StateError::UnknownCommit(oid));
                }
                oid
            }
            None => self
                .head_oid()
                .ok_or_else(|| StateError::NoCommitsYet(self.head.clone()))?,
        };
        let mut next = self.clone();
        next.branches.push(Branch {
            name,
            commit_hash: Some(start),
        });
        Ok(next)
    }

    /// Check out a new unborn branch in place of the current unborn one.
    ///
    /// This is `checkout -b` before the first commit: there is nothing to
    /// point the new branch at yet.
    pub fn start_unborn_branch(&self, name: &str) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        let name = BranchName::new(name)?;
        if self.find_branch(name.as_str()).is_some() {
            return Err(StateError::BranchExists(name.to_string()));
        }
        let mut next = self.clone();
        let current = self.head.clone();
        next.branches
            .retain(|b| !(b.name.as_str() == current && b.commit_hash.is_none()));
        next.branches.push(Branch {
            name: name.clone(),
            commit_hash: None,
        });
        next.head = name.to_string();
        Ok(next.refreshed())
    }

    /// Delete a branch other than the checked-out one.
    ///
    /// Without `force` the branch tip must be reachable from HEAD.
    pub fn delete_branch(&self, name: &str, force: bool) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        let branch = self
            .find_branch(name)
            .ok_or_else(|| StateError::BranchNotFound(name.to_string()))?;
        if self.head == name {
            return Err(StateError::CannotDeleteCurrent(name.to_string()));
        }
        if let (false, Some(tip)) = (force, &branch.commit_hash) {
            let merged = self
                .head_oid()
                .is_some_and(|head| CommitGraph::from_state(self).is_ancestor(tip, &head));
            if !merged {
                return Err(StateError::BranchNotMerged(name.to_string()));
            }
        }
        let mut next = self.clone();
        next.branches.retain(|b| b.name.as_str() != name);
        Ok(next)
    }

    /// Point HEAD at a branch name or, detached, at a commit hash.
    ///
    /// Working directory and staging area are left alone; checkout logic
    /// decides what they become.
    pub fn set_head(&self, target: &str) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        let mut next = self.clone();
        if self.find_branch(target).is_some() {
            next.head = target.to_string();
        } else {
            let oid = Oid::new(target)
                .map_err(|_| StateError::UnknownRevision(target.to_string()))?;
            if self.commit(&oid).is_none() {
                return Err(StateError::UnknownCommit(oid));
            }
            next.head = oid.to_string();
        }
        Ok(next.refreshed())
    }

    /// Register a remote.
    pub fn add_remote(&self, name: &str, url: &str) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        let name = RemoteName::new(name)?;
        if self.find_remote(name.as_str()).is_some() {
            return Err(StateError::RemoteExists(name.to_string()));
        }
        let mut next = self.clone();
        next.remotes.push(Remote {
            name,
            url: url.to_string(),
            branches: Vec::new(),
        });
        Ok(next)
    }

    /// Move a local branch to an existing commit.
    pub fn set_branch_pointer(&self, name: &str, oid: Oid) -> Result<Self, StateError> {
        self.ensure_initialized()?;
        if self.commit(&oid).is_none() {
            return Err(StateError::UnknownCommit(oid));
        }
        let mut next = self.clone();
        let branch = next
            .branches
            .iter_mut()
            .find(|b| b.name.as_str() == name)
            .ok_or_else(|| StateError::BranchNotFound(name.to_string()))?;
        branch.commit_hash = Some(oid);
        Ok(next)
    }

    /// Move (or create) a remote-tracking branch.
    pub fn set_remote_branch(
        &self,
        remote: &str,
        branch: &str,
        oid: Oid,
    ) -> Result<Self, StateError> {
        if self.commit(&oid).is_none() {
            return Err(StateError::UnknownCommit(oid));
        }
        let branch_name = BranchName::new(branch)?;
        let mut next = self.clone();
        let remote = next
            .remotes
            .iter_mut()
            .find(|r| r.name.as_str() == remote)
            .ok_or_else(|| StateError::RemoteNotFound(remote.to_string()))?;
        match remote.branches.iter_mut().find(|b| b.name == branch_name) {
            Some(existing) => existing.commit_hash = Some(oid),
            None => remote.branches.push(Branch {
                name: branch_name,
                commit_hash: Some(oid),
            }),
        }
        Ok(next)
    }

    /// Append commits this repository does not have yet.
    ///
    /// Input must be parent-first, as in another state's `commits`.
    pub fn import_commits<'a>(
        &self,
        commits: impl IntoIterator<Item = &'a Commit>,
    ) -> Result<Self, StateError> {
        let mut next = self.clone();
        for commit in commits {
            if next.commit(&commit.hash).is_some() {
                continue;
            }
            if let Some(missing) = commit
                .parent_ids()
                .into_iter()
                .find(|p| next.commit(p).is_none())
            {
                return Err(StateError::MissingParent {
                    commit: commit.hash.clone(),
                    parent: missing.clone(),
                });
            }
            next.commits.push_back(commit.clone());
        }
        Ok(next)
    }

    /// Mark a conflicted path as resolved.
    pub fn resolve_conflict(&self, path: &str) -> Self {
        let mut next = self.clone();
        if let Some(merge) = next.merge_state.as_mut() {
            merge.conflicts.retain(|p| p != path);
        }
        next
    }

    /// Replace the working directory wholesale.
    pub fn with_working_snapshot(&self, snapshot: &Snapshot) -> Self {
        let mut next = self.clone();
        next.working_directory = super::files::tree_from_snapshot(snapshot);
        next.refreshed()
    }

    /// Replace the staging delta.
    pub fn with_staging(&self, staging: FileTree) -> Self {
        let mut next = self.clone();
        next.staging_area = staging;
        next.refreshed()
    }

    /// Set or clear the in-progress merge.
    pub fn with_merge_state(&self, merge: Option<MergeState>) -> Self {
        let mut next = self.clone();
        next.merge_state = merge;
        next
    }

    /// Advance whatever HEAD points at to `oid`.
    pub fn with_head_moved(&self, oid: Oid) -> Self {
        let mut next = self.clone();
        next.move_head_to(oid);
        next.refreshed()
    }

    fn move_head_to(&mut self, oid: Oid) {
        if let Some(branch) = self
            .branches
            .iter_mut()
            .find(|b| b.name.as_str() == self.head)
        {
            branch.commit_hash = Some(oid);
            return;
        }
        match (Oid::new(self.head.clone()), BranchName::new(self.head.clone())) {
            // HEAD named a branch that had not been created yet
            (Err(_), Ok(name)) => self.branches.push(Branch {
                name,
                commit_hash: Some(oid),
            }),
            _ => self.head = oid.to_string(),
        }
    }

    /// Recompute `modified` flags on the working directory.
    fn refreshed(mut self) -> Self {
        let index = self.index_view();
        self.working_directory = self
            .working_directory
            .iter()
            .map(|(path, entry)| {
                let modified = index.get(path) != Some(&entry.content);
                (path.clone(), FileEntry { modified, ..entry.clone() })
            })
            .collect();
        self
    }

    /// Write a file into the working directory (quest setup and tests).
    pub fn with_file(&self, path: &str, content: &str) -> Self {
        let mut next = self.clone();
        next.working_directory
            .insert(path.to_string(), FileEntry::new(content));
        next.refreshed()
    }

    /// Remove a file from the working directory.
    pub fn without_file(&self, path: &str) -> Self {
        let mut next = self.clone();
        next.working_directory.remove(path);
        next.refreshed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(n: u32) -> UtcTimestamp {
        UtcTimestamp::parse(&format!("2024-01-01T00:00:{:02}Z", n)).unwrap()
    }

    fn repo() -> RepositoryState {
        RepositoryState::new("test").initialize(&BranchName::new("main").unwrap())
    }

    fn committed(files: &[(&str, &str)]) -> RepositoryState {
        let mut state = repo();
        for (path, content) in files {
            state = state.with_file(path, content);
        }
        state
            .stage_all()
            .unwrap()
            .record_commit("initial", "Tester", ts(0))
            .unwrap()
    }

    #[test]
    fn init_creates_unborn_branch() {
        let state = repo();
        assert!(state.is_initialized());
        assert_eq!(state.head_ref(), HeadRef::Branch(BranchName::new("main").unwrap()));
        assert!(state.head_oid().is_none());
        assert_eq!(state.current_branch().unwrap().commit_hash, None);
    }

    #[test]
    fn uninitialized_rejects_mutation() {
        let state = RepositoryState::new("x").with_file("a", "1");
        assert_eq!(state.stage_file("a"), Err(StateError::NotARepository));
    }

    #[test]
    fn stage_copies_from_working_directory() {
        let state = repo().with_file("a.txt", "hello");
        let staged = state.stage_file("a.txt").unwrap();
        assert_eq!(staged.staging_area["a.txt"].content, "hello");
        assert!(!staged.working_directory["a.txt"].modified);
        assert!(state.working_directory["a.txt"].modified);
    }

    #[test]
    fn stage_unknown_path_fails() {
        assert_eq!(
            repo().stage_file("nope"),
            Err(StateError::PathspecNotFound("nope".into()))
        );
    }

    #[test]
    fn staging_committed_content_clears_delta() {
        let state = committed(&[("a.txt", "v1")]);
        let edited = state.with_file("a.txt", "v2").stage_file("a.txt").unwrap();
        assert!(edited.staging_area.contains_key("a.txt"));
        let reverted = edited.with_file("a.txt", "v1").stage_file("a.txt").unwrap();
        assert!(reverted.staging_area.is_empty());
    }

    #[test]
    fn deleted_file_stages_removal() {
        let state = committed(&[("a.txt", "v1"), ("b.txt", "b")]);
        let staged = state.without_file("a.txt").stage_file("a.txt").unwrap();
        assert!(staged.staging_area["a.txt"].deleted);
        let next = staged.record_commit("remove a", "Tester", ts(1)).unwrap();
        assert!(!next.head_tree().contains_key("a.txt"));
        assert!(next.head_tree().contains_key("b.txt"));
    }

    #[test]
    fn commit_requires_staged_changes() {
        let state = committed(&[("a.txt", "v1")]);
        assert_eq!(
            state.record_commit("again", "Tester", ts(1)),
            Err(StateError::NothingToCommit)
        );
        assert_eq!(
            state.with_file("a.txt", "v2").record_commit("again", "Tester", ts(1)),
            Err(StateError::NoChangesAdded)
        );
    }

    #[test]
    fn commit_appends_and_advances_branch() {
        let first = committed(&[("a.txt", "v1")]);
        let root = first.head_commit().unwrap().clone();
        assert!(root.parent.is_none());

        let second = first
            .with_file("a.txt", "v2")
            .stage_all()
            .unwrap()
            .record_commit("second", "Tester", ts(1))
            .unwrap();
        assert_eq!(second.commits.len(), 2);
        assert_eq!(second.commits[0], root);
        assert_eq!(second.head_commit().unwrap().parent.as_ref(), Some(&root.hash));
        assert!(second.staging_area.is_empty());
    }

    #[test]
    fn commit_on_detached_head_moves_head_only() {
        let state = committed(&[("a.txt", "v1")]);
        let root = state.head_oid().unwrap();
        let detached = state.set_head(root.as_str()).unwrap();
        assert!(detached.is_detached());

        let next = detached
            .with_file("a.txt", "v2")
            .stage_all()
            .unwrap()
            .record_commit("floating", "Tester", ts(1))
            .unwrap();
        assert!(next.is_detached());
        assert_ne!(next.head_oid(), Some(root.clone()));
        assert_eq!(next.find_branch("main").unwrap().commit_hash, Some(root));
    }

    #[test]
    fn branch_lifecycle() {
        let state = committed(&[("a.txt", "v1")]);
        let with_branch = state.create_branch("feature", None).unwrap();
        assert_eq!(
            with_branch.create_branch("feature", None),
            Err(StateError::BranchExists("feature".into()))
        );
        assert_eq!(
            with_branch.delete_branch("main", false),
            Err(StateError::CannotDeleteCurrent("main".into()))
        );
        let deleted = with_branch.delete_branch("feature", false).unwrap();
        assert!(deleted.find_branch("feature").is_none());
    }

    #[test]
    fn unmerged_branch_needs_force() {
        let state = committed(&[("a.txt", "v1")])
            .create_branch("feature", None)
            .unwrap()
            .set_head("feature")
            .unwrap()
            .with_file("a.txt", "v2")
            .stage_all()
            .unwrap()
            .record_commit("feature work", "Tester", ts(1))
            .unwrap()
            .set_head("main")
            .unwrap();
        assert_eq!(
            state.delete_branch("feature", false),
            Err(StateError::BranchNotMerged("feature".into()))
        );
        assert!(state.delete_branch("feature", true).is_ok());
    }

    #[test]
    fn branch_on_unborn_head_fails() {
        assert_eq!(
            repo().create_branch("feature", None),
            Err(StateError::NoCommitsYet("main".into()))
        );
    }

    #[test]
    fn resolve_ref_forms() {
        let mut state = committed(&[("a.txt", "1")]);
        for n in 2..=3 {
            state = state
                .with_file("a.txt", &n.to_string())
                .stage_all()
                .unwrap()
                .record_commit(&format!("c{n}"), "Tester", ts(n))
                .unwrap();
        }
        let tip = state.head_oid().unwrap();
        let c2 = state.commits[1].hash.clone();
        let root = state.commits[0].hash.clone();

        assert_eq!(state.resolve_ref("HEAD"), Some(tip.clone()));
        assert_eq!(state.resolve_ref("main"), Some(tip.clone()));
        assert_eq!(state.resolve_ref("HEAD~1"), Some(c2.clone()));
        assert_eq!(state.resolve_ref("main^"), Some(c2));
        assert_eq!(state.resolve_ref("HEAD~2"), Some(root.clone()));
        assert_eq!(state.resolve_ref("HEAD~3"), None);
        assert_eq!(state.resolve_ref(root.short(7)), Some(root.clone()));
        assert_eq!(state.resolve_ref(root.as_str()), Some(root));
        assert_eq!(state.resolve_ref("abc"), None);
        assert_eq!(state.resolve_ref("nonexistent"), None);
    }

    #[test]
    fn malformed_rev_suffixes_resolve_to_nothing() {
        let state = committed(&[("a.txt", "1")]);
        assert_eq!(state.resolve_ref("HEAD~0é"), None);
        assert_eq!(state.resolve_ref("HEAD^0é"), None);
        assert_eq!(state.resolve_ref("HEAD~x"), None);
        assert_eq!(state.resolve_ref("HEAD~1é"), None);
        assert_eq!(state.resolve_ref("main~"), None);
        assert_eq!(state.resolve_ref("HEAD^0"), state.head_oid());
        assert_eq!(state.resolve_ref("HEAD~99999999999999999999999"), None);
    }

    #[test]
    fn discard_restores_index_content() {
        let state = committed(&[("a.txt", "v1")]).with_file("a.txt", "oops");
        let restored = state.discard_working_changes("a.txt").unwrap();
        assert_eq!(restored.working_directory["a.txt"].content, "v1");
        assert!(!restored.working_directory["a.txt"].modified);
        assert_eq!(
            state.with_file("new.txt", "x").discard_working_changes("new.txt"),
            Err(StateError::UntrackedPath("new.txt".into()))
        );
    }

    #[test]
    fn remotes_and_pointers() {
        let state = committed(&[("a.txt", "v1")]);
        let tip = state.head_oid().unwrap();
        let with_remote = state.add_remote("origin", "https://example.com/r.git").unwrap();
        assert!(matches!(
            with_remote.add_remote("origin", "x"),
            Err(StateError::RemoteExists(_))
        ));
        let tracked = with_remote
            .set_remote_branch("origin", "main", tip.clone())
            .unwrap();
        assert_eq!(tracked.resolve_ref("origin/main"), Some(tip));
    }

    #[test]
    fn serde_roundtrip_preserves_state() {
        let state = committed(&[("README.md", "# hi\n"), ("src/lib.rs", "")]);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"workingDirectory\""));
        assert!(json.contains("\"commitHash\""));
        let back: RepositoryState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn unborn_branch_serializes_as_empty_hash() {
        let json = serde_json::to_value(repo()).unwrap();
        assert_eq!(json["branches"][0]["commitHash"], "");
    }
}
