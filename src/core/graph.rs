//! core::graph
//!
//! Commit DAG representation and ancestry queries.
//!
//! # Architecture
//!
//! The graph is derived from a [`RepositoryState`]'s commit list:
//! - Nodes are commits
//! - Edges point from child to parent (first parent first)
//! - Roots are commits without parents
//!
//! It is a read-only view rebuilt when needed; states stay the single source
//! of truth.

use std::collections::{HashMap, HashSet, VecDeque};

use super::state::RepositoryState;
use super::types::Oid;

/// Parent/child adjacency over a repository's commits.
#[derive(Debug, Default)]
pub struct CommitGraph {
    /// Parent links for each commit, in parent order
    parents: HashMap<Oid, Vec<Oid>>,
    /// Derived child sets
    children: HashMap<Oid, HashSet<Oid>>,
    /// Position in the append-only commit log, used for recency ordering
    positions: HashMap<Oid, usize>,
}

impl CommitGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every commit in `state`.
    pub fn from_state(state: &RepositoryState) -> Self {
        let mut graph = Self::new();
        for (position, commit) in state.commits.iter().enumerate() {
            graph.add_commit(
                commit.hash.clone(),
                commit.parent_ids().into_iter().cloned().collect(),
                position,
            );
        }
        graph
    }

    /// Add a commit node with its parent edges.
    pub fn add_commit(&mut self, oid: Oid, parents: Vec<Oid>, position: usize) {
        for parent in &parents {
            self.children
                .entry(parent.clone())
                .or_default()
                .insert(oid.clone());
        }
        self.positions.insert(oid.clone(), position);
        self.parents.insert(oid, parents);
    }

    /// Whether the commit is known.
    pub fn contains(&self, oid: &Oid) -> bool {
        self.parents.contains_key(oid)
    }

    /// Parents of a commit.
    pub fn parents(&self, oid: &Oid) -> &[Oid] {
        self.parents.get(oid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Children of a commit.
    pub fn children(&self, oid: &Oid) -> Option<&HashSet<Oid>> {
        self.children.get(oid)
    }

    /// Every commit reachable from `oid`, including `oid` itself.
    pub fn ancestors(&self, oid: &Oid) -> HashSet<Oid> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([oid.clone()]);
        while let Some(current) = queue.pop_front() {
            if !self.contains(&current) || !seen.insert(current.clone()) {
                continue;
            }
            queue.extend(self.parents(&current).iter().cloned());
        }
        seen
    }

    /// Whether `ancestor` is reachable from `descendant` (a commit is its own
    /// ancestor).
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> bool {
        self.ancestors(descendant).contains(ancestor)
    }

    /// Nearest common ancestor of two commits.
    ///
    /// Among the common ancestors, keeps those with no child that is also a
    /// common ancestor (any common descendant implies a common child on the
    /// path to it), then picks the most recently created one so criss-cross
    /// histories still resolve deterministically.
    ///
    /// # Example
    ///
    /// ```
    /// use gitdojo::core::graph::CommitGraph;
    /// use gitdojo::core::types::Oid;
    ///
    /// let base = Oid::hash_object("commit", b"base");
    /// let left = Oid::hash_object("commit", b"left");
    /// let right = Oid::hash_object("commit", b"right");
    ///
    /// let mut graph = CommitGraph::new();
    /// graph.add_commit(base.clone(), vec![], 0);
    /// graph.add_commit(left.clone(), vec![base.clone()], 1);
    /// graph.add_commit(right.clone(), vec![base.clone()], 2);
    ///
    /// assert_eq!(graph.merge_base(&left, &right), Some(base));
    /// ```
    pub fn merge_base(&self, a: &Oid, b: &Oid) -> Option<Oid> {
        let from_a = self.ancestors(a);
        let from_b = self.ancestors(b);
        let common: HashSet<&Oid> = from_a.intersection(&from_b).collect();

        common
            .iter()
            .filter(|candidate| {
                self.children(candidate)
                    .map_or(true, |kids| kids.iter().all(|kid| !common.contains(kid)))
            })
            .max_by_key(|candidate| self.positions.get(**candidate).copied().unwrap_or(0))
            .map(|oid| (*oid).clone())
    }

    /// Commits reachable from `oid`, newest first.
    pub fn history(&self, oid: &Oid) -> Vec<Oid> {
        let mut reachable: Vec<Oid> = self.ancestors(oid).into_iter().collect();
        reachable.sort_by_key(|c| std::cmp::Reverse(self.positions.get(c).copied()));
        reachable
    }

    /// Check the parent links for cycles.
    ///
    /// Returns `Some(commit)` for a commit on a cycle. The walk keeps its own
    /// stack, so deep histories cannot overflow the call stack.
    pub fn find_cycle(&self) -> Option<Oid> {
        let mut done: HashSet<&Oid> = HashSet::new();
        let mut on_path: HashSet<&Oid> = HashSet::new();
        let mut roots: Vec<&Oid> = self.parents.keys().collect();
        roots.sort();

        for root in roots {
            if done.contains(root) {
                continue;
            }
            // (commit, index of the next parent to visit)
            let mut stack: Vec<(&Oid, usize)> = vec![(root, 0)];
            on_path.insert(root);
            while let Some((node, next)) = stack.last_mut() {
                let node = *node;
                match self.parents(node).get(*next) {
                    Some(parent) => {
                        *next += 1;
                        if on_path.contains(parent) {
                            return Some(parent.clone());
                        }
                        if !done.contains(parent) {
                            on_path.insert(parent);
                            stack.push((parent, 0));
                        }
                    }
                    None => {
                        stack.pop();
                        on_path.remove(node);
                        done.insert(node);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(name: &str) -> Oid {
        Oid::hash_object("commit", name.as_bytes())
    }

    /// a - b - c        (main)
    ///      \
    ///       d - e      (feature)
    fn forked() -> CommitGraph {
        let mut graph = CommitGraph::new();
        graph.add_commit(oid("a"), vec![], 0);
        graph.add_commit(oid("b"), vec![oid("a")], 1);
        graph.add_commit(oid("c"), vec![oid("b")], 2);
        graph.add_commit(oid("d"), vec![oid("b")], 3);
        graph.add_commit(oid("e"), vec![oid("d")], 4);
        graph
    }

    #[test]
    fn ancestors_include_self() {
        let graph = forked();
        let ancestors = graph.ancestors(&oid("c"));
        assert_eq!(ancestors.len(), 3);
        assert!(ancestors.contains(&oid("c")));
        assert!(!ancestors.contains(&oid("d")));
    }

    #[test]
    fn ancestry_checks() {
        let graph = forked();
        assert!(graph.is_ancestor(&oid("a"), &oid("e")));
        assert!(graph.is_ancestor(&oid("e"), &oid("e")));
        assert!(!graph.is_ancestor(&oid("c"), &oid("e")));
    }

    #[test]
    fn merge_base_of_fork() {
        let graph = forked();
        assert_eq!(graph.merge_base(&oid("c"), &oid("e")), Some(oid("b")));
        assert_eq!(graph.merge_base(&oid("a"), &oid("e")), Some(oid("a")));
    }

    #[test]
    fn merge_base_after_merge_commit() {
        let mut graph = forked();
        // f merges e into c; later g on feature
        graph.add_commit(oid("f"), vec![oid("c"), oid("e")], 5);
        graph.add_commit(oid("g"), vec![oid("e")], 6);
        assert_eq!(graph.merge_base(&oid("f"), &oid("g")), Some(oid("e")));
    }

    #[test]
    fn unrelated_histories_have_no_base() {
        let mut graph = forked();
        graph.add_commit(oid("x"), vec![], 5);
        assert_eq!(graph.merge_base(&oid("x"), &oid("c")), None);
    }

    #[test]
    fn history_is_newest_first() {
        let graph = forked();
        assert_eq!(graph.history(&oid("e")), vec![oid("e"), oid("d"), oid("b"), oid("a")]);
    }

    #[test]
    fn children_are_tracked() {
        let graph = forked();
        let children = graph.children(&oid("b")).unwrap();
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn cycle_detection() {
        assert!(forked().find_cycle().is_none());

        let mut graph = CommitGraph::new();
        graph.add_commit(oid("p"), vec![oid("q")], 0);
        graph.add_commit(oid("q"), vec![oid("p")], 1);
        graph.add_commit(oid("r"), vec![oid("p")], 2);
        let found = graph.find_cycle().unwrap();
        assert!(found == oid("p") || found == oid("q"));
    }

    #[test]
    fn deep_history_walks_without_recursion() {
        let mut graph = CommitGraph::new();
        let chain: Vec<Oid> = (0..200_000).map(|n| oid(&n.to_string())).collect();
        for (n, commit) in chain.iter().enumerate() {
            let parents = if n == 0 { vec![] } else { vec![chain[n - 1].clone()] };
            graph.add_commit(commit.clone(), parents, n);
        }
        assert!(graph.find_cycle().is_none());
        assert_eq!(graph.ancestors(chain.last().unwrap()).len(), chain.len());
    }

    #[test]
    fn merge_base_prefers_the_newest_criss_cross_base() {
        // a - b - m1      b and c both merged into each other's side
        //   \   X
        //    c - m2
        let mut graph = CommitGraph::new();
        graph.add_commit(oid("a"), vec![], 0);
        graph.add_commit(oid("b"), vec![oid("a")], 1);
        graph.add_commit(oid("c"), vec![oid("a")], 2);
        graph.add_commit(oid("m1"), vec![oid("b"), oid("c")], 3);
        graph.add_commit(oid("m2"), vec![oid("c"), oid("b")], 4);
        assert_eq!(graph.merge_base(&oid("m1"), &oid("m2")), Some(oid("c")));
    }
}
