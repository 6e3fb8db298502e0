//! engine::catalog
//!
//! Lookup of simulated remote repositories by URL.
//!
//! `clone`, `fetch` and `pull` read from a catalog; nothing ever writes to
//! one. A quest that wants `git clone <url>` to produce history registers
//! the remote's state under that URL.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::state::RepositoryState;

/// Read-only map from URL to remote repository state.
pub trait RemoteCatalog: Send + Sync {
    fn lookup(&self, url: &str) -> Option<RepositoryState>;
}

/// A catalog that knows no remotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCatalog;

impl RemoteCatalog for EmptyCatalog {
    fn lookup(&self, _url: &str) -> Option<RepositoryState> {
        None
    }
}

/// Catalog backed by a map, deserializable from `{ "<url>": <state> }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryCatalog {
    repositories: HashMap<String, RepositoryState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `state` under `url`, replacing any previous entry.
    pub fn insert(&mut self, url: impl Into<String>, state: RepositoryState) {
        self.repositories.insert(url.into(), state);
    }

    pub fn with(mut self, url: impl Into<String>, state: RepositoryState) -> Self {
        self.insert(url, state);
        self
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

impl RemoteCatalog for InMemoryCatalog {
    fn lookup(&self, url: &str) -> Option<RepositoryState> {
        self.repositories.get(url).cloned()
    }
}
