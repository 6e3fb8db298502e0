//! engine::cache
//!
//! Caller-owned memo of replayed command sequences.
//!
//! Quest checkers often replay a learner's whole transcript after every new
//! command. The cache maps `(repository id, commands so far)` to the state
//! they produced, so each replay only executes the new suffix. The engine
//! never holds one itself; callers pass it to [`Engine::replay`].
//!
//! [`Engine::replay`]: super::Engine::replay

use quick_cache::unsync::Cache;

use crate::core::state::RepositoryState;

type ReplayKey = (String, Vec<String>);

/// Bounded cache of replayed states.
pub struct ReplayCache {
    entries: Cache<ReplayKey, RepositoryState>,
}

impl std::fmt::Debug for ReplayCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayCache")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl Default for ReplayCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ReplayCache {
    /// A cache holding at most `capacity` states.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Cache::new(capacity.max(1)),
        }
    }

    pub fn get(&mut self, repository: &str, commands: &[String]) -> Option<RepositoryState> {
        let key = (repository.to_string(), commands.to_vec());
        self.entries.get(&key).cloned()
    }

    pub fn insert(&mut self, repository: &str, commands: &[String], state: RepositoryState) {
        self.entries
            .insert((repository.to_string(), commands.to_vec()), state);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmds(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keyed_by_repository_and_sequence() {
        let mut cache = ReplayCache::new(8);
        let state = RepositoryState::new("a");
        cache.insert("a", &cmds(&["git init"]), state.clone());

        assert_eq!(cache.get("a", &cmds(&["git init"])), Some(state));
        assert_eq!(cache.get("b", &cmds(&["git init"])), None);
        assert_eq!(cache.get("a", &cmds(&["git init", "git status"])), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
