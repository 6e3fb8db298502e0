//! engine
//!
//! Interprets git command lines against a repository state.
//!
//! # Architecture
//!
//! Every command line goes through the same lifecycle:
//!
//! ```text
//! Parse -> Gate -> Run -> Verify
//! ```
//!
//! 1. **Parse**: tokenize and map the line to one [`GitCommand`]
//! 2. **Gate**: check the command's [`Requirement`] against the state
//! 3. **Run**: the handler computes output text and a new state
//! 4. **Verify**: structural invariants must hold on the new state
//!
//! A failure in steps 1 to 3 is a learner mistake: the caller gets the
//! message and its own state back. A failure in step 4 is an engine bug and
//! surfaces as [`FatalError`].
//!
//! # Invariants
//!
//! - `execute` never mutates its input; states are values
//! - On error, `new_state` equals the input state
//! - The only time source is the injected [`Clock`]
//!
//! # Example
//!
//! ```
//! use gitdojo::core::state::RepositoryState;
//! use gitdojo::engine::Engine;
//!
//! let engine = Engine::default();
//! let state = RepositoryState::new("quest-1");
//!
//! let run = engine.execute(&state, "git init").unwrap();
//! assert!(run.error.is_none());
//! assert!(run.new_state.is_initialized());
//!
//! let run = engine.execute(&run.new_state, "git commit -m nothing").unwrap();
//! assert!(run.error.is_some());
//! ```

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod command;
pub mod error;
mod handlers;
pub mod parse;

pub use cache::ReplayCache;
pub use catalog::{EmptyCatalog, InMemoryCatalog, RemoteCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use command::{CommandOutput, GitCommand, Requirement};
pub use error::EngineError;
pub use parse::{parse_command, ParseError};

use thiserror::Error;

use crate::core::config::EngineConfig;
use crate::core::state::{MergeKind, RepositoryState, StateError};
use crate::core::types::{Oid, UtcTimestamp};
use crate::core::verify::{verify_state, VerifyError};

/// An engine bug: a command produced a state that breaks an invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("internal error: '{command}' left the repository inconsistent: {source}")]
    Invariant {
        command: String,
        #[source]
        source: VerifyError,
    },
}

/// Result of running one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Text a terminal would show on success.
    pub output: String,
    /// Error message when the command was refused.
    pub error: Option<String>,
    /// State after the command; the input state when `error` is set.
    pub new_state: RepositoryState,
}

impl Execution {
    fn success(output: String, new_state: RepositoryState) -> Self {
        Self {
            output,
            error: None,
            new_state,
        }
    }

    fn failure(error: String, state: RepositoryState) -> Self {
        Self {
            output: String::new(),
            error: Some(error),
            new_state: state,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Output on success, the error message otherwise.
    pub fn message(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.output)
    }
}

/// The command interpreter.
pub struct Engine {
    config: EngineConfig,
    clock: Box<dyn Clock>,
    catalog: Box<dyn RemoteCatalog>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// An engine using `config`. A configured fixed clock wins over the
    /// system clock.
    pub fn new(config: EngineConfig) -> Self {
        let clock: Box<dyn Clock> = match config.fixed_time() {
            Some(instant) => Box::new(FixedClock(instant)),
            None => Box::new(SystemClock),
        };
        Self {
            config,
            clock,
            catalog: Box::new(EmptyCatalog),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_catalog(mut self, catalog: impl RemoteCatalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn catalog(&self) -> &dyn RemoteCatalog {
        self.catalog.as_ref()
    }

    pub(crate) fn now(&self) -> UtcTimestamp {
        self.clock.now()
    }

    pub(crate) fn author(&self) -> String {
        self.config.author()
    }

    /// Abbreviated hash at the configured length.
    pub(crate) fn short<'a>(&self, oid: &'a Oid) -> &'a str {
        oid.short(self.config.abbrev())
    }

    /// Run one command line.
    ///
    /// # Errors
    ///
    /// Only [`FatalError`]; refused commands are reported in
    /// [`Execution::error`].
    pub fn execute(&self, state: &RepositoryState, line: &str) -> Result<Execution, FatalError> {
        let outcome = parse_command(line)
            .map_err(EngineError::from)
            .and_then(|command| {
                tracing::debug!(command = command.name(), "parsed command");
                self.run(state, &command)
            });

        match outcome {
            Ok(output) => {
                if let Err(source) = verify_state(&output.state).into_result() {
                    tracing::error!(command = line, error = %source, "invariant violated");
                    return Err(FatalError::Invariant {
                        command: line.to_string(),
                        source,
                    });
                }
                tracing::debug!(command = line, commits = output.state.commits.len(), "command succeeded");
                Ok(Execution::success(output.text, output.state))
            }
            Err(err) => {
                tracing::warn!(command = line, error = %err, "command refused");
                Ok(Execution::failure(err.to_string(), state.clone()))
            }
        }
    }

    /// Gate and dispatch an already parsed command.
    pub fn run(
        &self,
        state: &RepositoryState,
        command: &GitCommand,
    ) -> Result<CommandOutput, EngineError> {
        gate(state, command)?;
        handlers::dispatch(self, state, command)
    }

    /// Run `commands` in order from `initial`, reusing cached prefixes.
    ///
    /// Refused commands leave the state as it was and replay continues, the
    /// same as a learner typing them one after another.
    pub fn replay(
        &self,
        initial: &RepositoryState,
        commands: &[String],
        cache: &mut ReplayCache,
    ) -> Result<RepositoryState, FatalError> {
        let mut state = initial.clone();
        for end in 1..=commands.len() {
            let prefix = &commands[..end];
            if let Some(hit) = cache.get(&initial.id, prefix) {
                state = hit;
                continue;
            }
            state = self.execute(&state, &prefix[end - 1])?.new_state;
            cache.insert(&initial.id, prefix, state.clone());
        }
        Ok(state)
    }
}

fn gate(state: &RepositoryState, command: &GitCommand) -> Result<(), EngineError> {
    let requirement = command.requirement();
    if requirement.satisfied_by(state) {
        return Ok(());
    }
    if !state.is_initialized() {
        return Err(StateError::NotARepository.into());
    }
    let message = match state.merge_state.as_ref().map(|m| m.kind) {
        Some(MergeKind::Revert) => format!(
            "error: {} is not possible because a revert is in progress.\n\
             hint: resolve the conflicts and run \"git commit\", or \"git merge --abort\".",
            command.name()
        ),
        _ => format!(
            "error: {} is not possible because you have unmerged files.\n\
             hint: Fix them up in the work tree, and then use 'git add <file>'\n\
             hint: as appropriate to mark resolution and make a commit.\n\
             fatal: You have not concluded your merge (MERGE_HEAD exists).",
            command.name()
        ),
    };
    Err(EngineError::Precondition(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::default().with_clock(FixedClock(
            UtcTimestamp::parse("2024-01-01T12:00:00Z").unwrap(),
        ))
    }

    fn run(engine: &Engine, state: &RepositoryState, lines: &[&str]) -> RepositoryState {
        lines.iter().fold(state.clone(), |state, line| {
            let run = engine.execute(&state, line).unwrap();
            assert!(run.is_success(), "{line}: {:?}", run.error);
            run.new_state
        })
    }

    #[test]
    fn uninitialized_state_rejects_commands() {
        let state = RepositoryState::new("t");
        let run = engine().execute(&state, "git status").unwrap();
        assert_eq!(
            run.error.as_deref(),
            Some("fatal: not a git repository (or any of the parent directories): .git")
        );
        assert_eq!(run.new_state, state);
    }

    #[test]
    fn parse_errors_leave_state_alone() {
        let state = RepositoryState::new("t");
        let run = engine().execute(&state, "gti status").unwrap();
        assert!(run.error.unwrap().contains("not a recognized command"));
        assert_eq!(run.new_state, state);
    }

    #[test]
    fn fixed_clock_from_config() {
        let config = crate::core::config::parse("[clock]\nfixed = \"2024-02-02T00:00:00Z\"").unwrap();
        let engine = Engine::new(config);
        assert_eq!(
            engine.now(),
            UtcTimestamp::parse("2024-02-02T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn merge_in_progress_blocks_new_merges() {
        let engine = engine();
        let state = run(
            &engine,
            &RepositoryState::new("t"),
            &["git init"],
        )
        .with_file("f", "base\n");
        let state = run(&engine, &state, &["git add f", "git commit -m base", "git checkout -b other"])
            .with_file("f", "other\n");
        let state = run(&engine, &state, &["git commit -am other", "git checkout main"])
            .with_file("f", "main\n");
        let state = run(&engine, &state, &["git commit -am main", "git merge other"]);
        assert!(state.merge_state.is_some());

        let refused = engine.execute(&state, "git merge other").unwrap();
        assert!(refused.error.unwrap().contains("You have not concluded your merge"));
    }

    #[test]
    fn replay_uses_cached_prefixes() {
        let engine = engine();
        let initial = RepositoryState::new("replay");
        let commands: Vec<String> = ["git init", "git branch -v", "git status"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut cache = ReplayCache::new(16);
        let first = engine.replay(&initial, &commands, &mut cache).unwrap();
        assert_eq!(cache.len(), 3);
        let second = engine.replay(&initial, &commands, &mut cache).unwrap();
        assert_eq!(first, second);
        assert!(first.is_initialized());
    }
}
