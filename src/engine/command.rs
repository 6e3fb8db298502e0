//! engine::command
//!
//! Typed git commands and their gating requirements.
//!
//! # Architecture
//!
//! A command line is parsed into exactly one [`GitCommand`]. Each command
//! declares a [`Requirement`] the engine checks before dispatching it, so
//! handlers never have to ask whether the repository exists.
//!
//! # Example
//!
//! ```
//! use gitdojo::engine::command::{GitCommand, Requirement};
//!
//! assert_eq!(GitCommand::Init.requirement(), Requirement::None);
//! assert_eq!(GitCommand::Status.requirement(), Requirement::Repository);
//! ```

use crate::core::state::RepositoryState;

/// What must hold before a command may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Runs on any state, initialized or not.
    None,
    /// Needs `init` or `clone` to have run.
    Repository,
    /// Needs an initialized repository with no merge or revert in progress.
    Idle,
}

impl Requirement {
    /// Whether `state` satisfies this requirement.
    pub fn satisfied_by(self, state: &RepositoryState) -> bool {
        match self {
            Requirement::None => true,
            Requirement::Repository => state.is_initialized(),
            Requirement::Idle => state.is_initialized() && state.merge_state.is_none(),
        }
    }
}

/// `reset` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetMode {
    Soft,
    #[default]
    Mixed,
    Hard,
}

/// `git branch` forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchAction {
    List,
    Create { name: String, start: Option<String> },
    Delete { name: String, force: bool },
}

/// `git checkout` forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutTarget {
    /// A branch, commit, or (if nothing resolves) a path.
    Ref(String),
    /// `-b <name> [<start>]`
    NewBranch { name: String, start: Option<String> },
    /// `-- <path>...`
    Paths(Vec<String>),
}

/// `git merge` forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAction {
    Branch(String),
    Abort,
}

/// `git remote` forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAction {
    List { verbose: bool },
    Add { name: String, url: String },
}

/// One parsed git command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCommand {
    Init,
    Status,
    Add {
        paths: Vec<String>,
        all: bool,
    },
    Commit {
        message: Option<String>,
        all: bool,
    },
    Log {
        oneline: bool,
        limit: Option<usize>,
    },
    Diff {
        staged: bool,
        path: Option<String>,
    },
    Branch(BranchAction),
    Checkout(CheckoutTarget),
    Merge(MergeAction),
    Reset {
        mode: Option<ResetMode>,
        target: Option<String>,
        paths: Vec<String>,
    },
    Revert {
        commit: String,
    },
    Remote(RemoteAction),
    Push {
        set_upstream: bool,
        remote: Option<String>,
        branch: Option<String>,
    },
    Pull {
        remote: Option<String>,
        branch: Option<String>,
    },
    Fetch {
        remote: Option<String>,
        branch: Option<String>,
    },
    Clone {
        url: String,
    },
    Restore {
        staged: bool,
        paths: Vec<String>,
    },
    Help,
}

impl GitCommand {
    /// Subcommand name as typed after `git`.
    pub fn name(&self) -> &'static str {
        match self {
            GitCommand::Init => "init",
            GitCommand::Status => "status",
            GitCommand::Add { .. } => "add",
            GitCommand::Commit { .. } => "commit",
            GitCommand::Log { .. } => "log",
            GitCommand::Diff { .. } => "diff",
            GitCommand::Branch(_) => "branch",
            GitCommand::Checkout(_) => "checkout",
            GitCommand::Merge(_) => "merge",
            GitCommand::Reset { .. } => "reset",
            GitCommand::Revert { .. } => "revert",
            GitCommand::Remote(_) => "remote",
            GitCommand::Push { .. } => "push",
            GitCommand::Pull { .. } => "pull",
            GitCommand::Fetch { .. } => "fetch",
            GitCommand::Clone { .. } => "clone",
            GitCommand::Restore { .. } => "restore",
            GitCommand::Help => "help",
        }
    }

    /// The gate this command must pass.
    ///
    /// Commands that would rewrite HEAD or the working tree wholesale wait
    /// until an in-progress merge is finished or aborted; `reset` and
    /// `merge --abort` are the ways out and stay available.
    pub fn requirement(&self) -> Requirement {
        match self {
            GitCommand::Init | GitCommand::Clone { .. } | GitCommand::Help => Requirement::None,
            GitCommand::Merge(MergeAction::Branch(_))
            | GitCommand::Revert { .. }
            | GitCommand::Pull { .. } => Requirement::Idle,
            _ => Requirement::Repository,
        }
    }

    /// Whether the command can never change the state.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            GitCommand::Status
                | GitCommand::Log { .. }
                | GitCommand::Diff { .. }
                | GitCommand::Help
                | GitCommand::Branch(BranchAction::List)
                | GitCommand::Remote(RemoteAction::List { .. })
        )
    }
}

/// What a handler produced: learner-facing text and the next state.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub text: String,
    pub state: RepositoryState,
}

impl CommandOutput {
    pub fn new(text: impl Into<String>, state: RepositoryState) -> Self {
        Self {
            text: text.into(),
            state,
        }
    }

    /// Output from a read-only command.
    pub fn unchanged(text: impl Into<String>, state: &RepositoryState) -> Self {
        Self::new(text, state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BranchName;

    #[test]
    fn requirements_gate_on_state() {
        let empty = RepositoryState::new("t");
        let ready = empty.initialize(&BranchName::default());
        assert!(Requirement::None.satisfied_by(&empty));
        assert!(!Requirement::Repository.satisfied_by(&empty));
        assert!(Requirement::Repository.satisfied_by(&ready));
        assert!(Requirement::Idle.satisfied_by(&ready));
    }

    #[test]
    fn clone_and_init_run_anywhere() {
        assert_eq!(GitCommand::Init.requirement(), Requirement::None);
        assert_eq!(
            GitCommand::Clone { url: "u".into() }.requirement(),
            Requirement::None
        );
        assert_eq!(
            GitCommand::Merge(MergeAction::Abort).requirement(),
            Requirement::Repository
        );
        assert_eq!(
            GitCommand::Merge(MergeAction::Branch("x".into())).requirement(),
            Requirement::Idle
        );
    }

    #[test]
    fn read_only_classification() {
        assert!(GitCommand::Status.is_read_only());
        assert!(GitCommand::Branch(BranchAction::List).is_read_only());
        assert!(!GitCommand::Branch(BranchAction::Delete {
            name: "x".into(),
            force: false
        })
        .is_read_only());
    }
}
