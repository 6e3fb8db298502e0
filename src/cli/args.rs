//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Engine config file instead of the default location
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// gitdojo - practice git against a simulated repository
#[derive(Parser, Debug)]
#[command(name = "gitdojo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Engine config file (default: $GITDOJO_CONFIG or the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one git command against a state file
    #[command(
        name = "exec",
        long_about = "Run one git command against a repository state file.\n\n\
            The state is read from --state (an empty repository if the file does \
            not exist yet), the command runs in the simulator, and the new state is \
            written back. A refused command prints git's message and leaves the file \
            unchanged.",
        after_help = "\
EXAMPLES:
    gitdojo exec --state quest.json \"git init\"
    gitdojo exec --state quest.json \"git commit -m 'Initial commit'\""
    )]
    Exec {
        /// Repository state JSON file
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        /// JSON map of URL to repository state, for clone/fetch/pull
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        /// The git command line, quoted
        command: String,
    },

    /// Grade a state file against quest criteria
    #[command(
        name = "validate",
        long_about = "Grade a repository state against quest criteria.\n\n\
            The criteria file holds one criterion object, or an array of them for \
            a boss battle. The result is printed as JSON; the exit status is \
            non-zero when grading fails."
    )]
    Validate {
        /// Repository state JSON file
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        /// Criteria JSON file
        #[arg(long, value_name = "FILE")]
        criteria: PathBuf,
    },

    /// Run a script of git commands, one per line
    #[command(
        name = "replay",
        long_about = "Run every line of a script against a state file.\n\n\
            Blank lines and lines starting with '#' are skipped. Refused commands \
            are reported and the replay continues, as if a learner had typed them.",
        after_help = "\
EXAMPLES:
    gitdojo replay --state scratch.json --script lesson-3.txt"
    )]
    Replay {
        /// Repository state JSON file
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        /// File of git command lines
        #[arg(long, value_name = "FILE")]
        script: PathBuf,

        /// JSON map of URL to repository state, for clone/fetch/pull
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },

    /// Write an empty, uninitialized state file
    #[command(name = "new")]
    New {
        /// Where to write the state
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        /// Repository id (random when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Edit a file in the simulated working directory
    #[command(
        name = "write",
        group(clap::ArgGroup::new("source").required(true).args(["content", "from", "remove"])),
        after_help = "\
EXAMPLES:
    gitdojo write --state quest.json notes.txt --content 'first draft'
    gitdojo write --state quest.json src/lib.rs --from ./lib.rs
    gitdojo write --state quest.json notes.txt --remove"
    )]
    Write {
        /// Repository state JSON file
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        /// Path inside the repository
        path: String,

        /// New file content
        #[arg(long)]
        content: Option<String>,

        /// Copy the content of a local text file
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Delete the file instead
        #[arg(long)]
        remove: bool,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
INSTALLATION:
    # Bash
    gitdojo completion bash > ~/.local/share/bash-completion/completions/gitdojo

    # Zsh
    gitdojo completion zsh > ~/.zfunc/_gitdojo

    # Fish
    gitdojo completion fish > ~/.config/fish/completions/gitdojo.fish

    # PowerShell
    gitdojo completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
