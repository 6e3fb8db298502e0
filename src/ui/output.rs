//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Simulated git output goes to stdout, git's refusal messages to stderr,
//! the same split a real terminal shows. Quiet mode silences everything
//! except refusals and errors.

use std::fmt::Display;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode). Empty messages print nothing.
pub fn print(message: impl Display, verbosity: Verbosity) {
    let text = message.to_string();
    if verbosity != Verbosity::Quiet && !text.is_empty() {
        println!("{text}");
    }
}

/// Print a simulated git refusal exactly as git words it (always shown).
pub fn refusal(message: impl Display) {
    eprintln!("{message}");
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {message}");
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {message}");
    }
}

/// Echo a replayed command line the way a shell transcript shows it.
pub fn format_prompt(line: &str) -> String {
    format!("$ {line}")
}
