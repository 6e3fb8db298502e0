//! ui
//!
//! Terminal output for the CLI.
//!
//! # Modules
//!
//! - [`output`] - Verbosity handling and printing helpers
//!
//! Library code never prints; command output is returned as text and only
//! the CLI decides where it goes.

pub mod output;
