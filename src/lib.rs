//! gitdojo - an in-memory git simulator for teaching version control
//!
//! gitdojo interprets the git commands a learner types (`init`, `add`,
//! `commit`, `branch`, `checkout`, `merge`, `reset`, `revert`, remotes and
//! more) against a plain-data repository state, and grades the result
//! against quest criteria. No real repository or filesystem is involved.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (reads state files, delegates to engine)
//! - [`engine`] - Orchestrates the Parse → Gate → Run → Verify lifecycle
//! - [`core`] - Repository state, content hashing, commit graph, verification
//! - [`merge`] - Line diffs, three-way tree merges and conflict markers
//! - [`validate`] - Quest criteria and grading
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! gitdojo maintains the following invariants:
//!
//! 1. States are values; a command never mutates its input
//! 2. A refused command leaves the state exactly as it was
//! 3. Commit hashes are deterministic functions of commit content
//! 4. Every state a command produces passes structural verification

pub mod cli;
pub mod core;
pub mod engine;
pub mod merge;
pub mod ui;
pub mod validate;
