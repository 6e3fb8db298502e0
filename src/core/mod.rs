//! core
//!
//! Domain types and the repository value model.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, RemoteName, Oid, UtcTimestamp
//! - [`files`] - Working-directory, staging and snapshot maps
//! - [`object`] - Content-addressed blobs and trees
//! - [`state`] - The repository aggregate and its mutators
//! - [`graph`] - Commit DAG and ancestry queries
//! - [`verify`] - Structural invariant verification
//! - [`config`] - Engine configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at construction time
//! - States are values; mutators return new states
//! - All hashing and verification is deterministic

pub mod config;
pub mod files;
pub mod graph;
pub mod object;
pub mod state;
pub mod types;
pub mod verify;
