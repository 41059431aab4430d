//! Core types for treehoist.
//!
//! This crate provides the data model shared by every stage of a run: tree
//! identities, relative paths, content digests, per-file observations, the
//! cross-tree index and the run configuration.

mod config;
mod error;
mod index;
mod node;
mod tree;

pub use config::{ExcludeRules, RunConfig, RunConfigBuilder, TreeSpec, DEFAULT_EXCLUDE_DIRS};
pub use error::{
    ConfigError, FingerprintError, IndexError, RunError, ScanError, ScanWarning, WarningKind,
};
pub use index::{CrossTreeIndex, FrozenIndex, Observed, PathEntry};
pub use node::{Digest, FileObservation, RelativePath, TreeId};
pub use tree::{Roster, RunOutcome, RunStatus, SharedTree, TreeReport, TreeStats, TreeStatus};

/// File name of the manifest the hoist operation writes at the shared root.
pub const HOIST_MANIFEST: &str = "HOIST_MANIFEST.json";
