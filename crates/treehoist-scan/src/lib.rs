//! Tree walking and fingerprinting engine for treehoist.
//!
//! # Overview
//!
//! `treehoist-scan` turns a roster of tree roots into a frozen cross-tree
//! index:
//!
//! - **Tree walking** via jwalk, with directory-name exclusions and sorted,
//!   deterministic output
//! - **Fingerprinting** with streaming BLAKE3 in fixed-size chunks
//! - **Parallel collection**, one rayon task per tree, merged by a single
//!   writer
//! - **Progress updates** via broadcast channels
//! - **Cancellation** via a `CancellationToken`; a cancelled run is reported
//!   as aborted, never as complete
//!
//! # Example
//!
//! ```rust,no_run
//! use treehoist_scan::{Engine, RunConfig, TreeSpec};
//!
//! let config = RunConfig::new(vec![
//!     TreeSpec::new("build4less", "themes/build4less"),
//!     TreeSpec::new("tiles4less", "themes/tiles4less"),
//! ]);
//! let outcome = Engine::new(config).unwrap().run().unwrap();
//!
//! println!("{} distinct paths", outcome.index.len());
//! ```

mod collect;
mod engine;
mod fingerprint;
mod progress;
mod walker;

pub use collect::TreeScan;
pub use engine::{Engine, SHARED_TREE_ID};
pub use fingerprint::{Fingerprint, Fingerprinter, DEFAULT_CHUNK_SIZE};
pub use progress::ScanProgress;
pub use walker::{TreeWalker, Walk, WalkEvent};

// Re-export core types for convenience
pub use treehoist_core::{
    Digest, FileObservation, FrozenIndex, RelativePath, RunConfig, RunError, RunOutcome,
    RunStatus, ScanError, ScanWarning, TreeId, TreeSpec, WarningKind,
};
