//! Run progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use treehoist_core::TreeId;

/// Progress information for one tree during a run.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Tree being walked.
    pub tree: TreeId,
    /// Files fingerprinted so far in this tree.
    pub files_hashed: u64,
    /// Bytes fingerprinted so far in this tree.
    pub bytes_hashed: u64,
    /// Current file being processed.
    pub current_path: PathBuf,
    /// Number of warnings recorded for this tree.
    pub warnings: u64,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
    /// Whether this tree's walk has finished.
    pub finished: bool,
}

impl ScanProgress {
    /// Calculate hash rate in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Per-tree progress tracker that publishes snapshots to subscribers.
pub(crate) struct ProgressTracker {
    tx: broadcast::Sender<ScanProgress>,
    started: Instant,
    tree: TreeId,
    files_hashed: u64,
    bytes_hashed: u64,
    warnings: u64,
    current_path: PathBuf,
}

/// Publish a snapshot every this many files.
const PUBLISH_EVERY: u64 = 100;

impl ProgressTracker {
    pub fn new(tx: broadcast::Sender<ScanProgress>, started: Instant, tree: TreeId) -> Self {
        Self {
            tx,
            started,
            tree,
            files_hashed: 0,
            bytes_hashed: 0,
            warnings: 0,
            current_path: PathBuf::new(),
        }
    }

    pub fn record_file(&mut self, path: PathBuf, size: u64) {
        self.files_hashed += 1;
        self.bytes_hashed += size;
        self.current_path = path;
        if self.files_hashed % PUBLISH_EVERY == 0 {
            self.publish(false);
        }
    }

    pub fn record_warning(&mut self) {
        self.warnings += 1;
    }

    pub fn finish(&mut self) {
        self.publish(true);
    }

    fn publish(&self, finished: bool) {
        // No subscribers is not an error.
        let _ = self.tx.send(ScanProgress {
            tree: self.tree.clone(),
            files_hashed: self.files_hashed,
            bytes_hashed: self.bytes_hashed,
            current_path: self.current_path.clone(),
            warnings: self.warnings,
            elapsed: self.started.elapsed(),
            finished,
        });
    }
}
