//! Orchestrates a full comparison run.
//!
//! Trees are walked and fingerprinted in parallel, one rayon task per tree,
//! with no shared mutable state. Each task returns its own observation list;
//! the engine then merges them into the cross-tree index on a single thread
//! and freezes it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use treehoist_core::{
    CrossTreeIndex, RelativePath, Roster, RunConfig, RunError, RunOutcome, RunStatus, ScanWarning,
    SharedTree, TreeId, TreeReport, TreeStatus, WarningKind,
};

use crate::collect::{collect_tree, TreeScan};
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::progress::{ProgressTracker, ScanProgress};
use crate::walker::TreeWalker;

/// Identifier used for the shared tree in warnings and progress.
pub const SHARED_TREE_ID: &str = "(shared)";

/// Runs the walk, fingerprint, merge and freeze phases.
pub struct Engine {
    config: RunConfig,
    roster: Roster,
    walker: TreeWalker,
    fingerprinter: Arc<dyn Fingerprint>,
    cancel: CancellationToken,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl Engine {
    /// Create an engine for a validated config.
    ///
    /// Configuration errors (no trees, duplicate identifiers, bad patterns)
    /// are returned here, before any file is touched.
    pub fn new(config: RunConfig) -> Result<Self, RunError> {
        config.validate()?;
        let roster = config.roster()?;
        let walker = TreeWalker::new(config.exclude_rules()?);
        let fingerprinter = Arc::new(Fingerprinter::with_chunk_size(config.chunk_size));
        let (progress_tx, _) = broadcast::channel(256);

        Ok(Self {
            config,
            roster,
            walker,
            fingerprinter,
            cancel: CancellationToken::new(),
            progress_tx,
        })
    }

    /// Replace the fingerprinter.
    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprint>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts the run when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to per-tree progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// The config this engine runs with.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The ordered tree roster.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Run the comparison.
    ///
    /// Per-file and per-tree problems are recorded as warnings. Only
    /// configuration and index-contract errors fail the run.
    pub fn run(&self) -> Result<RunOutcome, RunError> {
        let started = Instant::now();

        let mut jobs: Vec<(TreeId, PathBuf)> = self
            .roster
            .iter()
            .map(|(id, root)| (id.clone(), root.to_path_buf()))
            .collect();
        if let Some(shared) = &self.config.shared {
            jobs.push((TreeId::new(SHARED_TREE_ID), shared.clone()));
        }

        let scans = self.walk_all(&jobs, started)?;
        let (roster_scans, shared_scan) = if self.config.shared.is_some() {
            let mut scans = scans;
            let shared = scans.pop();
            (scans, shared)
        } else {
            (scans, None)
        };

        let shared_paths: BTreeSet<RelativePath> = shared_scan
            .as_ref()
            .map(|scan| scan.observations.iter().map(|o| o.path.clone()).collect())
            .unwrap_or_default();

        let (mut index, subtracted, mut warnings) = merge(&roster_scans, &shared_paths)?;
        let frozen = index.freeze()?;

        let trees: Vec<TreeReport> = roster_scans
            .iter()
            .map(|scan| TreeReport {
                id: scan.id.clone(),
                root: scan.root.clone(),
                status: scan.status,
                stats: scan.stats.clone(),
            })
            .collect();

        let shared = shared_scan.map(|scan| {
            warnings.extend(scan.warnings.iter().cloned());
            SharedTree {
                root: scan.root,
                status: scan.status,
                paths: shared_paths,
                subtracted,
            }
        });

        sort_warnings(&mut warnings, &self.roster);

        let interrupted = roster_scans
            .iter()
            .any(|scan| scan.status == TreeStatus::Interrupted);
        let status = if interrupted || self.cancel.is_cancelled() {
            RunStatus::Aborted
        } else {
            RunStatus::Complete
        };

        tracing::info!(
            paths = frozen.len(),
            trees = self.roster.len(),
            warnings = warnings.len(),
            status = ?status,
            "run finished"
        );

        Ok(RunOutcome {
            roster: self.roster.clone(),
            index: frozen,
            trees,
            shared,
            warnings,
            status,
            duration: started.elapsed(),
        })
    }

    /// Walk every job in parallel. Results come back in job order.
    fn walk_all(
        &self,
        jobs: &[(TreeId, PathBuf)],
        started: Instant,
    ) -> Result<Vec<TreeScan>, RunError> {
        let work = || {
            jobs.par_iter()
                .map(|(id, root)| {
                    let progress =
                        ProgressTracker::new(self.progress_tx.clone(), started, id.clone());
                    collect_tree(
                        id,
                        root,
                        &self.walker,
                        self.fingerprinter.as_ref(),
                        &self.cancel,
                        progress,
                    )
                })
                .collect::<Vec<TreeScan>>()
        };

        if self.config.threads == 0 {
            return Ok(work());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| RunError::ThreadPool(e.to_string()))?;
        Ok(pool.install(work))
    }
}

/// Merge per-tree observations into one index. Single writer.
///
/// Paths present in the shared tree are subtracted and returned separately.
fn merge(
    scans: &[TreeScan],
    shared_paths: &BTreeSet<RelativePath>,
) -> Result<(CrossTreeIndex, BTreeSet<RelativePath>, Vec<ScanWarning>), RunError> {
    let mut index = CrossTreeIndex::new();
    let mut subtracted = BTreeSet::new();
    let mut warnings = Vec::new();

    for scan in scans {
        warnings.extend(scan.warnings.iter().cloned());
        for observation in &scan.observations {
            if shared_paths.contains(&observation.path) {
                subtracted.insert(observation.path.clone());
                continue;
            }
            let path = observation.path.clone();
            if index.record(observation.clone())?.is_some() {
                tracing::warn!(tree = %scan.id, path = %path, "path observed twice; keeping the later observation");
                warnings.push(ScanWarning::new(
                    scan.id.clone(),
                    path.to_path(&scan.root),
                    "Path observed twice in one walk; later observation kept",
                    WarningKind::DuplicateObservation,
                ));
            }
        }
    }

    Ok((index, subtracted, warnings))
}

/// Order warnings by roster position (shared tree last), then path, then kind.
fn sort_warnings(warnings: &mut [ScanWarning], roster: &Roster) {
    let rank: BTreeMap<&TreeId, usize> = roster
        .ids()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();
    warnings.sort_by(|a, b| {
        let ra = rank.get(&a.tree).copied().unwrap_or(usize::MAX);
        let rb = rank.get(&b.tree).copied().unwrap_or(usize::MAX);
        ra.cmp(&rb)
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.kind.cmp(&b.kind))
    });
}
