//! Tree roster and per-tree statistics.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::TreeSpec;
use crate::error::{ConfigError, ScanWarning};
use crate::index::FrozenIndex;
use crate::node::{RelativePath, TreeId};

/// The ordered set of trees taking part in a run.
///
/// Roster order is the order trees were supplied in; every tree list in a
/// report follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    trees: IndexMap<TreeId, PathBuf>,
}

impl Roster {
    /// Build a roster, rejecting empty names and duplicate identifiers.
    pub fn from_specs(specs: &[TreeSpec]) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::NoTrees);
        }
        let mut trees = IndexMap::with_capacity(specs.len());
        for spec in specs {
            if spec.id.as_str().is_empty() {
                return Err(ConfigError::EmptyTreeName(spec.root.display().to_string()));
            }
            if trees.insert(spec.id.clone(), spec.root.clone()).is_some() {
                return Err(ConfigError::DuplicateTreeId(spec.id.to_string()));
            }
        }
        Ok(Self { trees })
    }

    /// Number of trees, N.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether the roster is empty (never true for a validated roster).
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Tree identifiers in roster order.
    pub fn ids(&self) -> impl Iterator<Item = &TreeId> {
        self.trees.keys()
    }

    /// Trees and their roots in roster order.
    pub fn iter(&self) -> impl Iterator<Item = (&TreeId, &Path)> {
        self.trees.iter().map(|(id, root)| (id, root.as_path()))
    }

    /// Root directory of a tree.
    pub fn root(&self, id: &TreeId) -> Option<&Path> {
        self.trees.get(id).map(PathBuf::as_path)
    }

    /// Position of a tree in the roster.
    pub fn position(&self, id: &TreeId) -> Option<usize> {
        self.trees.get_index_of(id)
    }

    /// Check if a tree is on the roster.
    pub fn contains(&self, id: &TreeId) -> bool {
        self.trees.contains_key(id)
    }

    /// The members of `set`, in roster order.
    pub fn ordered<'a>(&self, set: impl IntoIterator<Item = &'a TreeId>) -> Vec<TreeId> {
        let members: BTreeSet<&TreeId> = set.into_iter().collect();
        self.ids().filter(|id| members.contains(id)).cloned().collect()
    }

    /// Roster trees not in `set`, in roster order.
    pub fn complement<'a>(&self, set: impl IntoIterator<Item = &'a TreeId>) -> Vec<TreeId> {
        let members: BTreeSet<&TreeId> = set.into_iter().collect();
        self.ids().filter(|id| !members.contains(id)).cloned().collect()
    }
}

/// Outcome of walking one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeStatus {
    /// Walk completed.
    Ok,
    /// Root missing or unreadable; contributed nothing.
    Unreadable,
    /// Walk stopped early by cancellation.
    Interrupted,
}

/// Summary statistics for one walked tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Files fingerprinted successfully.
    pub files: u64,
    /// Total bytes of those files.
    pub bytes: u64,
    /// Directories entered.
    pub dirs: u64,
    /// Files skipped because they could not be read.
    pub unreadable_files: u64,
    /// Directories and files skipped by exclusion rules.
    pub excluded: u64,
    /// Symbolic links skipped.
    pub symlinks_skipped: u64,
}

impl TreeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fingerprinted file.
    pub fn record_file(&mut self, size: u64) {
        self.files += 1;
        self.bytes += size;
    }

    /// Record a directory entered.
    pub fn record_dir(&mut self) {
        self.dirs += 1;
    }
}

/// Whether a run compared everything it was asked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every tree was walked to the end.
    Complete,
    /// Cancelled; the index holds only what was read before the signal.
    Aborted,
}

/// Walk result for one roster tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeReport {
    pub id: TreeId,
    pub root: PathBuf,
    pub status: TreeStatus,
    pub stats: TreeStats,
}

/// The already-shared tree and the paths it holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedTree {
    pub root: PathBuf,
    pub status: TreeStatus,
    /// Every path present in the shared tree.
    pub paths: BTreeSet<RelativePath>,
    /// Roster paths dropped from classification because they are shared.
    pub subtracted: BTreeSet<RelativePath>,
}

/// Everything a finished (or aborted) run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Ordered roster; N is `roster.len()`.
    pub roster: Roster,
    /// The frozen cross-tree index.
    pub index: FrozenIndex,
    /// Per-tree walk results, in roster order.
    pub trees: Vec<TreeReport>,
    /// Shared tree, when one was configured.
    pub shared: Option<SharedTree>,
    /// Warnings sorted by roster position, then path.
    pub warnings: Vec<ScanWarning>,
    /// Complete or aborted.
    pub status: RunStatus,
    /// Wall time of the run.
    pub duration: Duration,
}

impl RunOutcome {
    /// Trees whose root could not be read.
    pub fn unreadable_trees(&self) -> impl Iterator<Item = &TreeReport> {
        self.trees
            .iter()
            .filter(|t| t.status == TreeStatus::Unreadable)
    }

    /// Whether anything was missing from the comparison.
    pub fn is_degraded(&self) -> bool {
        self.status == RunStatus::Aborted || self.warnings.iter().any(|w| w.kind.is_degrading())
    }
}
