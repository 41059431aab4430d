//! Cross-tree index: relative path to per-tree observations.
//!
//! The index has two phases. While trees are being walked it only accepts
//! writes through [`CrossTreeIndex::record`]. [`CrossTreeIndex::freeze`] ends
//! the build phase and hands out a read-only [`FrozenIndex`]; any later write
//! fails with [`IndexError::Frozen`].

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::node::{Digest, FileObservation, RelativePath, TreeId};

/// Digest and size of a path in one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observed {
    pub digest: Digest,
    pub size: u64,
}

/// Everything known about one relative path across all trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    path: RelativePath,
    trees: BTreeMap<TreeId, Observed>,
}

impl PathEntry {
    /// Create an entry with no observations.
    pub fn new(path: RelativePath) -> Self {
        Self {
            path,
            trees: BTreeMap::new(),
        }
    }

    /// Build an entry from `(tree, digest, size)` triples.
    pub fn from_observations(
        path: RelativePath,
        observations: impl IntoIterator<Item = (TreeId, Digest, u64)>,
    ) -> Self {
        let mut entry = Self::new(path);
        for (tree, digest, size) in observations {
            entry.insert(tree, Observed { digest, size });
        }
        entry
    }

    /// Insert an observation. A tree appears at most once: a second
    /// observation replaces the first and the replaced one is returned.
    fn insert(&mut self, tree: TreeId, observed: Observed) -> Option<Observed> {
        self.trees.insert(tree, observed)
    }

    /// The relative path.
    pub fn path(&self) -> &RelativePath {
        &self.path
    }

    /// Number of trees the path was observed in.
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Per-tree observations, ordered by tree identifier.
    pub fn observations(&self) -> impl Iterator<Item = (&TreeId, &Observed)> {
        self.trees.iter()
    }

    /// Observation for one tree.
    pub fn get(&self, tree: &TreeId) -> Option<&Observed> {
        self.trees.get(tree)
    }

    /// Trees the path was observed in.
    pub fn present_in(&self) -> impl Iterator<Item = &TreeId> {
        self.trees.keys()
    }

    /// Distinct digests observed.
    pub fn distinct_digests(&self) -> BTreeSet<Digest> {
        self.trees.values().map(|o| o.digest).collect()
    }

    /// Trees grouped by the digest they hold.
    pub fn digest_groups(&self) -> BTreeMap<Digest, Vec<TreeId>> {
        let mut groups: BTreeMap<Digest, Vec<TreeId>> = BTreeMap::new();
        for (tree, observed) in &self.trees {
            groups.entry(observed.digest).or_default().push(tree.clone());
        }
        groups
    }
}

/// Mutable index built while trees are walked.
#[derive(Debug, Default)]
pub struct CrossTreeIndex {
    entries: BTreeMap<RelativePath, PathEntry>,
    frozen: bool,
    recorded: u64,
    replaced: u64,
}

impl CrossTreeIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the tree's observation for `observation.path`.
    ///
    /// Returns the observation that was replaced, if the tree had already
    /// recorded this path.
    pub fn record(&mut self, observation: FileObservation) -> Result<Option<Observed>, IndexError> {
        if self.frozen {
            return Err(IndexError::Frozen {
                path: observation.path.to_string(),
            });
        }
        let FileObservation {
            tree,
            path,
            digest,
            size,
        } = observation;

        let replaced = match self.entries.entry(path) {
            btree_map::Entry::Occupied(mut slot) => {
                slot.get_mut().insert(tree, Observed { digest, size })
            }
            btree_map::Entry::Vacant(slot) => {
                let mut entry = PathEntry::new(slot.key().clone());
                entry.insert(tree, Observed { digest, size });
                slot.insert(entry);
                None
            }
        };

        self.recorded += 1;
        if replaced.is_some() {
            self.replaced += 1;
        }
        Ok(replaced)
    }

    /// Number of observations recorded, including overwrites.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Number of observations that overwrote an earlier one.
    pub fn replaced(&self) -> u64 {
        self.replaced
    }

    /// Whether the build phase has ended.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// End the build phase and return the read-only view.
    pub fn freeze(&mut self) -> Result<FrozenIndex, IndexError> {
        if self.frozen {
            return Err(IndexError::AlreadyFrozen);
        }
        self.frozen = true;
        let entries = std::mem::take(&mut self.entries);
        tracing::debug!(paths = entries.len(), recorded = self.recorded, "index frozen");
        Ok(FrozenIndex {
            entries: Arc::new(entries),
        })
    }
}

/// Read-only view of a finished index. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct FrozenIndex {
    entries: Arc<BTreeMap<RelativePath, PathEntry>>,
}

impl FrozenIndex {
    /// Every entry, in lexicographic path order.
    pub fn all_entries(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.values()
    }

    /// Look up one path.
    pub fn get(&self, path: &RelativePath) -> Option<&PathEntry> {
        self.entries.get(path)
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no path was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(tree: &str, path: &str, byte: u8, size: u64) -> FileObservation {
        FileObservation::new(
            TreeId::new(tree),
            RelativePath::new(path),
            Digest::new([byte; 32]),
            size,
        )
    }

    #[test]
    fn test_record_aggregates_by_path() {
        let mut index = CrossTreeIndex::new();
        index.record(obs("a", "assets/base.css", 1, 10)).unwrap();
        index.record(obs("b", "assets/base.css", 1, 10)).unwrap();
        index.record(obs("a", "layout/theme.liquid", 2, 20)).unwrap();

        let frozen = index.freeze().unwrap();
        assert_eq!(frozen.len(), 2);
        let entry = frozen.get(&RelativePath::new("assets/base.css")).unwrap();
        assert_eq!(entry.tree_count(), 2);
        assert_eq!(entry.distinct_digests().len(), 1);
    }

    #[test]
    fn test_second_observation_overwrites() {
        let mut index = CrossTreeIndex::new();
        assert_eq!(index.record(obs("a", "x", 1, 10)).unwrap(), None);
        let replaced = index.record(obs("a", "x", 2, 30)).unwrap();
        assert_eq!(
            replaced,
            Some(Observed {
                digest: Digest::new([1; 32]),
                size: 10
            })
        );
        assert_eq!(index.replaced(), 1);

        let frozen = index.freeze().unwrap();
        let entry = frozen.get(&RelativePath::new("x")).unwrap();
        assert_eq!(entry.tree_count(), 1);
        assert_eq!(entry.get(&TreeId::new("a")).unwrap().size, 30);
    }

    #[test]
    fn test_record_after_freeze_fails() {
        let mut index = CrossTreeIndex::new();
        index.record(obs("a", "x", 1, 1)).unwrap();
        let _frozen = index.freeze().unwrap();

        assert!(index.is_frozen());
        assert_eq!(
            index.record(obs("b", "x", 1, 1)),
            Err(IndexError::Frozen {
                path: "x".to_string()
            })
        );
        assert_eq!(index.freeze().unwrap_err(), IndexError::AlreadyFrozen);
    }

    #[test]
    fn test_all_entries_lexicographic() {
        let mut index = CrossTreeIndex::new();
        for path in ["snippets/z.liquid", "assets/b.js", "assets/a.js", "config.yml"] {
            index.record(obs("a", path, 1, 1)).unwrap();
        }
        let frozen = index.freeze().unwrap();
        let paths: Vec<_> = frozen.all_entries().map(|e| e.path().as_str()).collect();
        assert_eq!(
            paths,
            vec!["assets/a.js", "assets/b.js", "config.yml", "snippets/z.liquid"]
        );
    }

    #[test]
    fn test_digest_groups() {
        let entry = PathEntry::from_observations(
            RelativePath::new("x"),
            [
                (TreeId::new("a"), Digest::new([1; 32]), 5),
                (TreeId::new("b"), Digest::new([1; 32]), 5),
                (TreeId::new("c"), Digest::new([2; 32]), 7),
            ],
        );
        let groups = entry.digest_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[&Digest::new([1; 32])],
            vec![TreeId::new("a"), TreeId::new("b")]
        );
    }
}
