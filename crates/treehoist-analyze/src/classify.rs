//! Cross-tree classification of indexed paths.
//!
//! A path's classification depends only on how many trees hold it and how
//! many distinct digests those trees hold:
//!
//! | present in | distinct digests | classification |
//! |---|---|---|
//! | 1 tree | any | `UNIQUE` |
//! | all N | 1 | `UNIVERSAL_IDENTICAL` |
//! | all N | ≥2 | `DIVERGENT_UNIVERSAL` |
//! | 2..N-1 | 1 | `PARTIAL_IDENTICAL` |
//! | 2..N-1 | ≥2 | `DIVERGENT_PARTIAL` |

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};

use treehoist_core::{Digest, FrozenIndex, PathEntry, RelativePath, Roster, TreeId};

/// How a path's content is distributed across the roster.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Present in every tree with one digest.
    UniversalIdentical,
    /// Present in a strict subset of at least two trees with one digest.
    PartialIdentical,
    /// Present in every tree with two or more digests.
    DivergentUniversal,
    /// Present in a strict subset of at least two trees with two or more digests.
    DivergentPartial,
    /// Present in exactly one tree.
    Unique,
}

impl Classification {
    /// Section heading for human-readable output.
    pub fn title(&self) -> &'static str {
        match self {
            Self::UniversalIdentical => "Identical in every tree",
            Self::PartialIdentical => "Identical in some trees",
            Self::DivergentUniversal => "In every tree, content differs",
            Self::DivergentPartial => "In some trees, content differs",
            Self::Unique => "Unique to one tree",
        }
    }
}

/// Classify one entry against a roster of `total_trees` trees.
///
/// Depends only on the tree count and the number of distinct digests, so it
/// is invariant under reordering the roster.
pub fn classify(entry: &PathEntry, total_trees: usize) -> Classification {
    let present = entry.tree_count();
    if present <= 1 {
        return Classification::Unique;
    }
    let single_digest = entry.distinct_digests().len() == 1;
    let universal = present >= total_trees;
    match (universal, single_digest) {
        (true, true) => Classification::UniversalIdentical,
        (true, false) => Classification::DivergentUniversal,
        (false, true) => Classification::PartialIdentical,
        (false, false) => Classification::DivergentPartial,
    }
}

/// Trees sharing one digest for a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestGroup {
    pub digest: Digest,
    pub size: u64,
    /// Member trees in roster order.
    pub trees: Vec<TreeId>,
}

/// A path with its classification and the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEntry {
    pub path: RelativePath,
    pub classification: Classification,
    /// Trees holding the path, in roster order.
    pub present_in: Vec<TreeId>,
    /// Roster trees not holding the path, in roster order.
    pub absent_from: Vec<TreeId>,
    /// Digest per present tree, in roster order.
    pub digests_by_tree: IndexMap<TreeId, Digest>,
    /// Size per present tree, in roster order.
    pub sizes_by_tree: IndexMap<TreeId, u64>,
    /// Digest groups, largest first; ties broken by roster order.
    pub digest_groups: Vec<DigestGroup>,
}

impl ClassifiedEntry {
    /// The largest digest group, if it is strictly larger than every other.
    pub fn majority(&self) -> Option<&DigestGroup> {
        match self.digest_groups.as_slice() {
            [] => None,
            [only] => Some(only),
            [first, second, ..] if first.trees.len() > second.trees.len() => Some(first),
            _ => None,
        }
    }

    /// Size of the largest digest group.
    pub fn majority_size(&self) -> usize {
        self.digest_groups.first().map_or(0, |g| g.trees.len())
    }
}

/// Classifies entries of a frozen index against a roster.
#[derive(Debug, Clone)]
pub struct Classifier<'a> {
    roster: &'a Roster,
}

impl<'a> Classifier<'a> {
    /// Create a classifier for a roster.
    pub fn new(roster: &'a Roster) -> Self {
        Self { roster }
    }

    /// Classify one entry and collect its presence sets and digest groups.
    pub fn classify_entry(&self, entry: &PathEntry) -> ClassifiedEntry {
        let classification = classify(entry, self.roster.len());
        let present_in = self.roster.ordered(entry.present_in());
        let absent_from = self.roster.complement(entry.present_in());

        let mut digests_by_tree = IndexMap::with_capacity(present_in.len());
        let mut sizes_by_tree = IndexMap::with_capacity(present_in.len());
        for tree in &present_in {
            if let Some(observed) = entry.get(tree) {
                digests_by_tree.insert(tree.clone(), observed.digest);
                sizes_by_tree.insert(tree.clone(), observed.size);
            }
        }

        ClassifiedEntry {
            path: entry.path().clone(),
            classification,
            digest_groups: self.digest_groups(entry),
            present_in,
            absent_from,
            digests_by_tree,
            sizes_by_tree,
        }
    }

    /// Classify every entry, in path order.
    pub fn classify_all(&self, index: &FrozenIndex) -> Vec<ClassifiedEntry> {
        let entries: Vec<&PathEntry> = index.all_entries().collect();
        entries
            .par_iter()
            .map(|entry| self.classify_entry(entry))
            .collect()
    }

    fn digest_groups(&self, entry: &PathEntry) -> Vec<DigestGroup> {
        let mut groups: Vec<DigestGroup> = entry
            .digest_groups()
            .into_iter()
            .map(|(digest, trees)| {
                let trees = self.roster.ordered(&trees);
                let size = trees
                    .first()
                    .and_then(|t| entry.get(t))
                    .map_or(0, |o| o.size);
                DigestGroup {
                    digest,
                    size,
                    trees,
                }
            })
            .collect();

        let first_position = |group: &DigestGroup| {
            group
                .trees
                .first()
                .and_then(|t| self.roster.position(t))
                .unwrap_or(usize::MAX)
        };
        groups.sort_by(|a, b| {
            b.trees
                .len()
                .cmp(&a.trees.len())
                .then_with(|| first_position(a).cmp(&first_position(b)))
        });
        groups
    }
}
