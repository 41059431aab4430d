//! Hoisting recommendations.
//!
//! Applied after classification, parameterized by a minimum coverage fraction.

use serde::{Deserialize, Serialize};

use treehoist_core::TreeId;

use crate::classify::{Classification, ClassifiedEntry};

/// What to do with a path when consolidating trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Recommendation {
    /// Identical everywhere: move to the shared tree.
    Hoist,
    /// Identical wherever present and present in enough trees.
    #[serde(rename_all = "camelCase")]
    HoistPartial { absent_from: Vec<TreeId> },
    /// Hoist the majority content; the listed trees keep their own copy.
    #[serde(rename_all = "camelCase")]
    HoistWithOverrides {
        majority: Vec<TreeId>,
        overrides: Vec<TreeId>,
    },
    /// Not a hoisting candidate.
    KeepPerTree,
    /// Only one tree has it.
    TreeSpecific { tree: TreeId },
}

impl Recommendation {
    /// Whether the copy-to-shared operation should place this path.
    pub fn is_copyable(&self) -> bool {
        matches!(self, Self::Hoist | Self::HoistPartial { .. })
    }

    /// Whether any hoisting applies.
    pub fn is_hoistable(&self) -> bool {
        matches!(
            self,
            Self::Hoist | Self::HoistPartial { .. } | Self::HoistWithOverrides { .. }
        )
    }

    /// Short label for text output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hoist => "hoist",
            Self::HoistPartial { .. } => "hoist (partial)",
            Self::HoistWithOverrides { .. } => "hoist with overrides",
            Self::KeepPerTree => "keep per tree",
            Self::TreeSpecific { .. } => "tree specific",
        }
    }
}

/// Whether `count` of `total` trees meets the coverage fraction.
pub fn meets_coverage(count: usize, total: usize, min_coverage: f64) -> bool {
    if total == 0 {
        return false;
    }
    // Small epsilon so 4/5 meets 0.8 despite float rounding.
    count as f64 / total as f64 + 1e-9 >= min_coverage
}

/// Recommend an action for a classified entry in a roster of `total` trees.
pub fn recommend(entry: &ClassifiedEntry, total: usize, min_coverage: f64) -> Recommendation {
    match entry.classification {
        Classification::UniversalIdentical => Recommendation::Hoist,
        Classification::PartialIdentical => {
            if meets_coverage(entry.present_in.len(), total, min_coverage) {
                Recommendation::HoistPartial {
                    absent_from: entry.absent_from.clone(),
                }
            } else {
                Recommendation::KeepPerTree
            }
        }
        Classification::DivergentUniversal | Classification::DivergentPartial => {
            match entry.majority() {
                Some(group) if meets_coverage(group.trees.len(), total, min_coverage) => {
                    let overrides = entry
                        .present_in
                        .iter()
                        .filter(|t| !group.trees.contains(t))
                        .cloned()
                        .collect();
                    Recommendation::HoistWithOverrides {
                        majority: group.trees.clone(),
                        overrides,
                    }
                }
                _ => Recommendation::KeepPerTree,
            }
        }
        Classification::Unique => match entry.present_in.first() {
            Some(tree) => Recommendation::TreeSpecific { tree: tree.clone() },
            None => Recommendation::KeepPerTree,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use treehoist_core::{Digest, PathEntry, RelativePath, Roster, TreeSpec};

    fn roster(n: usize) -> Roster {
        let specs: Vec<_> = (1..=n)
            .map(|i| TreeSpec::new(format!("s{i}"), format!("/t/s{i}")))
            .collect();
        Roster::from_specs(&specs).unwrap()
    }

    fn classified(roster: &Roster, trees: &[(usize, u8)]) -> ClassifiedEntry {
        let entry = PathEntry::from_observations(
            RelativePath::new("snippets/x.liquid"),
            trees
                .iter()
                .map(|(i, b)| (TreeId::new(format!("s{i}")), Digest::new([*b; 32]), 10)),
        );
        Classifier::new(roster).classify_entry(&entry)
    }

    #[test]
    fn test_meets_coverage() {
        assert!(meets_coverage(5, 6, 0.8));
        assert!(meets_coverage(4, 5, 0.8));
        assert!(!meets_coverage(4, 6, 0.8));
        assert!(!meets_coverage(1, 0, 0.5));
    }

    #[test]
    fn test_universal_identical_hoists() {
        let roster = roster(3);
        let e = classified(&roster, &[(1, 1), (2, 1), (3, 1)]);
        assert_eq!(recommend(&e, 3, 0.8), Recommendation::Hoist);
    }

    #[test]
    fn test_partial_above_and_below_coverage() {
        let roster = roster(6);
        let five = classified(&roster, &[(1, 1), (2, 1), (3, 1), (4, 1), (5, 1)]);
        assert_eq!(
            recommend(&five, 6, 0.8),
            Recommendation::HoistPartial {
                absent_from: vec![TreeId::new("s6")]
            }
        );

        let two = classified(&roster, &[(1, 1), (2, 1)]);
        assert_eq!(recommend(&two, 6, 0.8), Recommendation::KeepPerTree);
    }

    #[test]
    fn test_five_of_six_hoists_with_override() {
        let roster = roster(6);
        let z = classified(&roster, &[(1, 1), (2, 1), (3, 1), (4, 9), (5, 1), (6, 1)]);
        let rec = recommend(&z, 6, 0.8);
        assert_eq!(
            rec,
            Recommendation::HoistWithOverrides {
                majority: ["s1", "s2", "s3", "s5", "s6"].map(TreeId::new).to_vec(),
                overrides: vec![TreeId::new("s4")],
            }
        );
        assert!(rec.is_hoistable());
        assert!(!rec.is_copyable());
    }

    #[test]
    fn test_tied_divergence_is_kept() {
        let roster = roster(4);
        let e = classified(&roster, &[(1, 1), (2, 1), (3, 2), (4, 2)]);
        assert_eq!(recommend(&e, 4, 0.5), Recommendation::KeepPerTree);
    }

    #[test]
    fn test_unique_is_tree_specific() {
        let roster = roster(3);
        let e = classified(&roster, &[(2, 7)]);
        assert_eq!(
            recommend(&e, 3, 0.8),
            Recommendation::TreeSpecific {
                tree: TreeId::new("s2")
            }
        );
    }

    #[test]
    fn test_serialized_shape() {
        let rec = Recommendation::HoistPartial {
            absent_from: vec![TreeId::new("b")],
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["action"], "hoistPartial");
        assert_eq!(json["absentFrom"][0], "b");
    }
}
