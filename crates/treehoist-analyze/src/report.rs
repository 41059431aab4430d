//! Structured comparison report.
//!
//! The report is a pure function of a [`RunOutcome`] and a [`ReportConfig`]:
//! it carries no timestamps or durations, so two runs over unchanged trees
//! serialize to identical bytes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use treehoist_core::{
    Digest, RelativePath, RunConfig, RunOutcome, RunStatus, ScanWarning, TreeId, TreeStatus,
    WarningKind,
};

use crate::classify::{Classification, ClassifiedEntry, Classifier, DigestGroup};
use crate::recommend::{recommend, Recommendation};

/// Configuration for report generation.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct ReportConfig {
    /// Fraction of the roster a hoist candidate must cover.
    #[builder(default = "0.8")]
    pub min_coverage: f64,

    /// Byte difference from the median that marks a size outlier.
    #[builder(default = "1000")]
    pub size_delta_threshold: u64,

    /// Paths always reported on, in the order given.
    #[builder(default)]
    pub watch_paths: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            min_coverage: 0.8,
            size_delta_threshold: 1000,
            watch_paths: Vec::new(),
        }
    }
}

impl ReportConfig {
    /// Create a new config builder.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Take the reporting knobs from a run config.
    pub fn from_run_config(config: &RunConfig) -> Self {
        Self {
            min_coverage: config.min_coverage,
            size_delta_threshold: config.size_delta_threshold,
            watch_paths: config.watch_paths.clone(),
        }
    }
}

/// One roster tree in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: TreeId,
    pub root: PathBuf,
    pub status: TreeStatus,
    /// Classified paths this tree holds.
    pub paths: usize,
    /// Bytes fingerprinted in this tree.
    pub bytes: u64,
    /// Paths only this tree holds.
    pub unique: usize,
    /// `unique / paths` as a percentage.
    pub unique_share: f64,
    pub unreadable_files: u64,
}

/// Roster-level counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub trees: usize,
    pub paths: usize,
    pub universal_identical: usize,
    pub partial_identical: usize,
    pub divergent_universal: usize,
    pub divergent_partial: usize,
    pub unique: usize,
    /// Paths dropped because the shared tree already holds them.
    pub already_shared: usize,
    /// Files that could not be read, shared tree included.
    pub files_skipped: u64,
    /// Directories below a root that could not be listed.
    pub directories_skipped: u64,
    pub trees_unreadable: usize,
    pub warnings: usize,
    /// Copies that go away if every hoistable entry is hoisted.
    pub duplicates_eliminated: u64,
    pub bytes_reclaimable: u64,
    pub min_coverage: f64,
}

impl Summary {
    /// Number of entries with a classification.
    pub fn count(&self, classification: Classification) -> usize {
        match classification {
            Classification::UniversalIdentical => self.universal_identical,
            Classification::PartialIdentical => self.partial_identical,
            Classification::DivergentUniversal => self.divergent_universal,
            Classification::DivergentPartial => self.divergent_partial,
            Classification::Unique => self.unique,
        }
    }

    fn increment(&mut self, classification: Classification) {
        let slot = match classification {
            Classification::UniversalIdentical => &mut self.universal_identical,
            Classification::PartialIdentical => &mut self.partial_identical,
            Classification::DivergentUniversal => &mut self.divergent_universal,
            Classification::DivergentPartial => &mut self.divergent_partial,
            Classification::Unique => &mut self.unique,
        };
        *slot += 1;
    }
}

/// Export record for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReport {
    pub classification: Classification,
    pub present_in: Vec<TreeId>,
    pub absent_from: Vec<TreeId>,
    pub digests_by_tree: IndexMap<TreeId, Digest>,
    pub sizes_by_tree: IndexMap<TreeId, u64>,
    pub digest_groups: Vec<DigestGroup>,
    pub majority_size: usize,
    pub recommendation: Recommendation,
}

impl EntryReport {
    fn new(entry: ClassifiedEntry, recommendation: Recommendation) -> Self {
        let majority_size = entry.majority_size();
        Self {
            classification: entry.classification,
            present_in: entry.present_in,
            absent_from: entry.absent_from,
            digests_by_tree: entry.digests_by_tree,
            sizes_by_tree: entry.sizes_by_tree,
            digest_groups: entry.digest_groups,
            majority_size,
            recommendation,
        }
    }

    /// Copies eliminated and bytes reclaimed if this entry is hoisted.
    pub fn impact(&self) -> (u64, u64) {
        let (copies, size) = match &self.recommendation {
            Recommendation::Hoist | Recommendation::HoistPartial { .. } => {
                let size = self.digest_groups.first().map_or(0, |g| g.size);
                (self.present_in.len(), size)
            }
            Recommendation::HoistWithOverrides { majority, .. } => {
                let size = self.digest_groups.first().map_or(0, |g| g.size);
                (majority.len(), size)
            }
            Recommendation::KeepPerTree | Recommendation::TreeSpecific { .. } => (0, 0),
        };
        let eliminated = copies.saturating_sub(1) as u64;
        (eliminated, eliminated * size)
    }
}

/// A tree whose copy of a path is far from the median size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeOutlier {
    pub tree: TreeId,
    pub size: u64,
    /// Signed difference from the median.
    pub delta: i64,
}

/// Size spread for a path present everywhere with differing content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeDelta {
    pub path: RelativePath,
    pub median: u64,
    pub outliers: Vec<SizeOutlier>,
}

/// Status of a watched path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntry {
    pub path: RelativePath,
    pub present_in: Vec<TreeId>,
    pub absent_from: Vec<TreeId>,
    pub sizes_by_tree: IndexMap<TreeId, u64>,
    /// Every present copy has the same digest.
    pub identical: bool,
    pub already_shared: bool,
}

/// The full comparison report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub status: RunStatus,
    pub roster: Vec<RosterEntry>,
    pub summary: Summary,
    /// Every classified path, in lexicographic order.
    pub entries: BTreeMap<RelativePath, EntryReport>,
    pub size_deltas: Vec<SizeDelta>,
    pub watch: Vec<WatchEntry>,
    /// Reasons the comparison may be incomplete.
    pub caveats: Vec<String>,
    pub warnings: Vec<ScanWarning>,
}

impl Report {
    /// Entries the copy-to-shared operation should place.
    pub fn hoist_candidates(&self) -> impl Iterator<Item = (&RelativePath, &EntryReport)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.recommendation.is_copyable())
    }

    /// Entries with one classification, in path order.
    pub fn entries_in(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = (&RelativePath, &EntryReport)> {
        self.entries
            .iter()
            .filter(move |(_, e)| e.classification == classification)
    }

    /// Whether the run skipped anything.
    pub fn is_degraded(&self) -> bool {
        self.status == RunStatus::Aborted
            || self.warnings.iter().any(|w| w.kind.is_degrading())
            || !self.caveats.is_empty()
    }

    /// Pretty-printed JSON export.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds reports from run outcomes.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    config: ReportConfig,
}

impl Reporter {
    /// Create a reporter with the given config.
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// The config this reporter uses.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Classify the frozen index and assemble the report.
    pub fn build(&self, outcome: &RunOutcome) -> Report {
        let total = outcome.roster.len();
        let classified = Classifier::new(&outcome.roster).classify_all(&outcome.index);

        let mut summary = Summary {
            trees: total,
            paths: classified.len(),
            already_shared: outcome.shared.as_ref().map_or(0, |s| s.subtracted.len()),
            files_skipped: count_kind(&outcome.warnings, WarningKind::FileUnreadable),
            directories_skipped: count_kind(&outcome.warnings, WarningKind::DirectoryUnreadable),
            trees_unreadable: outcome.unreadable_trees().count(),
            warnings: outcome.warnings.len(),
            min_coverage: self.config.min_coverage,
            ..Summary::default()
        };

        let mut paths_per_tree: BTreeMap<TreeId, usize> = BTreeMap::new();
        let mut unique_per_tree: BTreeMap<TreeId, usize> = BTreeMap::new();
        let mut size_deltas = Vec::new();
        let mut entries = BTreeMap::new();

        for entry in classified {
            summary.increment(entry.classification);
            for tree in &entry.present_in {
                *paths_per_tree.entry(tree.clone()).or_default() += 1;
            }
            if entry.classification == Classification::Unique {
                if let Some(tree) = entry.present_in.first() {
                    *unique_per_tree.entry(tree.clone()).or_default() += 1;
                }
            }
            if entry.classification == Classification::DivergentUniversal {
                if let Some(delta) = size_delta(&entry, self.config.size_delta_threshold) {
                    size_deltas.push(delta);
                }
            }

            let recommendation = recommend(&entry, total, self.config.min_coverage);
            let path = entry.path.clone();
            let report = EntryReport::new(entry, recommendation);
            let (eliminated, bytes) = report.impact();
            summary.duplicates_eliminated += eliminated;
            summary.bytes_reclaimable += bytes;
            entries.insert(path, report);
        }

        let roster = outcome
            .trees
            .iter()
            .map(|tree| {
                let paths = paths_per_tree.get(&tree.id).copied().unwrap_or(0);
                let unique = unique_per_tree.get(&tree.id).copied().unwrap_or(0);
                RosterEntry {
                    id: tree.id.clone(),
                    root: tree.root.clone(),
                    status: tree.status,
                    paths,
                    bytes: tree.stats.bytes,
                    unique,
                    unique_share: share(unique, paths),
                    unreadable_files: tree.stats.unreadable_files,
                }
            })
            .collect();

        let watch = self.watch_entries(outcome);
        let caveats = caveats(outcome);

        tracing::debug!(
            paths = summary.paths,
            duplicates = summary.duplicates_eliminated,
            caveats = caveats.len(),
            "report built"
        );

        Report {
            status: outcome.status,
            roster,
            summary,
            entries,
            size_deltas,
            watch,
            caveats,
            warnings: outcome.warnings.clone(),
        }
    }

    fn watch_entries(&self, outcome: &RunOutcome) -> Vec<WatchEntry> {
        self.config
            .watch_paths
            .iter()
            .map(|raw| {
                let path = RelativePath::new(raw);
                let already_shared = outcome
                    .shared
                    .as_ref()
                    .is_some_and(|s| s.paths.contains(&path));
                match outcome.index.get(&path) {
                    Some(entry) => {
                        let present_in = outcome.roster.ordered(entry.present_in());
                        let sizes_by_tree = present_in
                            .iter()
                            .filter_map(|t| entry.get(t).map(|o| (t.clone(), o.size)))
                            .collect();
                        WatchEntry {
                            absent_from: outcome.roster.complement(entry.present_in()),
                            identical: entry.distinct_digests().len() == 1,
                            path,
                            present_in,
                            sizes_by_tree,
                            already_shared,
                        }
                    }
                    None => WatchEntry {
                        path,
                        present_in: Vec::new(),
                        absent_from: outcome.roster.ids().cloned().collect(),
                        sizes_by_tree: IndexMap::new(),
                        identical: false,
                        already_shared,
                    },
                }
            })
            .collect()
    }
}

/// Median of a sorted, non-empty slice; the mean of the middle pair for even lengths.
fn median(sorted: &[u64]) -> u64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        sorted[mid - 1] / 2 + sorted[mid] / 2 + (sorted[mid - 1] % 2 + sorted[mid] % 2) / 2
    } else {
        sorted[mid]
    }
}

fn size_delta(entry: &ClassifiedEntry, threshold: u64) -> Option<SizeDelta> {
    let mut sizes: Vec<u64> = entry.sizes_by_tree.values().copied().collect();
    if sizes.is_empty() {
        return None;
    }
    sizes.sort_unstable();
    let median = median(&sizes);

    let outliers: Vec<SizeOutlier> = entry
        .sizes_by_tree
        .iter()
        .filter(|(_, size)| size.abs_diff(median) > threshold)
        .map(|(tree, size)| SizeOutlier {
            tree: tree.clone(),
            size: *size,
            delta: signed_delta(*size, median),
        })
        .collect();

    (!outliers.is_empty()).then(|| SizeDelta {
        path: entry.path.clone(),
        median,
        outliers,
    })
}

/// `size - median`, saturated to the `i64` range.
fn signed_delta(size: u64, median: u64) -> i64 {
    if size >= median {
        i64::try_from(size - median).unwrap_or(i64::MAX)
    } else {
        i64::try_from(median - size).map_or(i64::MIN, |d| -d)
    }
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

fn count_kind(warnings: &[ScanWarning], kind: WarningKind) -> u64 {
    warnings.iter().filter(|w| w.kind == kind).count() as u64
}

/// One line per reason the comparison may be incomplete.
///
/// Every degrading warning is covered: per-tree unreadable roots, files and
/// directories, and anything the shared tree failed to read.
fn caveats(outcome: &RunOutcome) -> Vec<String> {
    let mut caveats = Vec::new();
    if outcome.status == RunStatus::Aborted {
        caveats.push(
            "Run aborted: results cover only files read before cancellation".to_string(),
        );
    }

    for tree in &outcome.trees {
        if tree.status == TreeStatus::Unreadable {
            caveats.push(format!(
                "Tree '{}' could not be read; paths reported absent from it may exist there",
                tree.id
            ));
            continue;
        }
        let in_tree: Vec<&ScanWarning> =
            outcome.warnings.iter().filter(|w| w.tree == tree.id).collect();
        let files = in_tree
            .iter()
            .filter(|w| w.kind == WarningKind::FileUnreadable)
            .count();
        let dirs = in_tree
            .iter()
            .filter(|w| w.kind == WarningKind::DirectoryUnreadable)
            .count();
        if files > 0 {
            caveats.push(format!(
                "Tree '{}': {files} file(s) could not be read and are treated as absent",
                tree.id
            ));
        }
        if dirs > 0 {
            caveats.push(format!(
                "Tree '{}': {dirs} directory(ies) could not be listed; files below them are treated as absent",
                tree.id
            ));
        }
    }

    if let Some(shared) = &outcome.shared {
        let shared_failures = outcome
            .warnings
            .iter()
            .filter(|w| w.kind.is_degrading() && outcome.roster.position(&w.tree).is_none())
            .count();
        if shared.status != TreeStatus::Ok || shared_failures > 0 {
            caveats.push(format!(
                "Shared tree {} could not be fully read; already-shared paths may be reported as candidates",
                shared.root.display()
            ));
        }
    }
    caveats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use treehoist_core::{
        CrossTreeIndex, FileObservation, Roster, SharedTree, TreeReport, TreeSpec, TreeStats,
    };

    fn outcome(names: &[&str], files: &[(&str, &str, u8, u64)]) -> RunOutcome {
        let specs: Vec<_> = names
            .iter()
            .map(|n| TreeSpec::new(*n, format!("/t/{n}")))
            .collect();
        let roster = Roster::from_specs(&specs).unwrap();
        let mut index = CrossTreeIndex::new();
        let mut stats: BTreeMap<&str, TreeStats> = BTreeMap::new();
        for (tree, path, byte, size) in files {
            index
                .record(FileObservation::new(
                    TreeId::new(*tree),
                    RelativePath::new(*path),
                    Digest::new([*byte; 32]),
                    *size,
                ))
                .unwrap();
            stats.entry(*tree).or_default().record_file(*size);
        }
        RunOutcome {
            trees: names
                .iter()
                .map(|n| TreeReport {
                    id: TreeId::new(*n),
                    root: PathBuf::from(format!("/t/{n}")),
                    status: TreeStatus::Ok,
                    stats: stats.get(n).cloned().unwrap_or_default(),
                })
                .collect(),
            roster,
            index: index.freeze().unwrap(),
            shared: None,
            warnings: Vec::new(),
            status: RunStatus::Complete,
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[5]), 5);
        assert_eq!(median(&[1, 3, 9]), 3);
        assert_eq!(median(&[2, 4]), 3);
        assert_eq!(median(&[3, 4]), 3);
        assert_eq!(median(&[u64::MAX, u64::MAX]), u64::MAX);
    }

    #[test]
    fn test_summary_and_uniqueness() {
        let outcome = outcome(
            &["a", "b", "c"],
            &[
                ("a", "assets/same.css", 1, 100),
                ("b", "assets/same.css", 1, 100),
                ("c", "assets/same.css", 1, 100),
                ("a", "assets/only-a.js", 2, 10),
                ("a", "layout/theme.liquid", 3, 50),
                ("b", "layout/theme.liquid", 3, 50),
            ],
        );
        let report = Reporter::default().build(&outcome);

        assert_eq!(report.summary.paths, 3);
        assert_eq!(report.summary.universal_identical, 1);
        assert_eq!(report.summary.partial_identical, 1);
        assert_eq!(report.summary.unique, 1);
        // 2 copies of same.css go away; 2/3 coverage keeps theme.liquid per tree.
        assert_eq!(report.summary.duplicates_eliminated, 2);
        assert_eq!(report.summary.bytes_reclaimable, 200);

        let a = &report.roster[0];
        assert_eq!(a.paths, 3);
        assert_eq!(a.unique, 1);
        assert_eq!(a.unique_share, 33.33);
        assert_eq!(report.roster[2].unique_share, 0.0);
        assert!(!report.is_degraded());
    }

    #[test]
    fn test_size_outliers_on_divergent_universal() {
        let outcome = outcome(
            &["a", "b", "c"],
            &[
                ("a", "sections/header.liquid", 1, 4000),
                ("b", "sections/header.liquid", 2, 4010),
                ("c", "sections/header.liquid", 3, 9000),
            ],
        );
        let report = Reporter::default().build(&outcome);

        assert_eq!(report.size_deltas.len(), 1);
        let delta = &report.size_deltas[0];
        assert_eq!(delta.median, 4010);
        assert_eq!(delta.outliers.len(), 1);
        assert_eq!(delta.outliers[0].tree, TreeId::new("c"));
        assert_eq!(delta.outliers[0].delta, 4990);
    }

    #[test]
    fn test_watch_list() {
        let mut outcome = outcome(
            &["a", "b"],
            &[
                ("a", "layout/theme.liquid", 1, 10),
                ("b", "layout/theme.liquid", 2, 12),
            ],
        );
        outcome.shared = Some(SharedTree {
            root: PathBuf::from("/t/shared"),
            status: TreeStatus::Ok,
            paths: [RelativePath::new("config/settings_schema.json")].into(),
            subtracted: [RelativePath::new("config/settings_schema.json")].into(),
        });
        let config = ReportConfig::builder()
            .watch_paths(vec![
                "layout/theme.liquid".to_string(),
                "config/settings_schema.json".to_string(),
            ])
            .build()
            .unwrap();
        let report = Reporter::new(config).build(&outcome);

        assert_eq!(report.watch.len(), 2);
        assert!(!report.watch[0].identical);
        assert_eq!(report.watch[0].sizes_by_tree[&TreeId::new("b")], 12);
        assert!(report.watch[1].already_shared);
        assert!(report.watch[1].present_in.is_empty());
        assert_eq!(report.summary.already_shared, 1);
    }

    fn warning(tree: &str, path: &str, kind: WarningKind) -> ScanWarning {
        ScanWarning::new(TreeId::new(tree), format!("/t/{tree}/{path}"), "denied", kind)
    }

    #[test]
    fn test_caveats_for_degraded_run() {
        let mut outcome = outcome(&["a", "b"], &[("a", "x", 1, 1)]);
        outcome.trees[1].status = TreeStatus::Unreadable;
        outcome.trees[0].stats.unreadable_files = 2;
        outcome.warnings = vec![
            warning("a", "locked.css", WarningKind::FileUnreadable),
            warning("a", "locked.js", WarningKind::FileUnreadable),
            warning("b", "", WarningKind::TreeUnreadable),
        ];
        outcome.status = RunStatus::Aborted;

        let report = Reporter::default().build(&outcome);
        assert_eq!(report.caveats.len(), 3);
        assert!(report.caveats[0].starts_with("Run aborted"));
        assert_eq!(
            report.caveats[1],
            "Tree 'a': 2 file(s) could not be read and are treated as absent"
        );
        assert!(report.caveats[2].contains("'b'"));
        assert_eq!(report.summary.trees_unreadable, 1);
        assert_eq!(report.summary.files_skipped, 2);
        assert!(report.is_degraded());
    }

    #[test]
    fn test_unlistable_directory_is_a_caveat() {
        let mut outcome = outcome(&["a", "b"], &[("a", "x", 1, 1), ("b", "x", 1, 1)]);
        outcome.warnings = vec![warning("b", "snippets", WarningKind::DirectoryUnreadable)];
        assert!(outcome.is_degraded());

        let report = Reporter::default().build(&outcome);
        assert!(report.is_degraded());
        assert_eq!(report.is_degraded(), outcome.is_degraded());
        assert_eq!(report.summary.directories_skipped, 1);
        assert_eq!(report.caveats.len(), 1);
        assert!(report.caveats[0].starts_with("Tree 'b': 1 directory(ies) could not be listed"));
    }

    #[test]
    fn test_shared_tree_read_failure_is_a_caveat() {
        let mut outcome = outcome(&["a", "b"], &[("a", "x", 1, 1), ("b", "x", 1, 1)]);
        outcome.shared = Some(SharedTree {
            root: PathBuf::from("/t/shared"),
            status: TreeStatus::Ok,
            paths: Default::default(),
            subtracted: Default::default(),
        });
        outcome.warnings = vec![warning("(shared)", "assets/x.css", WarningKind::FileUnreadable)];

        let report = Reporter::default().build(&outcome);
        assert_eq!(report.summary.files_skipped, 1);
        assert_eq!(report.caveats.len(), 1);
        assert!(report.caveats[0].starts_with("Shared tree /t/shared"));
        assert!(report.is_degraded());
    }

    #[test]
    fn test_symlink_warnings_do_not_degrade() {
        let mut outcome = outcome(&["a"], &[("a", "x", 1, 1)]);
        outcome.warnings = vec![warning("a", "loop", WarningKind::SymlinkSkipped)];

        let report = Reporter::default().build(&outcome);
        assert!(report.caveats.is_empty());
        assert!(!report.is_degraded());
    }

    #[test]
    fn test_signed_delta_saturates() {
        assert_eq!(signed_delta(9000, 4010), 4990);
        assert_eq!(signed_delta(10, 4010), -4000);
        assert_eq!(signed_delta(u64::MAX, 0), i64::MAX);
        assert_eq!(signed_delta(0, u64::MAX), i64::MIN);
        assert_eq!(signed_delta(i64::MAX as u64 + 1, 1), i64::MAX);
    }

    #[test]
    fn test_export_shape() {
        let outcome = outcome(&["a", "b"], &[("a", "x", 1, 3), ("b", "x", 1, 3)]);
        let report = Reporter::default().build(&outcome);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["status"], "complete");
        let x = &json["entries"]["x"];
        assert_eq!(x["classification"], "UNIVERSAL_IDENTICAL");
        assert_eq!(x["presentIn"], serde_json::json!(["a", "b"]));
        assert_eq!(x["sizesByTree"]["a"], 3);
        assert_eq!(x["digestsByTree"]["b"], Digest::new([1; 32]).to_hex());
        assert_eq!(x["recommendation"]["action"], "hoist");
        assert_eq!(json["summary"]["universalIdentical"], 1);
    }

    #[test]
    fn test_hoist_candidates() {
        let outcome = outcome(
            &["a", "b"],
            &[("a", "x", 1, 3), ("b", "x", 1, 3), ("a", "y", 2, 3)],
        );
        let report = Reporter::default().build(&outcome);
        let paths: Vec<_> = report.hoist_candidates().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["x"]);
    }
}
