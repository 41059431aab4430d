//! Human-readable rendering of a [`Report`].

use std::fmt::Write;

use humansize::{format_size, BINARY};
use itertools::Itertools;
use strum::IntoEnumIterator;

use treehoist_core::{RelativePath, RunStatus};

use crate::classify::Classification;
use crate::recommend::Recommendation;
use crate::report::{EntryReport, Report};

/// Group name for paths at the tree root.
pub const ROOT_GROUP: &str = "(root)";

/// Options for text rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Maximum paths listed per section (0 = unlimited).
    pub limit: usize,
}

/// Top-level directory a path is grouped under.
pub fn group_name(path: &RelativePath) -> &str {
    path.top_level().unwrap_or(ROOT_GROUP)
}

/// Render a report as plain text.
pub fn render_text(report: &Report, options: RenderOptions) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, report, options);
    out
}

fn rule(out: &mut String) -> std::fmt::Result {
    writeln!(out, "{}", "─".repeat(70))
}

fn write_report(out: &mut String, report: &Report, options: RenderOptions) -> std::fmt::Result {
    let summary = &report.summary;

    rule(out)?;
    writeln!(out, " Cross-Tree Comparison ({} trees, {} paths)", summary.trees, summary.paths)?;
    if report.status == RunStatus::Aborted {
        writeln!(out, " RUN ABORTED: results are partial")?;
    }
    rule(out)?;
    writeln!(out)?;

    for classification in Classification::iter() {
        writeln!(
            out,
            "   {:<22} {:>8}",
            classification.as_ref(),
            summary.count(classification)
        )?;
    }
    if summary.already_shared > 0 {
        writeln!(out, "   {:<22} {:>8}", "ALREADY_SHARED", summary.already_shared)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        " Hoisting at {:.0}% coverage eliminates {} copies ({})",
        summary.min_coverage * 100.0,
        summary.duplicates_eliminated,
        format_size(summary.bytes_reclaimable, BINARY)
    )?;
    writeln!(out)?;

    writeln!(out, " Trees:")?;
    for tree in &report.roster {
        writeln!(
            out,
            "   {:<16} {:>7} paths {:>10} {:>6} unique ({:.1}%)",
            tree.id.as_str(),
            tree.paths,
            format_size(tree.bytes, BINARY),
            tree.unique,
            tree.unique_share
        )?;
    }
    writeln!(out)?;

    for classification in Classification::iter() {
        write_section(out, report, classification, options)?;
    }

    if !report.size_deltas.is_empty() {
        rule(out)?;
        writeln!(out, " Size outliers (differing content, far from median size)")?;
        rule(out)?;
        for delta in &report.size_deltas {
            let outliers = delta
                .outliers
                .iter()
                .map(|o| format!("{} {:+}", o.tree, o.delta))
                .join(", ");
            writeln!(
                out,
                "   {} (median {}): {}",
                delta.path,
                format_size(delta.median, BINARY),
                outliers
            )?;
        }
        writeln!(out)?;
    }

    if !report.watch.is_empty() {
        rule(out)?;
        writeln!(out, " Watched paths")?;
        rule(out)?;
        for watch in &report.watch {
            let state = if watch.already_shared {
                "already shared".to_string()
            } else if watch.present_in.is_empty() {
                "missing everywhere".to_string()
            } else if watch.identical {
                format!("identical in {}", watch.present_in.len())
            } else {
                "differs".to_string()
            };
            writeln!(out, "   {} [{}]", watch.path, state)?;
            if !watch.sizes_by_tree.is_empty() {
                let sizes = watch
                    .sizes_by_tree
                    .iter()
                    .map(|(tree, size)| format!("{tree}={size}"))
                    .join(" ");
                writeln!(out, "     {sizes}")?;
            }
            if !watch.absent_from.is_empty() && !watch.present_in.is_empty() {
                writeln!(out, "     missing from: {}", watch.absent_from.iter().join(", "))?;
            }
        }
        writeln!(out)?;
    }

    write_skipped(out, report)
}

fn write_section(
    out: &mut String,
    report: &Report,
    classification: Classification,
    options: RenderOptions,
) -> std::fmt::Result {
    let count = report.summary.count(classification);
    if count == 0 {
        return Ok(());
    }

    rule(out)?;
    writeln!(out, " {} - {} ({})", classification, classification.title(), count)?;
    rule(out)?;

    let limit = if options.limit == 0 { usize::MAX } else { options.limit };
    let shown: Vec<(&RelativePath, &EntryReport)> =
        report.entries_in(classification).take(limit).collect();

    for (group, entries) in &shown
        .into_iter()
        .sorted_by_key(|&(path, _)| group_name(path))
        .chunk_by(|&(path, _)| group_name(path))
    {
        writeln!(out, "  {group}/")?;
        for (path, entry) in entries {
            writeln!(out, "   {}", path)?;
            write_evidence(out, entry)?;
        }
    }

    if count > limit {
        writeln!(out, "   ... and {} more", count - limit)?;
    }
    writeln!(out)
}

fn write_evidence(out: &mut String, entry: &EntryReport) -> std::fmt::Result {
    match entry.classification {
        Classification::UniversalIdentical | Classification::PartialIdentical => {
            let size = entry.digest_groups.first().map_or(0, |g| g.size);
            writeln!(
                out,
                "     {} in {} [{}]",
                format_size(size, BINARY),
                entry.present_in.iter().join(", "),
                entry.recommendation.label()
            )?;
        }
        Classification::DivergentUniversal | Classification::DivergentPartial => {
            for group in &entry.digest_groups {
                writeln!(
                    out,
                    "     {} {:>10}  {}",
                    group.digest.short(),
                    format_size(group.size, BINARY),
                    group.trees.iter().join(", ")
                )?;
            }
            if let Recommendation::HoistWithOverrides { overrides, .. } = &entry.recommendation {
                writeln!(
                    out,
                    "     [{}; override in {}]",
                    entry.recommendation.label(),
                    overrides.iter().join(", ")
                )?;
            } else {
                writeln!(out, "     [{}]", entry.recommendation.label())?;
            }
        }
        Classification::Unique => {
            let size = entry.digest_groups.first().map_or(0, |g| g.size);
            writeln!(
                out,
                "     {} only in {}",
                format_size(size, BINARY),
                entry.present_in.iter().join(", ")
            )?;
        }
    }
    if !entry.absent_from.is_empty() && entry.classification != Classification::Unique {
        writeln!(out, "     absent from: {}", entry.absent_from.iter().join(", "))?;
    }
    Ok(())
}

fn write_skipped(out: &mut String, report: &Report) -> std::fmt::Result {
    let summary = &report.summary;
    rule(out)?;
    writeln!(
        out,
        " Skipped: {} tree(s) unreadable, {} directory(ies) unreadable, {} file(s) unreadable, {} warning(s)",
        summary.trees_unreadable,
        summary.directories_skipped,
        summary.files_skipped,
        summary.warnings
    )?;
    if report.caveats.is_empty() {
        writeln!(out, " Comparison complete: every tree and file was read.")?;
    } else {
        for caveat in &report.caveats {
            writeln!(out, " ! {caveat}")?;
        }
    }
    rule(out)
}
