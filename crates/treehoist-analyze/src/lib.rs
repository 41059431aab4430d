//! Classification and hoisting reports for treehoist.
//!
//! This crate consumes a finished [`RunOutcome`] and produces:
//!
//! - **Classification** - every path labelled by how its content is spread
//!   across the roster (see [`Classification`])
//! - **Recommendations** - hoist, hoist with overrides, keep per tree, or
//!   tree specific, driven by a minimum coverage fraction
//! - **Reports** - a serializable [`Report`] and a plain-text rendering
//!
//! ```rust,ignore
//! use treehoist_analyze::{render_text, RenderOptions, ReportConfig, Reporter};
//! use treehoist_scan::{Engine, RunConfig, TreeSpec};
//!
//! let config = RunConfig::new(vec![
//!     TreeSpec::new("a", "/themes/a"),
//!     TreeSpec::new("b", "/themes/b"),
//! ]);
//! let outcome = Engine::new(config.clone())?.run()?;
//!
//! let report = Reporter::new(ReportConfig::from_run_config(&config)).build(&outcome);
//! println!("{}", render_text(&report, RenderOptions::default()));
//! ```

mod classify;
mod recommend;
mod render;
mod report;

pub use classify::{classify, Classification, ClassifiedEntry, Classifier, DigestGroup};
pub use recommend::{meets_coverage, recommend, Recommendation};
pub use render::{group_name, render_text, RenderOptions, ROOT_GROUP};
pub use report::{
    EntryReport, Report, ReportConfig, ReportConfigBuilder, Reporter, RosterEntry, SizeDelta,
    SizeOutlier, Summary, WatchEntry,
};

// Re-export core types
pub use treehoist_core::{PathEntry, RelativePath, RunOutcome, TreeId};
