//! treehoist - find what parallel directory trees share, and hoist it.
//!
//! Usage:
//!   treehoist classify --tree a=themes/a --tree b=themes/b
//!   treehoist classify --trees-in themes --shared themes/shared -f json
//!   treehoist hoist --trees-in themes --shared themes/shared --dry-run
//!   treehoist --help

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, eyre, Context, Result};
use humansize::{format_size, BINARY};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use treehoist_analyze::{render_text, RenderOptions, Report, ReportConfig, Reporter};
use treehoist_core::{RunConfig, RunStatus, TreeId, TreeSpec};
use treehoist_ops::{start_hoist, HoistOptions, HoistPlan, HoistResult};
use treehoist_scan::Engine;

#[derive(Parser)]
#[command(
    name = "treehoist",
    version,
    about = "Classify files across parallel trees and hoist the shared ones",
    long_about = "treehoist compares several directory trees file by file, classifies every \n\
                  relative path by how its content is spread across the trees, and \n\
                  recommends which files can move into a single shared tree."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare trees and report how every path is shared
    Classify {
        #[command(flatten)]
        run: RunArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum paths listed per section (0 = unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        limit: usize,
    },

    /// Copy hoistable files into the shared tree
    Hoist {
        #[command(flatten)]
        run: RunArgs,

        /// Show what would be copied without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

/// Options shared by every subcommand that runs a comparison.
#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Tree to compare, as NAME=PATH or PATH (repeatable; order is kept)
    #[arg(short, long = "tree", value_name = "TREE")]
    trees: Vec<String>,

    /// Compare every immediate subdirectory of DIR
    #[arg(long, value_name = "DIR")]
    trees_in: Option<PathBuf>,

    /// Already-shared tree; its paths are not flagged again
    #[arg(short, long, value_name = "DIR")]
    shared: Option<PathBuf>,

    /// Additional directory-name pattern to skip (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,

    /// Fraction of trees a file must cover to be hoisted
    #[arg(long, value_name = "FRACTION")]
    min_coverage: Option<f64>,

    /// Byte difference from the median that marks a size outlier
    #[arg(long, value_name = "BYTES")]
    size_delta: Option<u64>,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Path to always report on (repeatable)
    #[arg(short, long = "watch", value_name = "PATH")]
    watch: Vec<String>,

    /// TOML config file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("Received Ctrl+C, stopping after in-flight files");
        handler_token.cancel();
    })
    .context("Failed to install Ctrl+C handler")?;

    match cli.command {
        Command::Classify {
            run,
            format,
            output,
            limit,
        } => run_classify(&run, format, output, limit, cancel),
        Command::Hoist { run, dry_run } => run_hoist(&run, dry_run, cancel),
    }
}

/// Install the stderr log subscriber. Reports go to stdout.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Merge the config file (if any) with command-line flags.
fn load_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str::<RunConfig>(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => RunConfig::new(Vec::new()),
    };

    if let Some(shared) = &args.shared {
        config.shared = Some(shared.clone());
    }

    let mut trees = Vec::new();
    for arg in &args.trees {
        trees.push(TreeSpec::parse(arg)?);
    }
    if let Some(dir) = &args.trees_in {
        trees.extend(trees_in(dir, config.shared.as_deref())?);
    }
    if !trees.is_empty() {
        config.trees = trees;
    }

    config.exclude_dirs.extend(args.exclude.iter().cloned());
    config.watch_paths.extend(args.watch.iter().cloned());
    if let Some(coverage) = args.min_coverage {
        config.min_coverage = coverage;
    }
    if let Some(delta) = args.size_delta {
        config.size_delta_threshold = delta;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }

    config.validate()?;
    Ok(config)
}

/// Every non-hidden subdirectory of `dir`, sorted by name, minus the shared tree.
fn trees_in(dir: &Path, shared: Option<&Path>) -> Result<Vec<TreeSpec>> {
    let shared = shared.and_then(|p| p.canonicalize().ok());
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut trees = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !path.is_dir() {
            continue;
        }
        if shared.is_some() && path.canonicalize().ok() == shared {
            continue;
        }
        trees.push(TreeSpec::new(TreeId::new(name), path));
    }
    trees.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(trees)
}

/// Run the comparison and build the report.
fn compare(config: &RunConfig, cancel: CancellationToken) -> Result<Report> {
    let engine = Engine::new(config.clone())?.with_cancellation(cancel);

    let mut progress = engine.subscribe();
    let watcher = thread::spawn(move || {
        loop {
            let update = match progress.blocking_recv() {
                Ok(update) => update,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if update.finished {
                tracing::info!(
                    tree = %update.tree,
                    files = update.files_hashed,
                    bytes = %format_size(update.bytes_hashed, BINARY),
                    "tree scanned"
                );
            }
        }
    });

    eprintln!("Comparing {} trees...", engine.roster().len());
    let outcome = engine.run()?;
    drop(engine);
    let _ = watcher.join();

    eprintln!(
        "Indexed {} paths in {:.2}s",
        outcome.index.len(),
        outcome.duration.as_secs_f64()
    );
    Ok(Reporter::new(ReportConfig::from_run_config(config)).build(&outcome))
}

/// Compare trees and print the report.
fn run_classify(
    args: &RunArgs,
    format: OutputFormat,
    output: Option<PathBuf>,
    limit: usize,
    cancel: CancellationToken,
) -> Result<()> {
    let config = load_config(args)?;
    let report = compare(&config, cancel)?;

    let rendered = match format {
        OutputFormat::Text => render_text(&report, RenderOptions { limit }),
        OutputFormat::Json => {
            let mut json = report.to_json()?;
            json.push('\n');
            json
        }
    };

    match output {
        Some(output_path) => {
            fs::write(&output_path, rendered)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            eprintln!("Report written to {}", output_path.display());
        }
        None => print!("{rendered}"),
    }

    if report.status == RunStatus::Aborted {
        bail!("Run aborted; the report is partial");
    }
    Ok(())
}

/// Compare trees, then copy every hoistable file into the shared tree.
fn run_hoist(args: &RunArgs, dry_run: bool, cancel: CancellationToken) -> Result<()> {
    let mut config = load_config(args)?;
    let target = config
        .shared
        .clone()
        .ok_or_else(|| eyre!("hoist needs a shared tree (--shared DIR)"))?;
    if !target.exists() {
        // Nothing is shared yet.
        config.shared = None;
    }

    let report = compare(&config, cancel.clone())?;
    if report.status == RunStatus::Aborted {
        bail!("Run aborted; refusing to hoist from a partial comparison");
    }
    for caveat in &report.caveats {
        eprintln!("warning: {caveat}");
    }

    let plan = HoistPlan::from_report(&report, &target);
    println!();
    println!("{}", "─".repeat(70));
    println!(
        " Hoist plan: {} files ({}) into {}",
        plan.len(),
        format_size(plan.total_bytes(), BINARY),
        target.display()
    );
    println!("{}", "─".repeat(70));
    if dry_run {
        for item in &plan.items {
            println!("   {} (from {})", item.path, item.source_tree);
        }
    }
    println!();

    let options = HoistOptions {
        dry_run,
        cancel: Some(cancel),
    };
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let complete = runtime.block_on(async move {
        let mut rx = start_hoist(plan, options);
        while let Some(result) = rx.recv().await {
            match result {
                HoistResult::Progress(_) => {}
                HoistResult::Conflict(conflict) => eprintln!("conflict: {conflict}"),
                HoistResult::Complete(complete) => return Some(complete),
            }
        }
        None
    });
    let complete = complete.ok_or_else(|| eyre!("Hoist ended without a result"))?;

    println!(" {}", complete.summary());
    if complete.bytes_copied > 0 {
        println!(" {} written", format_size(complete.bytes_copied, BINARY));
    }
    if let Some(manifest) = &complete.manifest {
        println!(" Manifest: {}", manifest.display());
    }
    for error in &complete.errors {
        eprintln!("error: {error}");
    }

    if !complete.is_success() {
        bail!(
            "{} conflict(s), {} failure(s), {} cancelled",
            complete.conflicts,
            complete.failed,
            complete.cancelled
        );
    }
    Ok(())
}
