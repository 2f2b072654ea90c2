//! dirsnap: directory change detection via content-addressed snapshots
//!
//! Keeps a binary snapshot of a directory tree and reports the files
//! added, removed, updated, or renamed since the previous snapshot.

use std::path::{Path, PathBuf};

use clap::builder::styling::{AnsiColor, Effects};
use clap::{builder::Styles, Parser, Subcommand};
use color_eyre::Result;
use tracing::info;

use dirsnap_core::{engine, store, Config, SnapshotDiff};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

#[derive(Parser)]
#[command(name = "dirsnap")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "Directory change detection via content-addressed snapshots")]
#[command(long_about = r#"
dirsnap keeps a content-addressed snapshot of a directory tree and reports
the files added, removed, updated, or renamed since the previous snapshot.

Examples:
  dirsnap snapshot ./project                   Take or refresh a snapshot
  dirsnap snapshot ./project --store ~/.snaps  Keep snapshot files elsewhere
  dirsnap update-file ./src/main.rs project.snapshot
  dirsnap inspect project.snapshot             Show what a snapshot contains
  dirsnap demo                                 Scripted walkthrough
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take or refresh a directory snapshot and print what changed
    Snapshot {
        /// Directory to snapshot
        directory: PathBuf,

        /// Where snapshot files are kept (default: .dirsnap.toml setting,
        /// then the current directory)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Snapshot file stem (default: .dirsnap.toml setting, then the
        /// directory's base name)
        #[arg(short, long)]
        id: Option<String>,

        /// Output format (summary, json)
        #[arg(short, long, default_value = "summary")]
        format: String,
    },

    /// Re-evaluate one file against an existing snapshot
    UpdateFile {
        /// File to re-evaluate
        file: PathBuf,

        /// Snapshot file to update
        snapshot: PathBuf,

        /// Output format (summary, json)
        #[arg(short, long, default_value = "summary")]
        format: String,
    },

    /// Show what a snapshot file contains
    Inspect {
        /// Snapshot file to read
        snapshot: PathBuf,

        /// Maximum entries to list
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Run a scripted walkthrough in a temporary directory
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Snapshot {
            directory,
            store,
            id,
            format,
        } => snapshot(directory, store, id, &format).await,
        Commands::UpdateFile {
            file,
            snapshot,
            format,
        } => update_file(&file, &snapshot, &format).await,
        Commands::Inspect { snapshot, limit } => inspect(&snapshot, limit).await,
        Commands::Demo => demo().await,
    }
}

async fn snapshot(
    directory: PathBuf,
    store_dir: Option<PathBuf>,
    id: Option<String>,
    format: &str,
) -> Result<()> {
    let config = Config::load(&directory)?;
    let store_dir = store_dir
        .or(config.snapshot_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let id = id.or(config.id);

    let diff = engine::snapshot_directory(&directory, &store_dir, id.as_deref()).await?;
    print_diff(&diff, format)
}

async fn update_file(file: &Path, snapshot: &Path, format: &str) -> Result<()> {
    let diff = engine::update_single_file(file, snapshot).await?;
    print_diff(&diff, format)
}

async fn inspect(snapshot: &Path, limit: usize) -> Result<()> {
    let snapshot = store::load(snapshot).await?;

    println!("Snapshot of {}", snapshot.root.display());
    println!("Total files: {}", snapshot.len());
    for entry in snapshot.entries.iter().take(limit) {
        println!(
            "  {} ({} bytes, {})",
            entry.path.display(),
            entry.size,
            entry.hash
        );
    }
    if snapshot.len() > limit {
        println!("  ... and {} more", snapshot.len() - limit);
    }

    Ok(())
}

fn print_diff(diff: &SnapshotDiff, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(diff)?);
        return Ok(());
    }

    if diff.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    for path in &diff.added {
        println!("added:   {}", path.display());
    }
    for path in &diff.removed {
        println!("removed: {}", path.display());
    }
    for path in &diff.updated {
        println!("updated: {}", path.display());
    }
    for (from, to) in &diff.renamed {
        println!("renamed: {} -> {}", from.display(), to.display());
    }

    Ok(())
}

/// Scripted walkthrough: bootstrap, edit, rename, re-snapshot, inspect.
async fn demo() -> Result<()> {
    let tree = tempfile::tempdir()?;
    let store_dir = tempfile::tempdir()?;

    let files: Vec<PathBuf> = (1..=5)
        .map(|i| tree.path().join(format!("file{i}.txt")))
        .collect();
    for (i, file) in files.iter().enumerate() {
        std::fs::write(file, format!("Initial content for file {}", i + 1))?;
    }
    info!("created 5 files under {}", tree.path().display());

    let diff = engine::snapshot_directory(tree.path(), store_dir.path(), Some("demo")).await?;
    info!(changes = diff.len(), "initial snapshot saved");

    // Edit two files, then move an untouched one.
    for file in &files[..2] {
        let mut content = std::fs::read_to_string(file)?;
        content.push_str("\nedited");
        std::fs::write(file, content)?;
    }
    let renamed = tree.path().join("file5_renamed.txt");
    std::fs::rename(&files[4], &renamed)?;
    info!(
        "edited 2 files, renamed {} -> {}",
        files[4].display(),
        renamed.display()
    );

    let diff = engine::snapshot_directory(tree.path(), store_dir.path(), Some("demo")).await?;
    println!("Snapshot update results:");
    print_diff(&diff, "summary")?;
    println!();

    inspect(&store_dir.path().join("demo.snapshot"), 5).await?;

    Ok(())
}
