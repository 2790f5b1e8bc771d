//! Framelabel: an in-memory annotation model for frame-based labeling.
//!
//! Framelabel keeps the shapes, tracks and tags of an image or video task
//! in memory, interpolates tracks between keyframes, and records every
//! edit in a bounded undo/redo history. Structural edits (merge, split,
//! group, join, slice, clear) operate on the same model.
//!
//! # Modules
//!
//! - [`format`]: Serialized `{ shapes, tracks, tags }` wire types and JSON I/O
//! - [`schema`]: Labels, attribute specifications and task metadata
//! - [`annotations`]: Stored annotation objects and geometry validation
//! - [`interpolation`]: Track positions between keyframes
//! - [`collection`]: The frame-indexed store and all edit operations
//! - [`history`]: Undo/redo log with per-action quotas
//! - [`state`]: The `ObjectState` read/write view
//! - [`mask`]: Mask run-length encoding and pixel operations
//! - [`stats`]: Per-label annotation statistics
//! - [`session`]: Registry of open collections
//! - [`error`]: Error types for framelabel operations

pub mod annotations;
pub mod collection;
pub mod error;
pub mod format;
pub mod geometry;
pub mod history;
pub mod interpolation;
pub mod mask;
pub mod schema;
pub mod session;
pub mod state;
pub mod stats;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::collection::Collection;
use crate::format::io_json;
use crate::schema::TaskMeta;

pub use error::FramelabelError;

/// The framelabel CLI application.
#[derive(Parser)]
#[command(name = "framelabel")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show per-label annotation statistics.
    Stats(StatsArgs),
    /// Print the object states visible on one frame as JSON.
    Frame(FrameArgs),
    /// Import and re-export annotations in canonical form.
    Normalize(NormalizeArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Annotations file and the task metadata it belongs to.
#[derive(clap::Args)]
struct TaskInput {
    /// Serialized annotations (JSON).
    input: PathBuf,

    /// Task metadata with labels and frame range (YAML or JSON).
    #[arg(long, env = "FRAMELABEL_META")]
    meta: PathBuf,
}

/// Arguments for the stats subcommand.
#[derive(clap::Args)]
struct StatsArgs {
    #[command(flatten)]
    task: TaskInput,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Arguments for the frame subcommand.
#[derive(clap::Args)]
struct FrameArgs {
    #[command(flatten)]
    task: TaskInput,

    /// Frame number to project.
    #[arg(long)]
    frame: u32,

    /// Include tracks that are outside on this frame.
    #[arg(long)]
    all_tracks: bool,
}

/// Arguments for the normalize subcommand.
#[derive(clap::Args)]
struct NormalizeArgs {
    #[command(flatten)]
    task: TaskInput,

    /// Output file for the normalized annotations.
    #[arg(short, long)]
    output: PathBuf,
}

/// Run the framelabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), FramelabelError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Stats(args)) => run_stats(args),
        Some(Commands::Frame(args)) => run_frame(args),
        Some(Commands::Normalize(args)) => run_normalize(args),
        None => {
            println!("framelabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("In-memory annotation model for frame-based labeling.");
            println!();
            println!("Run 'framelabel --help' for usage information.");
            Ok(())
        }
    }
}

/// Load task metadata and import the annotations into a fresh collection.
fn load(task: &TaskInput) -> Result<Collection, FramelabelError> {
    let meta = TaskMeta::from_path(&task.meta)?;
    let data = io_json::read_collection_json(&task.input)?;

    let mut collection = Collection::from_task(meta);
    let ids = collection.import(&data)?;
    tracing::info!(
        input = %task.input.display(),
        objects = ids.len(),
        "Annotations imported"
    );
    Ok(collection)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), FramelabelError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| FramelabelError::JsonWrite {
        path: PathBuf::from("<stdout>"),
        source,
    })?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}

/// Execute the stats subcommand.
fn run_stats(args: StatsArgs) -> Result<(), FramelabelError> {
    let collection = load(&args.task)?;
    let statistics = collection.statistics();

    match args.output {
        OutputFormat::Json => print_json(&statistics),
        OutputFormat::Text => {
            print!("{}", statistics);
            Ok(())
        }
    }
}

/// Execute the frame subcommand.
fn run_frame(args: FrameArgs) -> Result<(), FramelabelError> {
    let collection = load(&args.task)?;
    let states = collection.get(args.frame, args.all_tracks, &[])?;
    print_json(&states)
}

/// Execute the normalize subcommand.
fn run_normalize(args: NormalizeArgs) -> Result<(), FramelabelError> {
    let collection = load(&args.task)?;
    let exported = collection.export();
    io_json::write_collection_json(&args.output, &exported)?;

    println!(
        "Normalized {} shape(s), {} track(s), {} tag(s) -> {}",
        exported.shapes.len(),
        exported.tracks.len(),
        exported.tags.len(),
        args.output.display()
    );
    Ok(())
}
