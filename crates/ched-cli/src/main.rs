//! Ched command line
//!
//! Usage:
//!   ched export <book> -o <out.sus>   - Export a score book as SUS
//!   ched combo <book>                 - Count the chart's combo
//!   ched locate <book> --tick N       - Resolve a tick (or --time) on the timeline
//!   ched inspect <book>               - Dump the resolved timeline as JSON
//!   ched new <path>                   - Create an empty score book

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};

use ched_core::{
    timeline_report, write_report, ComboPlugin, ExportPipeline, ScorePlugin, SusExportPlugin,
    Timeline,
};
use ched_domain_score::ScoreBook;
use ched_infra_storage_fs::FsStorage;
use ched_ports::config::{ChedConfig, SusArgs};
use ched_ports::storage::StoragePort;

#[derive(Parser)]
#[command(name = "ched", version, about = "Chart timeline tools and SUS exporter")]
struct Cli {
    /// Configuration file (defaults to <config dir>/Ched/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a score book as a SUS document
    Export {
        book: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// JSON file with SUS export arguments
        #[arg(long)]
        args: Option<PathBuf>,
        /// Insert an empty bar before the chart
        #[arg(long)]
        padding_bar: bool,
    },
    /// Count the combo of a chart
    Combo { book: PathBuf },
    /// Resolve a tick or a time against the book's timeline
    #[command(group(ArgGroup::new("at").required(true).args(["tick", "time"])))]
    Locate {
        book: PathBuf,
        #[arg(long)]
        tick: Option<i64>,
        /// Seconds from the start of the chart
        #[arg(long)]
        time: Option<f64>,
    },
    /// Print the resolved timeline as JSON
    Inspect {
        book: PathBuf,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create an empty score book
    New {
        path: PathBuf,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        artist: String,
        /// Ticks per quarter note (defaults to the configured value)
        #[arg(long)]
        ticks_per_beat: Option<u32>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let storage = match &cli.config {
        Some(path) => FsStorage::from_config_path(path.clone()),
        None => FsStorage::default(),
    };
    let config = storage
        .load_config()
        .with_context(|| format!("failed to load {}", storage.config_path().display()))?;
    init_logger(&config);

    match cli.command {
        Commands::Export {
            book,
            output,
            args,
            padding_bar,
        } => export(&config, &book, &output, args.as_deref(), padding_bar),
        Commands::Combo { book } => combo(&book),
        Commands::Locate { book, tick, time } => locate(&book, tick, time),
        Commands::Inspect { book, output } => inspect(&book, output.as_deref()),
        Commands::New {
            path,
            title,
            artist,
            ticks_per_beat,
            force,
        } => create(
            &path,
            title,
            artist,
            ticks_per_beat.unwrap_or(config.default_ticks_per_beat),
            force,
        ),
    }
}

// RUST_LOG wins over the configured level.
fn init_logger(config: &ChedConfig) {
    let default_level = config.log_level.as_deref().unwrap_or("warn");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn load_book(path: &Path) -> Result<ScoreBook> {
    FsStorage::load_score_book(path).with_context(|| format!("failed to load {}", path.display()))
}

fn export(
    config: &ChedConfig,
    book_path: &Path,
    output: &Path,
    args_path: Option<&Path>,
    padding_bar: bool,
) -> Result<()> {
    let mut book = load_book(book_path)?;

    let overrides = match args_path {
        Some(path) => {
            let data = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let args: SusArgs = serde_json::from_str(&data)
                .with_context(|| format!("invalid export arguments in {}", path.display()))?;
            Some(args)
        }
        None if padding_bar => Some(config.sus.clone()),
        None => None,
    }
    .map(|mut args| {
        args.has_padding_bar |= padding_bar;
        args
    });

    let is_quick = overrides.is_none();
    let mut plugin = SusExportPlugin::new(config.sus.clone());
    plugin.overrides = overrides;
    let pipeline = ExportPipeline::new(Box::new(plugin));

    // Buffered whole so a failed export never leaves a partial file.
    let stored_before = book.export_args.clone();
    let mut document: Vec<u8> = Vec::new();
    let report = pipeline
        .run(&mut book, &mut document, is_quick)
        .with_context(|| format!("failed to export {}", book_path.display()))?;
    fs::write(output, &document).with_context(|| format!("failed to write {}", output.display()))?;

    if book.export_args != stored_before {
        FsStorage::save_score_book(book_path, &book)
            .with_context(|| format!("failed to save {}", book_path.display()))?;
    }

    println!("{report}");
    Ok(())
}

fn combo(book_path: &Path) -> Result<()> {
    let book = load_book(book_path)?;
    let plugin = ComboPlugin;
    let report = plugin
        .run(&book.score)
        .with_context(|| format!("{} failed", plugin.display_name()))?;
    print!("{report}");
    Ok(())
}

fn locate(book_path: &Path, tick: Option<i64>, time: Option<f64>) -> Result<()> {
    let book = load_book(book_path)?;
    let timeline = Timeline::build(&book.score).context("invalid timeline")?;

    let location = match (tick, time) {
        (Some(tick), _) => timeline.locate_tick(tick)?,
        (None, Some(time)) => timeline.locate_time(time)?,
        (None, None) => bail!("either --tick or --time is required"),
    };

    println!(
        "tick {}: bar {} + {} ticks, {:.3}s, {} BPM",
        location.tick, location.bar_index, location.tick_offset, location.seconds, location.bpm
    );
    Ok(())
}

fn inspect(book_path: &Path, output: Option<&Path>) -> Result<()> {
    let book = load_book(book_path)?;
    let report = timeline_report(&book.score).context("invalid timeline")?;

    match output {
        Some(path) => {
            write_report(path, &report)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn create(path: &Path, title: String, artist: String, ticks_per_beat: u32, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if ticks_per_beat == 0 {
        bail!("ticks per beat must be positive");
    }

    let mut book = ScoreBook::new(ticks_per_beat);
    book.title = title;
    book.artist_name = artist;
    FsStorage::save_score_book(path, &book)
        .with_context(|| format!("failed to save {}", path.display()))?;

    log::info!("created {} at {} ticks/beat", path.display(), ticks_per_beat);
    Ok(())
}
