//! Mergetui: a 2048-style sliding tile merge puzzle in the terminal, with undo/redo.

mod app;
mod command;
mod controller;
mod grid;
mod history;
mod input;
mod scene;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Options derived from CLI that affect the game itself (grid size, spawns, history).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub rows: usize,
    pub columns: usize,
    pub start_tiles: usize,
    pub seed: Option<u64>,
    pub undo_limit: Option<usize>,
    pub animate: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: 4,
            columns: 4,
            start_tiles: 4,
            seed: None,
            undo_limit: None,
            animate: true,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref()).unwrap_or_default();
    let (rows, columns) = (usize::from(args.rows), usize::from(args.columns));
    let config = GameConfig {
        rows,
        columns,
        start_tiles: args.start_tiles.min(rows * columns),
        seed: args.seed,
        undo_limit: args.undo_limit,
        animate: !args.no_animation,
    };
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// The TUI owns stdout, so logs only go to `--log-file` when one is given.
fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = args.log_file.as_ref() else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::new(&args.log))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// 2048-style merge puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "mergetui",
    version,
    about = "2048-style sliding tile puzzle in the terminal. Slide tiles, merge equal values, undo any turn.",
    long_about = "Mergetui is a terminal take on the 2048 sliding tile puzzle.\n\n\
        Every turn slides all tiles toward one wall. Two tiles of equal value that collide merge \
        into one tile of double the value; a tile merges at most once per turn. After each turn \
        that changed the board a new 2 (75%) or 4 (25%) appears in a random empty cell.\n\n\
        CONTROLS:\n  Arrows / hjkl / wasd  Slide    u / Ctrl+Z  Undo    U / Ctrl+Y / Ctrl+R  Redo\n  \
        r  Restart    q / Esc  Menu\n\n\
        Use --log-file with --log debug to get a text dump of the grid after every turn."
)]
pub struct Args {
    /// Grid rows (2-8).
    #[arg(long, default_value = "4", value_name = "N", value_parser = clap::value_parser!(u8).range(2..=8))]
    pub rows: u8,

    /// Grid columns (2-8).
    #[arg(long, default_value = "4", value_name = "N", value_parser = clap::value_parser!(u8).range(2..=8))]
    pub columns: u8,

    /// Tiles placed when a game starts.
    #[arg(long, default_value = "4", value_name = "N")]
    pub start_tiles: usize,

    /// RNG seed for reproducible spawns.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Keep at most this many undoable turns (unlimited if not set).
    #[arg(long, value_name = "N")]
    pub undo_limit: Option<usize>,

    /// Disable slide/appear animations.
    #[arg(long)]
    pub no_animation: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Write logs to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Tracing filter for --log-file, e.g. "info" or "mergetui=debug".
    #[arg(long, default_value = "info")]
    pub log: String,
}
