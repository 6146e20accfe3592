//! blocktui: drag-and-drop block placement puzzle in the terminal.

mod animation;
mod app;
mod audio;
mod game;
mod highscores;
mod input;
mod interaction;
mod pieces;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use audio::{AudioSink, Silent, TerminalBell};
use clap::{Parser, ValueEnum};
use env_logger::{Env, Target};
use game::GameState;
use highscores::{BestScore, FileStore, MemoryStore};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use theme::Theme;

const LOG_FILENAME: &str = "blocktui.log";

/// Options derived from CLI that affect the game itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    pub board_size: u16,
    pub refill: RefillPolicy,
    pub animate: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref());

    let theme = Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!("could not load theme ({e}); using defaults");
        let mut theme = Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let config = GameConfig {
        board_size: args.size,
        refill: args.refill,
        animate: !args.no_animation,
    };
    let audio: Box<dyn AudioSink> = if args.mute {
        Box::new(Silent)
    } else {
        Box::new(TerminalBell)
    };
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    info!(
        "starting: {0}x{0} board, refill {1:?}, seed {2:?}",
        config.board_size, config.refill, args.seed
    );

    let game = GameState::new(&config, open_best_score(&args), audio, rng);
    let mut app = App::new(game, theme, config.animate, args.frame_rate);
    app.run()?;
    Ok(())
}

/// `--no-persist` keeps the best in memory; otherwise `--score-file` or the data dir.
fn open_best_score(args: &Args) -> BestScore {
    if args.no_persist {
        return BestScore::open(Box::new(MemoryStore::default()));
    }
    let store = match &args.score_file {
        Some(path) => FileStore::new(path),
        None => match FileStore::in_data_dir() {
            Ok(store) => store,
            Err(e) => {
                warn!("best score will not be saved: {e}");
                return BestScore::in_memory();
            }
        },
    };
    info!("best score file {}", store.path().display());
    BestScore::open(Box::new(store))
}

/// Log to a file; the terminal belongs to the UI. Logging stays off if the file cannot be opened.
fn init_logging(path: Option<&Path>) {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match highscores::data_dir() {
            Ok(dir) => dir.join(LOG_FILENAME),
            Err(_) => return,
        },
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
}

/// Drag-and-drop block placement puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blocktui",
    version,
    about = "Drag-and-drop block placement puzzle in the terminal. Fill rows and columns to clear them.",
    long_about = "blocktui is a block placement puzzle for the terminal.\n\n\
        Drag one of three offered pieces onto the board with the mouse. Pieces never rotate. \
        A full row or column is cleared and scores one point per removed cell; every placed \
        cell scores one point too. The game ends when none of the offered pieces fits.\n\n\
        CONTROLS:\n  Mouse       Drag a piece from the tray to the board\n  1 / 2 / 3   Pick a piece    \
        Arrows/hjkl  Move it    Enter/Space  Place    Esc  Put back\n  R           New game        \
        Q            Quit\n\n\
        The best score is kept in the user data directory. Use --theme to load a btop-style theme."
)]
pub struct Args {
    /// Board side length in cells.
    #[arg(long, default_value = "10", value_name = "N", value_parser = clap::value_parser!(u16).range(4..=12))]
    pub size: u16,

    /// Path to theme file (btop-style theme[key]=\"value\").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// When new pieces arrive: when-empty (all three once the tray is empty) or each (after every placement).
    #[arg(long, default_value = "when-empty")]
    pub refill: RefillPolicy,

    /// Seed for piece generation (same seed, same pieces).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Disable the placement tween and line-clear fade.
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second while something moves.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Best score file (default: <data dir>/blocktui/best_score).
    #[arg(long, value_name = "FILE")]
    pub score_file: Option<PathBuf>,

    /// Keep the best score for this session only.
    #[arg(long)]
    pub no_persist: bool,

    /// No terminal bell.
    #[arg(long)]
    pub mute: bool,

    /// Log file (default: <data dir>/blocktui/blocktui.log). Level from RUST_LOG.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RefillPolicy {
    #[default]
    WhenEmpty,
    Each,
}
