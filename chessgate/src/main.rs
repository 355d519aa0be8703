//! chessgate: play against a UCI engine from the terminal.
//!
//! Moves are typed as UCI (`e2e4`, `e7e8q`) or as clicks (`click e2`); the
//! session runs at a fixed frame rate so clocks, animations and the engine
//! advance exactly as they would behind a graphical board.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cozy_chess::Color;
use engine::{EngineConfig, ProcessEngine};
use session::{GameSettings, SessionConfig, SessionController};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod driver;

/// Command-line arguments. Unset values fall back to `CHESSGATE_*`
/// environment variables (see [`config`]) and then to built-in defaults.
#[derive(Parser)]
#[command(name = "chessgate", about = "Play chess against a UCI engine")]
struct Cli {
    /// Side you play: white or black.
    #[arg(short, long, default_value = "white", value_parser = parse_side)]
    side: Color,

    /// Minutes on each clock (1-180).
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=driver::MAX_MINUTES))]
    minutes: u64,

    /// Seconds added to the mover's clock after every move.
    #[arg(long, default_value_t = 0)]
    increment: u64,

    /// Start from this position instead of the initial one.
    #[arg(long)]
    fen: Option<String>,

    /// Engine executable (default: bundled engine, then stockfish).
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Upper bound on engine thinking time per move, in milliseconds.
    #[arg(long)]
    move_time_ms: Option<u64>,

    /// Session frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Engine "Skill Level" option (0-20).
    #[arg(long)]
    skill: Option<u8>,

    /// Engine search threads.
    #[arg(long)]
    threads: Option<u32>,

    /// Engine hash table size in MB.
    #[arg(long)]
    hash: Option<u32>,
}

fn parse_side(s: &str) -> Result<Color, String> {
    chess::parse_color(s).ok_or_else(|| format!("expected 'white' or 'black', got '{}'", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing with file output; stdout belongs to the game
    let log_dir = config::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "chessgate");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("chessgate starting up");

    let engine_config = EngineConfig {
        path: cli.engine.clone().or_else(config::get_engine_path),
        skill_level: cli.skill,
        threads: cli.threads,
        hash_mb: cli.hash,
        ..Default::default()
    };
    let engine = ProcessEngine::spawn(engine_config)
        .await
        .context("failed to start chess engine")?;

    let session_config = SessionConfig {
        move_time: Duration::from_millis(cli.move_time_ms.unwrap_or_else(config::get_move_time_ms)),
        ..Default::default()
    };
    let settings = GameSettings {
        human_side: cli.side,
        time_control: Duration::from_secs(cli.minutes * 60),
        increment: Duration::from_secs(cli.increment),
        start_fen: cli.fen.clone(),
    };
    let fps = cli.fps.filter(|f| *f > 0).unwrap_or_else(config::get_fps);

    println!("chessgate - type 'help' for commands");
    println!("Debug logs: {}/chessgate.YYYY-MM-DD", log_dir.display());

    let controller = SessionController::new(
        session_config,
        Arc::new(engine),
        tokio::runtime::Handle::current(),
    );
    driver::run(controller, settings, fps).await?;

    tracing::info!("chessgate shutting down");
    Ok(())
}
