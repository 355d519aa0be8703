//! Out-of-process search engine boundary.
//!
//! The session only talks to engines through [`SearchEngine`]: start an
//! analysis of a position, receive a stream of [`SearchUpdate`]s that ends
//! with exactly one final best move, stop early, quit. [`ProcessEngine`]
//! implements it over a UCI subprocess.

pub mod locate;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod process;
pub mod uci;

pub use locate::find_engine_path;
pub use process::{EngineConfig, ProcessEngine};
pub use uci::{parse_uci_message, UciError, UciMessage};

use async_trait::async_trait;
use cozy_chess::{Board, Move};
use std::time::Duration;
use tokio::sync::mpsc;

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Uci,
    IsReady,
    SetPosition { fen: String, moves: Vec<Move> },
    SetOption { name: String, value: Option<String> },
    Go(GoParams),
    Stop,
    Quit,
}

/// Parameters for the "go" command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub movetime: Option<u64>, // Move time in milliseconds
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub movestogo: Option<u32>,
}

impl From<&SearchLimits> for GoParams {
    fn from(limits: &SearchLimits) -> Self {
        Self {
            movetime: Some(limits.move_time.as_millis() as u64),
            wtime: limits.white_time.map(|t| t.as_millis() as u64),
            btime: limits.black_time.map(|t| t.as_millis() as u64),
            movestogo: limits.moves_to_go,
        }
    }
}

/// Events received from the engine process
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Ready,
    /// Final answer of a search; `None` when the engine reports `(none)`.
    BestMove(Option<Move>),
    Info(EngineInfo),
}

/// Engine analysis information
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub seldepth: Option<u8>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    pub pv: Vec<Move>, // Principal variation
    pub multipv: Option<u8>,
    pub currmove: Option<Move>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i8), // Negative for being mated
}

impl From<Score> for chess::AnalysisScore {
    fn from(score: Score) -> Self {
        match score {
            Score::Centipawns(cp) => Self::Centipawns(cp),
            Score::Mate(m) => Self::Mate(m as i32),
        }
    }
}

/// One item of an analysis stream.
#[derive(Debug, Clone)]
pub enum SearchUpdate {
    Progress(EngineInfo),
    /// Terminal item. The stream closes after it.
    BestMove(Option<Move>),
}

/// Time limits for one search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchLimits {
    /// Fixed budget for this move.
    pub move_time: Duration,
    pub white_time: Option<Duration>,
    pub black_time: Option<Duration>,
    pub moves_to_go: Option<u32>,
}

impl SearchLimits {
    pub fn move_time(move_time: Duration) -> Self {
        Self {
            move_time,
            ..Default::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine executable not found")]
    NotFound,
    #[error("Failed to spawn engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("UCI protocol error: {0}")]
    Protocol(#[from] UciError),
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("Engine closed its output")]
    Closed,
}

/// A chess engine analysing positions asynchronously.
///
/// At most one analysis runs at a time; callers stop or drain the previous
/// stream before starting another.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Start analysing `position`. Progress arrives on the returned channel,
    /// terminated by a single [`SearchUpdate::BestMove`]. A channel that
    /// closes without one means the search failed.
    async fn start_analysis(
        &self,
        position: &Board,
        limits: &SearchLimits,
    ) -> Result<mpsc::Receiver<SearchUpdate>, EngineError>;

    /// Ask the running analysis to finish as soon as possible.
    async fn stop(&self) -> Result<(), EngineError>;

    /// Terminate the engine. Implementations force-kill if it does not exit.
    async fn quit(&self) -> Result<(), EngineError>;
}
