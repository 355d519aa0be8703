use chess::{format_uci_move, normalize_castling};
use cozy_chess::{Color, Move, Piece, Square};
use engine::{SearchEngine, SearchLimits};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

use crate::animation::MoveOrigin;
use crate::config::{GameSettings, SessionConfig};
use crate::error::SessionError;
use crate::search::{CoordinatorConfig, SearchCoordinator};
use crate::selection::{ClickOutcome, Selection};
use crate::snapshot::{PendingSnapshot, SessionSnapshot};
use crate::state::{CommitRecord, SessionState};
use crate::telemetry::SearchTelemetry;

/// What happened during one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Side whose flag fell this frame.
    pub flagged: Option<Color>,
    pub committed: Option<CommitRecord>,
    /// Generation of a search launched this frame.
    pub search_started: Option<u64>,
}

/// Intent-level entry point for the render/input loop.
///
/// All methods except [`shutdown`](Self::shutdown) are synchronous and only
/// hold the session lock briefly; engine I/O happens on a background task
/// spawned on `runtime`.
pub struct SessionController {
    config: SessionConfig,
    state: Arc<Mutex<SessionState>>,
    telemetry: Arc<Mutex<SearchTelemetry>>,
    search: SearchCoordinator,
    selection: Selection,
}

impl SessionController {
    pub fn new(config: SessionConfig, engine: Arc<dyn SearchEngine>, runtime: Handle) -> Self {
        let state = Arc::new(Mutex::new(SessionState::new(
            config.default_time_control,
            Instant::now(),
        )));
        let telemetry = Arc::new(Mutex::new(SearchTelemetry::default()));
        let search = SearchCoordinator::new(
            engine,
            state.clone(),
            telemetry.clone(),
            runtime,
            CoordinatorConfig {
                animation: config.animation_duration,
                response_grace: config.response_grace,
                retry_backoff: config.retry_backoff,
                shutdown_timeout: config.shutdown_timeout,
            },
        );
        Self {
            config,
            state,
            telemetry,
            search,
            selection: Selection::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start a new game. Refused while a game is in progress.
    pub fn start_game(&mut self, settings: GameSettings) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock();
            if state.force_quit() {
                return Err(SessionError::ShuttingDown);
            }
            if state.is_playing() {
                return Err(SessionError::GameInProgress);
            }
            state.reset(&settings, Instant::now())?;
        }
        self.search.cancel();
        self.selection.clear();
        self.telemetry.lock().reset();
        tracing::info!(
            "Game started: human plays {:?}, {:?} + {:?}",
            settings.human_side,
            settings.time_control,
            settings.increment
        );
        Ok(())
    }

    /// Playing -> Paused. Returns false if no game was running.
    pub fn stop_game(&mut self) -> bool {
        let stopped = self.state.lock().pause();
        if stopped {
            self.search.cancel();
            self.selection.clear();
            tracing::info!("Game stopped");
        }
        stopped
    }

    /// Feed a board click from the human.
    pub fn click(&mut self, square: Square) -> Result<ClickOutcome, SessionError> {
        let board = {
            let state = self.state.lock();
            check_human_can_move(&state)?;
            state.position().clone()
        };
        let human = board.side_to_move();

        match self.selection.click(&board, human, square) {
            ClickOutcome::Move(mv) => {
                self.stage_human(mv)?;
                Ok(ClickOutcome::Move(mv))
            }
            outcome => Ok(outcome),
        }
    }

    /// Stage a human move given directly (e.g. typed as UCI). Standard
    /// castling notation (e1g1) is accepted; a promotion without a piece
    /// waits for [`choose_promotion`](Self::choose_promotion).
    pub fn attempt_move(&mut self, mv: Move) -> Result<(), SessionError> {
        self.selection.clear();
        self.stage_human(mv)
    }

    fn stage_human(&mut self, mv: Move) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        let mv = normalize_castling(state.position(), mv);
        state.stage(mv, MoveOrigin::Human, self.config.animation_duration)?;
        tracing::debug!("Human move {} staged", format_uci_move(mv));
        Ok(())
    }

    pub fn choose_promotion(&mut self, piece: Piece) -> Result<Option<CommitRecord>, SessionError> {
        let record = self.state.lock().resolve_promotion(piece)?;
        if let Some(record) = &record {
            self.after_commit(record);
        }
        Ok(record)
    }

    pub fn cancel_promotion(&mut self) -> Result<(), SessionError> {
        let discarded = self.state.lock().cancel_promotion()?;
        tracing::debug!(
            "Promotion {} cancelled",
            format_uci_move(discarded.mv)
        );
        Ok(())
    }

    /// Ask the engine for a move. Requires the engine's turn, no staged move
    /// and no search already running.
    pub fn trigger_engine_move(&mut self) -> Result<u64, SessionError> {
        let config = &self.config;
        self.search.request(|state| {
            let engine_side = state.side_to_move();
            let clock = state.clock();
            SearchLimits {
                move_time: config.time_budget(clock.remaining(engine_side)),
                white_time: Some(clock.remaining(Color::White)),
                black_time: Some(clock.remaining(Color::Black)),
                moves_to_go: Some(config.moves_to_go),
            }
        })
    }

    /// Per-frame update with the current wall clock.
    pub fn tick(&mut self, dt: Duration) -> FrameReport {
        self.tick_at(dt, Instant::now())
    }

    /// Per-frame update: clocks, then the animation gate, then the engine.
    pub fn tick_at(&mut self, dt: Duration, now: Instant) -> FrameReport {
        let mut report = FrameReport::default();
        let engine_may_move = {
            let mut state = self.state.lock();
            report.flagged = state.tick_clock(now);
            report.committed = state.advance_gate(dt);
            state.is_playing()
                && !state.is_human_turn()
                && state.pending().is_none()
                && !state.force_quit()
        };

        if let Some(loser) = report.flagged {
            tracing::info!("{:?} lost on time", loser);
            self.search.cancel();
            self.selection.clear();
        }
        if let Some(record) = report.committed.clone() {
            self.after_commit(&record);
        }

        if engine_may_move && !self.search.is_thinking() && self.search.backoff_elapsed(now) {
            match self.trigger_engine_move() {
                Ok(generation) => report.search_started = Some(generation),
                Err(e) => tracing::debug!("Engine not started: {}", e),
            }
        }
        report
    }

    fn after_commit(&mut self, record: &CommitRecord) {
        if record.status.is_terminal() {
            tracing::info!("Game over: {}", record.status);
            self.search.cancel();
            self.selection.clear();
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        let position = state.position().clone();
        SessionSnapshot {
            fen: position.to_string(),
            side_to_move: position.side_to_move(),
            human_side: state.human_side(),
            status: state.status(),
            white_remaining: state.clock().remaining(Color::White),
            black_remaining: state.clock().remaining(Color::Black),
            pending: state.pending().map(|p| PendingSnapshot {
                mv: p.mv,
                origin: p.origin,
                animations: p.animations.clone(),
                awaiting_promotion: p.awaiting_promotion_choice(),
            }),
            selected: self.selection.source(),
            targets: self.selection.targets(&position),
            absent: *state.absent(),
            last_move: state.history().last().copied(),
            move_count: state.history().len(),
            search_generation: state.search_generation(),
            engine_thinking: self.search.is_thinking(),
            position,
        }
    }

    pub fn telemetry(&self) -> SearchTelemetry {
        self.telemetry.lock().clone()
    }

    pub fn is_thinking(&self) -> bool {
        self.search.is_thinking()
    }

    /// Stop everything: no further moves are accepted, the search task is
    /// awaited (bounded) and the engine is terminated.
    pub async fn shutdown(&self) {
        tracing::info!("Session shutting down");
        self.search.shutdown().await;
    }
}

fn check_human_can_move(state: &SessionState) -> Result<(), SessionError> {
    if state.force_quit() {
        return Err(SessionError::ShuttingDown);
    }
    if !state.is_playing() {
        return Err(SessionError::NotPlaying);
    }
    if !state.is_human_turn() {
        return Err(SessionError::NotYourTurn);
    }
    if state.pending().is_some() {
        return Err(SessionError::MovePending);
    }
    Ok(())
}
