//! Background search coordination.
//!
//! At most one search task is alive at a time. It analyses a snapshot of
//! the position, streams telemetry, and hands its final move back to the
//! session only if the game it was started for is still the current one.

use chess::{format_uci_move, normalize_castling};
use cozy_chess::{Board, Move};
use engine::{SearchEngine, SearchLimits, SearchUpdate};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::animation::MoveOrigin;
use crate::error::{SearchError, SessionError};
use crate::state::SessionState;
use crate::telemetry::SearchTelemetry;

/// How a search task ended.
#[derive(Debug)]
enum SearchOutcome {
    Staged(Move),
    /// Superseded, stopped or shut down before a usable result.
    Stale,
}

/// Everything the search task shares with the controller.
#[derive(Clone)]
struct SearchContext {
    engine: Arc<dyn SearchEngine>,
    state: Arc<Mutex<SessionState>>,
    telemetry: Arc<Mutex<SearchTelemetry>>,
    thinking: Arc<AtomicBool>,
    cancel: Arc<Notify>,
    last_failure: Arc<Mutex<Option<Instant>>>,
    animation: Duration,
    response_grace: Duration,
}

impl SearchContext {
    fn is_stale(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.force_quit() || !state.is_playing() || state.search_generation() != generation
    }

    async fn run(self, generation: u64, snapshot: Board, limits: SearchLimits) {
        match self.search(generation, &snapshot, &limits).await {
            Ok(SearchOutcome::Staged(mv)) => {
                tracing::info!("Engine move {} staged", format_uci_move(mv));
            }
            Ok(SearchOutcome::Stale) => {
                tracing::debug!("Search superseded, result discarded");
            }
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                *self.last_failure.lock() = Some(Instant::now());
            }
        }
        self.thinking.store(false, Ordering::SeqCst);
    }

    async fn search(
        &self,
        generation: u64,
        snapshot: &Board,
        limits: &SearchLimits,
    ) -> Result<SearchOutcome, SearchError> {
        let mut updates = self.engine.start_analysis(snapshot, limits).await?;
        let deadline_after = limits.move_time + self.response_grace;
        let deadline = tokio::time::sleep(deadline_after);
        tokio::pin!(deadline);

        loop {
            if self.is_stale(generation) {
                self.stop_engine().await;
                return Ok(SearchOutcome::Stale);
            }

            tokio::select! {
                _ = self.cancel.notified() => continue,
                _ = &mut deadline => {
                    self.stop_engine().await;
                    return Err(SearchError::Deadline(deadline_after));
                }
                update = updates.recv() => match update {
                    Some(SearchUpdate::Progress(info)) => {
                        if self.is_stale(generation) {
                            self.stop_engine().await;
                            return Ok(SearchOutcome::Stale);
                        }
                        let mut telemetry = self.telemetry.lock();
                        if telemetry.generation == generation {
                            telemetry.update(&info);
                        }
                    }
                    Some(SearchUpdate::BestMove(mv)) => return self.try_stage(generation, mv),
                    None => return Err(SearchError::NoResult),
                },
            }
        }
    }

    /// Stage the engine's answer if, under the session lock, the search is
    /// still current and the move is legal in the live position.
    fn try_stage(&self, generation: u64, mv: Option<Move>) -> Result<SearchOutcome, SearchError> {
        let mut state = self.state.lock();
        if state.search_generation() != generation
            || state.force_quit()
            || !state.is_playing()
            || state.pending().is_some()
        {
            return Ok(SearchOutcome::Stale);
        }

        let mv = mv.ok_or(SearchError::NoMove)?;
        let mv = normalize_castling(state.position(), mv);
        state
            .stage(mv, MoveOrigin::Engine, self.animation)
            .map_err(SearchError::Rejected)?;
        Ok(SearchOutcome::Staged(mv))
    }

    async fn stop_engine(&self) {
        if let Err(e) = self.engine.stop().await {
            tracing::warn!("Failed to stop engine: {}", e);
        }
    }
}

/// Owns the background search task and the engine.
pub(crate) struct SearchCoordinator {
    ctx: SearchContext,
    runtime: Handle,
    task: Mutex<Option<JoinHandle<()>>>,
    retry_backoff: Duration,
    shutdown_timeout: Duration,
}

pub(crate) struct CoordinatorConfig {
    pub animation: Duration,
    pub response_grace: Duration,
    pub retry_backoff: Duration,
    pub shutdown_timeout: Duration,
}

impl SearchCoordinator {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        state: Arc<Mutex<SessionState>>,
        telemetry: Arc<Mutex<SearchTelemetry>>,
        runtime: Handle,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            ctx: SearchContext {
                engine,
                state,
                telemetry,
                thinking: Arc::new(AtomicBool::new(false)),
                cancel: Arc::new(Notify::new()),
                last_failure: Arc::new(Mutex::new(None)),
                animation: config.animation,
                response_grace: config.response_grace,
            },
            runtime,
            task: Mutex::new(None),
            retry_backoff: config.retry_backoff,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    pub fn is_thinking(&self) -> bool {
        self.ctx.thinking.load(Ordering::SeqCst)
    }

    /// Whether enough time has passed since the last failed search.
    pub fn backoff_elapsed(&self, now: Instant) -> bool {
        match *self.ctx.last_failure.lock() {
            Some(failed_at) => now.saturating_duration_since(failed_at) >= self.retry_backoff,
            None => true,
        }
    }

    /// Launch a search for the engine's turn. `limits` is computed by the
    /// caller from the clocks.
    pub fn request(
        &self,
        limits: impl FnOnce(&SessionState) -> SearchLimits,
    ) -> Result<u64, SessionError> {
        if self
            .ctx
            .thinking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::EngineBusy);
        }

        let prepared = {
            let mut state = self.ctx.state.lock();
            match check_can_search(&state) {
                Ok(()) => {
                    let generation = state.bump_generation();
                    Ok((generation, state.position().clone(), limits(&*state)))
                }
                Err(e) => Err(e),
            }
        };
        let (generation, snapshot, limits) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                self.ctx.thinking.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        self.ctx
            .telemetry
            .lock()
            .begin(generation, snapshot.side_to_move());
        tracing::info!(
            generation,
            "Requesting engine move, budget {:?}",
            limits.move_time
        );

        let span = tracing::info_span!("search", generation);
        let handle = self
            .runtime
            .spawn(self.ctx.clone().run(generation, snapshot, limits).instrument(span));
        *self.task.lock() = Some(handle);
        Ok(generation)
    }

    /// Wake the search task so it notices a generation bump right away.
    pub fn cancel(&self) {
        if self.is_thinking() {
            self.ctx.cancel.notify_one();
        }
    }

    /// Mark the session as quitting, wait (bounded) for the search task,
    /// then terminate the engine.
    pub async fn shutdown(&self) {
        self.ctx.state.lock().set_force_quit();
        self.ctx.cancel.notify_one();

        let task = self.task.lock().take();
        if let Some(mut task) = task {
            if tokio::time::timeout(self.shutdown_timeout, &mut task)
                .await
                .is_err()
            {
                tracing::warn!(
                    "Search task did not stop within {:?}, aborting it",
                    self.shutdown_timeout
                );
                task.abort();
                self.ctx.thinking.store(false, Ordering::SeqCst);
            }
        }

        match tokio::time::timeout(self.shutdown_timeout, self.ctx.engine.quit()).await {
            Ok(Ok(())) => tracing::info!("Engine shut down"),
            Ok(Err(e)) => tracing::warn!("Engine quit failed: {}", e),
            Err(_) => tracing::warn!("Engine quit timed out"),
        }
    }
}

/// Preconditions for a new search, checked under the session lock.
fn check_can_search(state: &SessionState) -> Result<(), SessionError> {
    if state.force_quit() {
        return Err(SessionError::ShuttingDown);
    }
    if !state.is_playing() {
        return Err(SessionError::NotPlaying);
    }
    if state.is_human_turn() {
        return Err(SessionError::NotEngineTurn);
    }
    if state.pending().is_some() {
        return Err(SessionError::MovePending);
    }
    Ok(())
}
