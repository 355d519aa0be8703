//! Scripted in-memory engine for tests.
//!
//! Each `start_analysis` call consumes the next [`Script`]; once the queue
//! is empty the fallback script is used (by default: play the first legal
//! move immediately).

use crate::{EngineError, EngineInfo, SearchEngine, SearchLimits, SearchUpdate};
use async_trait::async_trait;
use cozy_chess::{Board, Move};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Behaviour of one scripted analysis.
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream `infos`, wait `delay`, then answer `best`.
    Reply {
        infos: Vec<EngineInfo>,
        best: Option<Move>,
        delay: Duration,
    },
    /// Answer with the first legal move of the analysed position after `delay`.
    FirstLegal { delay: Duration },
    /// Stream `infos`, then block until `stop` is called and answer `best`.
    HangUntilStop {
        infos: Vec<EngineInfo>,
        best: Option<Move>,
    },
    /// Close the stream without a best move.
    Silent,
    /// Refuse to start.
    Fail,
}

/// Recorded interactions, for assertions.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    /// FEN of every analysed position, in order.
    pub starts: Vec<String>,
    pub limits: Vec<SearchLimits>,
    pub stops: usize,
    pub quits: usize,
}

pub struct ScriptedEngine {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Script,
    calls: Arc<Mutex<CallLog>>,
    /// Wake-up for the analysis currently blocked in `HangUntilStop`.
    hanging: Mutex<Option<Arc<Notify>>>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ScriptedEngine {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            fallback: Script::FirstLegal {
                delay: Duration::ZERO,
            },
            calls: Arc::new(Mutex::new(CallLog::default())),
            hanging: Mutex::new(None),
        }
    }

    pub fn with_fallback(mut self, fallback: Script) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().push_back(script);
    }

    pub fn calls(&self) -> CallLog {
        self.calls.lock().clone()
    }

    fn release_hanging(&self) {
        if let Some(signal) = self.hanging.lock().take() {
            signal.notify_one();
        }
    }
}

#[async_trait]
impl SearchEngine for ScriptedEngine {
    async fn start_analysis(
        &self,
        position: &Board,
        limits: &SearchLimits,
    ) -> Result<mpsc::Receiver<SearchUpdate>, EngineError> {
        let script = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        {
            let mut calls = self.calls.lock();
            calls.starts.push(position.to_string());
            calls.limits.push(limits.clone());
        }

        let (tx, rx) = mpsc::channel(16);
        match script {
            Script::Fail => return Err(EngineError::Closed),
            Script::Silent => drop(tx),
            Script::Reply { infos, best, delay } => {
                tokio::spawn(async move {
                    for info in infos {
                        let _ = tx.send(SearchUpdate::Progress(info)).await;
                    }
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(SearchUpdate::BestMove(best)).await;
                });
            }
            Script::FirstLegal { delay } => {
                let mut best = None;
                position.generate_moves(|moves| {
                    best = moves.into_iter().next();
                    best.is_some()
                });
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(SearchUpdate::BestMove(best)).await;
                });
            }
            Script::HangUntilStop { infos, best } => {
                let stop_signal = Arc::new(Notify::new());
                *self.hanging.lock() = Some(stop_signal.clone());
                tokio::spawn(async move {
                    for info in infos {
                        let _ = tx.send(SearchUpdate::Progress(info)).await;
                    }
                    stop_signal.notified().await;
                    let _ = tx.send(SearchUpdate::BestMove(best)).await;
                });
            }
        }
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), EngineError> {
        self.calls.lock().stops += 1;
        self.release_hanging();
        Ok(())
    }

    async fn quit(&self) -> Result<(), EngineError> {
        self.calls.lock().quits += 1;
        self.release_hanging();
        Ok(())
    }
}
