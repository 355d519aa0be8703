use crate::locate::find_engine_path;
use crate::uci::{format_command, parse_uci_message, UciMessage};
use crate::{
    EngineCommand, EngineError, EngineEvent, GoParams, SearchEngine, SearchLimits, SearchUpdate,
};
use async_trait::async_trait;
use cozy_chess::Board;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::{mpsc, Mutex};

/// Configuration for spawning and tuning the engine process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit executable; discovered with [`find_engine_path`] when unset.
    pub path: Option<PathBuf>,
    pub skill_level: Option<u8>,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
    /// Bound on every handshake step (`uciok`, `readyok`) and on waiting
    /// for the previous search to release the output stream.
    pub handshake_timeout: Duration,
    /// How long `quit` waits for the process to exit before killing it.
    pub quit_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            skill_level: None,
            threads: None,
            hash_mb: None,
            handshake_timeout: Duration::from_secs(10),
            quit_timeout: Duration::from_secs(1),
        }
    }
}

/// A UCI engine running as a child process.
///
/// Output is read by a single background task and turned into
/// [`EngineEvent`]s. Each analysis takes exclusive ownership of the event
/// stream until its `bestmove` arrives, so a late answer to a stopped search
/// can never be mistaken for the answer to the next one.
pub struct ProcessEngine {
    process: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    events: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
    config: EngineConfig,
}

impl ProcessEngine {
    /// Spawn the engine and complete the UCI handshake.
    #[tracing::instrument(level = "info", skip_all, fields(path = ?config.path))]
    pub async fn spawn(config: EngineConfig) -> Result<Self, EngineError> {
        let path = find_engine_path(config.path.as_deref()).ok_or(EngineError::NotFound)?;
        tracing::info!("Found engine at: {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let stdin = process.stdin.take().ok_or(EngineError::Closed)?;
        let stdout = process.stdout.take().ok_or(EngineError::Closed)?;

        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(64);
        tokio::spawn(read_output(stdout, event_tx));

        let engine = Self {
            process: Mutex::new(process),
            stdin: Mutex::new(stdin),
            events: Arc::new(Mutex::new(event_rx)),
            config,
        };

        engine.send(&EngineCommand::Uci).await?;
        {
            let mut events = engine.events.lock().await;
            wait_ready(&mut events, engine.config.handshake_timeout, "uciok").await?;
        }

        for (name, value) in engine.option_commands() {
            tracing::info!("Setting {} to {}", name, value);
            engine
                .send(&EngineCommand::SetOption {
                    name: name.to_string(),
                    value: Some(value),
                })
                .await?;
        }

        engine.send(&EngineCommand::IsReady).await?;
        {
            let mut events = engine.events.lock().await;
            wait_ready(&mut events, engine.config.handshake_timeout, "readyok").await?;
        }

        tracing::info!("Engine spawned and initialized successfully");
        Ok(engine)
    }

    fn option_commands(&self) -> Vec<(&'static str, String)> {
        let mut options = Vec::new();
        if let Some(level) = self.config.skill_level {
            options.push(("Skill Level", level.min(20).to_string()));
        }
        if let Some(threads) = self.config.threads {
            options.push(("Threads", threads.clamp(1, 16).to_string()));
        }
        if let Some(hash_mb) = self.config.hash_mb {
            options.push(("Hash", hash_mb.clamp(1, 2048).to_string()));
        }
        options
    }

    async fn send(&self, cmd: &EngineCommand) -> Result<(), EngineError> {
        let line = format_command(cmd);
        tracing::trace!("UCI >> {}", line.trim_end());
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SearchEngine for ProcessEngine {
    async fn start_analysis(
        &self,
        position: &Board,
        limits: &SearchLimits,
    ) -> Result<mpsc::Receiver<SearchUpdate>, EngineError> {
        // Held until this search's bestmove has been forwarded.
        let mut events = tokio::time::timeout(
            self.config.handshake_timeout,
            self.events.clone().lock_owned(),
        )
        .await
        .map_err(|_| EngineError::Timeout("previous search to finish"))?;

        // Flush anything a previous, stopped search left behind.
        self.send(&EngineCommand::IsReady).await?;
        wait_ready(&mut events, self.config.handshake_timeout, "readyok").await?;

        let fen = position.to_string();
        let go = GoParams::from(limits);
        tracing::info!(
            "Starting analysis: FEN={}, movetime={:?}ms",
            fen,
            go.movetime
        );
        self.send(&EngineCommand::SetPosition { fen, moves: vec![] })
            .await?;
        self.send(&EngineCommand::Go(go)).await?;

        let (update_tx, update_rx) = mpsc::channel(32);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    EngineEvent::Info(info) => {
                        // The consumer may have gone away; keep draining to bestmove.
                        let _ = update_tx.send(SearchUpdate::Progress(info)).await;
                    }
                    EngineEvent::BestMove(mv) => {
                        let _ = update_tx.send(SearchUpdate::BestMove(mv)).await;
                        return;
                    }
                    EngineEvent::Ready => {}
                }
            }
            tracing::warn!("Engine output closed during analysis");
        });

        Ok(update_rx)
    }

    async fn stop(&self) -> Result<(), EngineError> {
        tracing::debug!("Sending stop command to engine");
        self.send(&EngineCommand::Stop).await
    }

    async fn quit(&self) -> Result<(), EngineError> {
        tracing::info!("Sending quit command to engine");
        if let Err(e) = self.send(&EngineCommand::Quit).await {
            tracing::warn!("Failed to send quit: {}", e);
        }

        let mut process = self.process.lock().await;
        match tokio::time::timeout(self.config.quit_timeout, process.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!("Engine exited with {}", status);
                Ok(())
            }
            Ok(Err(e)) => Err(EngineError::Io(e)),
            Err(_) => {
                tracing::warn!("Engine did not exit in time, killing it");
                process.kill().await?;
                Ok(())
            }
        }
    }
}

/// Output reader task. Sole producer of engine events.
async fn read_output(stdout: ChildStdout, event_tx: mpsc::Sender<EngineEvent>) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                tracing::warn!("Engine stdout EOF - engine closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                tracing::trace!("UCI << {}", trimmed);

                let event = match parse_uci_message(trimmed) {
                    Ok(UciMessage::UciOk) | Ok(UciMessage::ReadyOk) => EngineEvent::Ready,
                    Ok(UciMessage::BestMove { mv, .. }) => {
                        tracing::debug!("Received bestmove: {:?}", mv);
                        EngineEvent::BestMove(mv)
                    }
                    Ok(UciMessage::Info(info)) => EngineEvent::Info(info),
                    Ok(UciMessage::Id { name, value }) => {
                        tracing::debug!("Engine id {}: {}", name, value);
                        continue;
                    }
                    Err(e) => {
                        tracing::trace!("Ignoring engine line: {}", e);
                        continue;
                    }
                };

                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Error reading from engine stdout: {}", e);
                break;
            }
        }
    }
    tracing::info!("Output reader task exiting");
}

/// Discard events until the engine acknowledges with `uciok`/`readyok`.
async fn wait_ready(
    events: &mut mpsc::Receiver<EngineEvent>,
    timeout: Duration,
    what: &'static str,
) -> Result<(), EngineError> {
    let wait = async {
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Ready => return Ok(()),
                EngineEvent::BestMove(mv) => {
                    tracing::debug!("Discarding leftover bestmove {:?}", mv);
                }
                EngineEvent::Info(_) => {}
            }
        }
        Err(EngineError::Closed)
    };
    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| EngineError::Timeout(what))?
}
