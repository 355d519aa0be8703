//! Runtime configuration for the chessgate binary.
//!
//! Every value has a compile-time default and can be overridden through an
//! environment variable. Command-line flags take precedence over both.

use std::path::PathBuf;

/// Default directory for rolling log files.
const DEFAULT_LOG_DIR: &str = "logs";

/// Default upper bound on engine thinking time per move (in milliseconds).
const DEFAULT_MOVE_TIME_MS: u64 = 1000;

/// Default frame rate of the session loop.
const DEFAULT_FPS: u32 = 60;

/// Get the engine executable path.
///
/// Priority:
/// 1. `CHESSGATE_ENGINE_PATH` env variable if set
/// 2. `None`, letting engine discovery search the usual locations
pub fn get_engine_path() -> Option<PathBuf> {
    std::env::var("CHESSGATE_ENGINE_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// Get the log directory.
///
/// Priority:
/// 1. `CHESSGATE_LOG_DIR` env variable if set
/// 2. `./logs` as fallback
pub fn get_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSGATE_LOG_DIR") {
        return PathBuf::from(dir);
    }

    PathBuf::from(DEFAULT_LOG_DIR)
}

/// Get the engine move time in milliseconds.
///
/// Priority:
/// 1. `CHESSGATE_MOVE_TIME_MS` env variable if set (falls back to default
///    if the value cannot be parsed as a `u64`)
/// 2. `1000` ms as fallback
pub fn get_move_time_ms() -> u64 {
    if let Ok(ms) = std::env::var("CHESSGATE_MOVE_TIME_MS") {
        return ms.parse().unwrap_or(DEFAULT_MOVE_TIME_MS);
    }

    DEFAULT_MOVE_TIME_MS
}

/// Get the frame rate of the session loop.
///
/// Priority:
/// 1. `CHESSGATE_FPS` env variable if set (falls back to default if the
///    value is not a positive integer)
/// 2. `60` as fallback
pub fn get_fps() -> u32 {
    if let Ok(fps) = std::env::var("CHESSGATE_FPS") {
        return fps.parse().ok().filter(|f| *f > 0).unwrap_or(DEFAULT_FPS);
    }

    DEFAULT_FPS
}

#[cfg(test)]
mod tests {
    use super::*;

    // These assume the CHESSGATE_* variables are unset in the test
    // environment; if set, the override is the correct answer.

    #[test]
    fn test_get_log_dir_default() {
        if std::env::var("CHESSGATE_LOG_DIR").is_err() {
            assert_eq!(get_log_dir(), PathBuf::from("logs"));
        }
    }

    #[test]
    fn test_get_move_time_default() {
        if std::env::var("CHESSGATE_MOVE_TIME_MS").is_err() {
            assert_eq!(get_move_time_ms(), 1000);
        }
    }

    #[test]
    fn test_get_fps_default() {
        if std::env::var("CHESSGATE_FPS").is_err() {
            assert_eq!(get_fps(), 60);
        }
    }
}
