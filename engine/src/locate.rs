use std::path::{Path, PathBuf};

/// Engine binary shipped alongside the executable.
#[cfg(windows)]
const BUNDLED_ENGINE: &str = "cincinnatus_windows_release.exe";
#[cfg(not(windows))]
const BUNDLED_ENGINE: &str = "cincinnatus_linux_release";

/// Find an engine executable.
///
/// Lookup order: the explicit path if it exists, then `engines/<bundled>`
/// next to the running executable (or its parent directory), then common
/// Stockfish install locations and finally `stockfish` on `PATH`.
pub fn find_engine_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        tracing::warn!("Configured engine path {:?} does not exist", path);
    }

    if let Some(path) = bundled_engine_path() {
        return Some(path);
    }

    find_stockfish_path()
}

fn bundled_engine_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let exe_dir = exe.parent()?;
    for dir in [Some(exe_dir), exe_dir.parent()].into_iter().flatten() {
        let candidate = dir.join("engines").join(BUNDLED_ENGINE);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Find Stockfish executable in common locations
fn find_stockfish_path() -> Option<PathBuf> {
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];

    if let Some(path) = paths.iter().map(Path::new).find(|p| p.is_file()) {
        return Some(path.to_path_buf());
    }

    // In PATH; probe it since there is no file to check
    std::process::Command::new("stockfish")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .arg("quit")
        .status()
        .ok()
        .map(|_| PathBuf::from("stockfish"))
}
