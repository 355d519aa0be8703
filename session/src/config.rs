//! Session tunables.
//!
//! Every value has a default matching the desktop game; the binary may
//! override them from the command line or environment.

use cozy_chess::Color;
use std::time::Duration;

/// Time controls offered by the start menu: 1, 5 and 10 minutes.
pub const TIME_CONTROL_PRESETS: [Duration; 3] = [
    Duration::from_secs(60),
    Duration::from_secs(5 * 60),
    Duration::from_secs(10 * 60),
];

const DEFAULT_TIME_CONTROL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_MOVE_TIME: Duration = Duration::from_secs(1);
const DEFAULT_MOVES_TO_GO: u32 = 30;
const DEFAULT_MIN_MOVE_TIME: Duration = Duration::from_millis(50);
const DEFAULT_RESPONSE_GRACE: Duration = Duration::from_secs(5);
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Clock time used when a game is started without explicit settings.
    pub default_time_control: Duration,
    /// Upper bound on the engine's thinking time per move.
    pub move_time: Duration,
    /// Horizon used to spread the remaining clock over future moves.
    pub moves_to_go: u32,
    /// Floor on the engine's thinking time, even in time trouble.
    pub min_move_time: Duration,
    /// Extra time past the move budget before a silent engine is abandoned.
    pub response_grace: Duration,
    /// Pause after a failed search before the engine is asked again.
    pub retry_backoff: Duration,
    /// Bound on waiting for the search task during shutdown.
    pub shutdown_timeout: Duration,
    /// Length of one piece-slide animation.
    pub animation_duration: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_time_control: DEFAULT_TIME_CONTROL,
            move_time: DEFAULT_MOVE_TIME,
            moves_to_go: DEFAULT_MOVES_TO_GO,
            min_move_time: DEFAULT_MIN_MOVE_TIME,
            response_grace: DEFAULT_RESPONSE_GRACE,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            animation_duration: DEFAULT_ANIMATION_DURATION,
        }
    }
}

impl SessionConfig {
    /// Thinking time for an engine with `remaining` on its clock: an even
    /// share of the clock over `moves_to_go` moves, capped at `move_time`
    /// and floored at `min_move_time`.
    pub fn time_budget(&self, remaining: Duration) -> Duration {
        let share = remaining / self.moves_to_go.max(1);
        let floor = self.min_move_time.min(self.move_time);
        share.min(self.move_time).max(floor)
    }
}

/// Choices made before a game starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    pub human_side: Color,
    pub time_control: Duration,
    /// Added to the mover's clock after every move.
    pub increment: Duration,
    /// Starting position; the standard one when `None`.
    pub start_fen: Option<String>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            human_side: Color::White,
            time_control: DEFAULT_TIME_CONTROL,
            increment: Duration::ZERO,
            start_fen: None,
        }
    }
}

impl GameSettings {
    pub fn new(human_side: Color, time_control: Duration) -> Self {
        Self {
            human_side,
            time_control,
            ..Default::default()
        }
    }

    pub fn engine_side(&self) -> Color {
        !self.human_side
    }
}
