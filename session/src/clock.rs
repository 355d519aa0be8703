use cozy_chess::Color;
use std::time::{Duration, Instant};

/// Remaining time per side.
///
/// Time is charged to whichever side the caller says is on move. The clock
/// itself knows nothing about game status; the session decides whether it
/// is running on each tick.
#[derive(Debug, Clone)]
pub struct Clock {
    white_remaining: Duration,
    black_remaining: Duration,
    last_tick: Instant,
}

impl Clock {
    pub fn new(initial: Duration, now: Instant) -> Self {
        Self {
            white_remaining: initial,
            black_remaining: initial,
            last_tick: now,
        }
    }

    pub fn reset(&mut self, initial: Duration, now: Instant) {
        *self = Self::new(initial, now);
    }

    pub fn remaining(&self, color: Color) -> Duration {
        match color {
            Color::White => self.white_remaining,
            Color::Black => self.black_remaining,
        }
    }

    fn remaining_mut(&mut self, color: Color) -> &mut Duration {
        match color {
            Color::White => &mut self.white_remaining,
            Color::Black => &mut self.black_remaining,
        }
    }

    /// Charge the time since the last tick to `side`.
    ///
    /// The timestamp is refreshed even when `running` is false so that
    /// resuming does not charge the paused interval. Returns `side` only on
    /// the tick its clock reaches zero.
    pub fn tick(&mut self, now: Instant, side: Color, running: bool) -> Option<Color> {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        if !running {
            return None;
        }

        let remaining = self.remaining_mut(side);
        if remaining.is_zero() {
            return None;
        }
        *remaining = remaining.saturating_sub(elapsed);
        remaining.is_zero().then_some(side)
    }

    pub fn add_increment(&mut self, side: Color, increment: Duration) {
        let remaining = self.remaining_mut(side);
        *remaining = remaining.saturating_add(increment);
    }

    /// A side whose clock is at zero, White checked first.
    pub fn flagged(&self) -> Option<Color> {
        [Color::White, Color::Black]
            .into_iter()
            .find(|c| self.remaining(*c).is_zero())
    }
}

/// `MM:SS`, rounded to the nearest second.
pub fn format_time(time: Duration) -> String {
    let secs = time.as_secs_f64().round() as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
