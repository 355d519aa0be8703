//! Game session controller.
//!
//! One [`SessionController`] owns the authoritative game: a lock-protected
//! [`SessionState`] (position, status, clocks, the staged move and the
//! search generation), a separately locked [`SearchTelemetry`], and at most
//! one background search task. The render loop drives it through
//! [`SessionController::tick`] and the intent-level operations; it never
//! blocks on the engine.

mod animation;
mod clock;
mod config;
mod controller;
mod error;
mod search;
mod selection;
mod snapshot;
mod state;
mod status;
mod telemetry;

pub use animation::{ease_out, GatePhase, MoveOrigin, PieceAnimation, StagedMove};
pub use clock::{format_time, Clock};
pub use config::{GameSettings, SessionConfig, TIME_CONTROL_PRESETS};
pub use controller::{FrameReport, SessionController};
pub use error::{SearchError, SessionError};
pub use selection::{ClickOutcome, Selection};
pub use snapshot::{PendingSnapshot, SessionSnapshot};
pub use state::{CommitRecord, SessionState};
pub use status::GameStatus;
pub use telemetry::SearchTelemetry;
