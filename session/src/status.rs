use cozy_chess::Color;
use std::fmt;

/// Lifecycle of a game. Every variant other than `Paused` and `Playing` is
/// terminal; only starting a new game leaves a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameStatus {
    #[default]
    Paused,
    Playing,
    /// White delivered mate.
    CheckmateWhite,
    /// Black delivered mate.
    CheckmateBlack,
    Stalemate,
    InsufficientMaterial,
    /// White's flag fell.
    TimeoutWhite,
    /// Black's flag fell.
    TimeoutBlack,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Paused | Self::Playing)
    }

    pub fn checkmate_by(winner: Color) -> Self {
        match winner {
            Color::White => Self::CheckmateWhite,
            Color::Black => Self::CheckmateBlack,
        }
    }

    pub fn timeout_of(loser: Color) -> Self {
        match loser {
            Color::White => Self::TimeoutWhite,
            Color::Black => Self::TimeoutBlack,
        }
    }

    /// Winning side, if the game ended decisively.
    pub fn winner(self) -> Option<Color> {
        match self {
            Self::CheckmateWhite | Self::TimeoutBlack => Some(Color::White),
            Self::CheckmateBlack | Self::TimeoutWhite => Some(Color::Black),
            _ => None,
        }
    }

    /// Banner text for a finished game.
    pub fn message(self) -> Option<&'static str> {
        match self {
            Self::Paused | Self::Playing => None,
            Self::CheckmateWhite => Some("White won. Checkmate"),
            Self::CheckmateBlack => Some("Black won. Checkmate"),
            Self::Stalemate => Some("Draw by Stalemate"),
            Self::InsufficientMaterial => Some("Draw by Insufficient material"),
            Self::TimeoutWhite => Some("White lost on time"),
            Self::TimeoutBlack => Some("Black lost on time"),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => f.write_str(msg),
            None if *self == Self::Playing => f.write_str("Playing"),
            None => f.write_str("Paused"),
        }
    }
}
