//! Engine evaluation score.

use std::cmp::Ordering;
use std::fmt;

/// Value used for a mate score when ordering against centipawns.
const MATE_VALUE: i32 = 30_000;

/// Evaluation from one side's point of view.
///
/// `Centipawns(n)`: positive favours that side. `Mate(n)`: that side mates
/// in `n` moves when positive, is mated in `-n` moves when negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisScore {
    Centipawns(i32),
    Mate(i32),
}

impl AnalysisScore {
    /// Same evaluation seen by the opponent.
    pub fn negate(self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    /// Single number for comparisons; a nearer mate is worth more.
    pub fn to_cp(self) -> i32 {
        match self {
            Self::Centipawns(cp) => cp,
            Self::Mate(m) if m > 0 => MATE_VALUE - m * 100,
            Self::Mate(m) => -MATE_VALUE - m * 100,
        }
    }

    /// Whether the side this score belongs to is ahead, level or behind.
    pub fn advantage(self) -> Ordering {
        self.to_cp().cmp(&0)
    }
}

impl fmt::Display for AnalysisScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Centipawns(cp) => write!(f, "{:+.2}", cp as f64 / 100.0),
            Self::Mate(m) if m > 0 => write!(f, "+M{}", m),
            Self::Mate(m) => write!(f, "-M{}", m.abs()),
        }
    }
}
