use chess::{AbsentPieces, PROMOTION_CHOICES};
use cozy_chess::{Board, Color, Move, Piece, Square};
use std::time::Duration;

use crate::animation::{MoveOrigin, PieceAnimation};
use crate::clock::format_time;
use crate::status::GameStatus;

/// Staged move as the renderer needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSnapshot {
    pub mv: Move,
    pub origin: MoveOrigin,
    pub animations: Vec<PieceAnimation>,
    pub awaiting_promotion: bool,
}

/// Everything one frame needs to draw, copied out under the lock.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub position: Board,
    pub fen: String,
    pub side_to_move: Color,
    pub human_side: Color,
    pub status: GameStatus,
    pub white_remaining: Duration,
    pub black_remaining: Duration,
    pub pending: Option<PendingSnapshot>,
    pub selected: Option<Square>,
    pub targets: Vec<Square>,
    pub absent: AbsentPieces,
    pub last_move: Option<Move>,
    pub move_count: usize,
    pub search_generation: u64,
    pub engine_thinking: bool,
}

impl SessionSnapshot {
    pub fn remaining(&self, color: Color) -> Duration {
        match color {
            Color::White => self.white_remaining,
            Color::Black => self.black_remaining,
        }
    }

    pub fn clock_text(&self, color: Color) -> String {
        format_time(self.remaining(color))
    }

    /// Black at the bottom when the human plays Black.
    pub fn board_flipped(&self) -> bool {
        self.human_side == Color::Black
    }

    /// Promotion table to show, with the promoting side's colour.
    pub fn promotion_choices(&self) -> Option<(Color, [Piece; 4])> {
        match &self.pending {
            Some(p) if p.awaiting_promotion => Some((self.side_to_move, PROMOTION_CHOICES)),
            _ => None,
        }
    }
}
