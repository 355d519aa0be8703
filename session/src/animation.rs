//! Animation gate: a move waits here, sliding across the board, before it
//! is allowed to touch the authoritative position.

use chess::{castle_rook_move, is_promotion, king_destination};
use cozy_chess::{Board, Color, Move, Piece, Square};
use std::time::Duration;

/// "Ease out" curve: fast start, soft landing.
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * (2.0 - t)
}

/// One piece sliding from one square to another.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceAnimation {
    pub piece: Piece,
    pub color: Color,
    pub from: Square,
    pub to: Square,
    elapsed: Duration,
    duration: Duration,
}

impl PieceAnimation {
    pub fn new(piece: Piece, color: Color, from: Square, to: Square, duration: Duration) -> Self {
        Self {
            piece,
            color,
            from,
            to,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Eased progress in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        ease_out(self.elapsed.as_secs_f32() / self.duration.as_secs_f32())
    }

    /// Current position in board coordinates (file, rank), each `0.0..=7.0`.
    pub fn position(&self) -> (f32, f32) {
        let t = self.progress();
        let lerp = |a: usize, b: usize| a as f32 + (b as f32 - a as f32) * t;
        (
            lerp(self.from.file() as usize, self.to.file() as usize),
            lerp(self.from.rank() as usize, self.to.rank() as usize),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOrigin {
    Human,
    Engine,
}

/// Where a staged move is in the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    /// Not advanced yet.
    Staged,
    Animating,
    /// Animation finished; the human still has to pick a promotion piece.
    AwaitingPromotion,
    /// Ready to commit.
    Ready,
}

/// A legal move waiting for its animation (and possibly a promotion
/// choice) before commit.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedMove {
    /// Castles use the king-onto-rook encoding. A human promotion carries
    /// `promotion: None` until the piece is chosen.
    pub mv: Move,
    pub origin: MoveOrigin,
    pub mover: Color,
    pub is_promotion: bool,
    /// King and rook for a castle, the moving piece otherwise.
    pub animations: Vec<PieceAnimation>,
}

impl StagedMove {
    /// Build the staged move and its animations. `mv` must be legal (or a
    /// legal promotion with the piece left out) in `board`.
    pub(crate) fn new(board: &Board, mv: Move, origin: MoveOrigin, duration: Duration) -> Self {
        let mover = board.side_to_move();
        let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);

        let mut animations = vec![PieceAnimation::new(
            piece,
            mover,
            mv.from,
            king_destination(board, mv),
            duration,
        )];
        if let Some((rook_from, rook_to)) = castle_rook_move(board, mv) {
            animations.push(PieceAnimation::new(
                Piece::Rook,
                mover,
                rook_from,
                rook_to,
                duration,
            ));
        }

        Self {
            mv,
            origin,
            mover,
            is_promotion: is_promotion(board, mv),
            animations,
        }
    }

    /// Advance every sub-animation. Returns true once all are done.
    pub fn advance(&mut self, dt: Duration) -> bool {
        for animation in &mut self.animations {
            animation.advance(dt);
        }
        self.animations_done()
    }

    pub fn animations_done(&self) -> bool {
        self.animations.iter().all(PieceAnimation::is_done)
    }

    pub fn awaiting_promotion_choice(&self) -> bool {
        self.is_promotion && self.mv.promotion.is_none()
    }

    pub fn phase(&self) -> GatePhase {
        if !self.animations_done() {
            let started = self.animations.iter().any(|a| a.elapsed > Duration::ZERO);
            return if started {
                GatePhase::Animating
            } else {
                GatePhase::Staged
            };
        }
        if self.awaiting_promotion_choice() {
            GatePhase::AwaitingPromotion
        } else {
            GatePhase::Ready
        }
    }
}
