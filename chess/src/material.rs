//! Captured-material bookkeeping: how many of each piece a side has lost
//! relative to the initial army.

use cozy_chess::{Board, Color, Piece};

/// Pieces tracked by the material table. Kings never leave the board.
pub const TRACKED_PIECES: [Piece; 5] = [
    Piece::Pawn,
    Piece::Knight,
    Piece::Bishop,
    Piece::Rook,
    Piece::Queen,
];

const INITIAL_COUNTS: [u8; 5] = [8, 2, 2, 2, 1];

/// Absent-piece counts per side, indexed like [`TRACKED_PIECES`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsentPieces {
    white: [u8; 5],
    black: [u8; 5],
}

impl AbsentPieces {
    /// Count missing pieces. Promoted pieces can push a count above its
    /// initial value; such surpluses clamp to zero absent.
    pub fn from_board(board: &Board) -> Self {
        let mut absent = Self::default();
        for (idx, piece) in TRACKED_PIECES.iter().enumerate() {
            for color in [Color::White, Color::Black] {
                let present = board.colored_pieces(color, *piece).len();
                let missing = (INITIAL_COUNTS[idx] as u32).saturating_sub(present) as u8;
                match color {
                    Color::White => absent.white[idx] = missing,
                    Color::Black => absent.black[idx] = missing,
                }
            }
        }
        absent
    }

    /// Number of `piece` that `color` has lost. Always zero for kings.
    pub fn count(&self, color: Color, piece: Piece) -> u8 {
        let Some(idx) = TRACKED_PIECES.iter().position(|p| *p == piece) else {
            return 0;
        };
        match color {
            Color::White => self.white[idx],
            Color::Black => self.black[idx],
        }
    }

    /// `(piece, count)` pairs with a non-zero count, pawn first.
    pub fn missing(&self, color: Color) -> Vec<(Piece, u8)> {
        TRACKED_PIECES
            .iter()
            .map(|p| (*p, self.count(color, *p)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fen;

    #[test]
    fn test_start_position_has_nothing_missing() {
        let absent = AbsentPieces::from_board(&Board::default());
        assert_eq!(absent, AbsentPieces::default());
        assert!(absent.missing(Color::White).is_empty());
    }

    #[test]
    fn test_counts_missing_pieces() {
        // White lost the queen and a pawn, black lost both knights
        let board = parse_fen("r1b1kb1r/pppppppp/8/8/8/8/PPPPPPP1/RNB1KBNR w KQkq - 0 1").unwrap();
        let absent = AbsentPieces::from_board(&board);
        assert_eq!(absent.count(Color::White, Piece::Queen), 1);
        assert_eq!(absent.count(Color::White, Piece::Pawn), 1);
        assert_eq!(absent.count(Color::Black, Piece::Knight), 2);
        assert_eq!(absent.count(Color::Black, Piece::Queen), 1);
        assert_eq!(absent.count(Color::White, Piece::King), 0);
        assert_eq!(
            absent.missing(Color::Black),
            vec![(Piece::Knight, 2), (Piece::Queen, 1)]
        );
    }

    #[test]
    fn test_promotion_surplus_clamps_to_zero() {
        let board = parse_fen("4k3/8/8/8/8/8/8/QQ2K3 w - - 0 1").unwrap();
        let absent = AbsentPieces::from_board(&board);
        assert_eq!(absent.count(Color::White, Piece::Queen), 0);
        assert_eq!(absent.count(Color::White, Piece::Pawn), 8);
    }
}
