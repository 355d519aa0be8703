//! UCI (Universal Chess Interface) move notation

use cozy_chess::{Board, Move, Piece};

use crate::converters::{format_piece, format_square};
use crate::rules::{is_castling, king_destination, legal_moves};

/// Map a standard UCI castle (king moves two files, e1g1) onto the cozy-chess
/// encoding (king onto its rook, e1h1). Any other move is returned unchanged.
pub fn normalize_castling(board: &Board, mv: Move) -> Move {
    if board.piece_on(mv.from) != Some(Piece::King) || mv.promotion.is_some() {
        return mv;
    }
    let distance = (mv.from.file() as i8 - mv.to.file() as i8).abs();
    if distance != 2 || mv.from.rank() != mv.to.rank() {
        return mv;
    }

    legal_moves(board)
        .into_iter()
        .find(|candidate| {
            candidate.from == mv.from
                && is_castling(board, *candidate)
                && king_destination(board, *candidate) == mv.to
        })
        .unwrap_or(mv)
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_fen, parse_square};
    use cozy_chess::{File, Rank, Square};

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_normalize_black_long_castle() {
        let board = parse_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R b KQkq - 0 1").unwrap();
        let uci = Move {
            from: parse_square("e8").unwrap(),
            to: parse_square("c8").unwrap(),
            promotion: None,
        };
        let normalized = normalize_castling(&board, uci);
        assert_eq!(normalized.to, parse_square("a8").unwrap());
    }

    #[test]
    fn test_normalize_leaves_ordinary_king_move() {
        let board = parse_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let step = Move {
            from: parse_square("e1").unwrap(),
            to: parse_square("f1").unwrap(),
            promotion: None,
        };
        assert_eq!(normalize_castling(&board, step), step);
    }

    proptest::proptest! {
        #[test]
        fn normalize_recovers_every_legal_move(choices in proptest::collection::vec(0usize..64, 0..60)) {
            let mut board = Board::default();
            for choice in choices {
                let moves = legal_moves(&board);
                if moves.is_empty() {
                    break;
                }
                for mv in &moves {
                    let written = Move {
                        to: king_destination(&board, *mv),
                        ..*mv
                    };
                    proptest::prop_assert_eq!(normalize_castling(&board, written), *mv);
                }
                let mv = moves[choice % moves.len()];
                board = crate::apply(&board, mv).unwrap();
            }
        }
    }
}
