//! Rules queries over a cozy-chess [`Board`].
//!
//! cozy-chess encodes castling as "king takes own rook" (e1h1). Helpers here
//! that care about where pieces visually land ([`king_destination`],
//! [`castle_rook_move`]) translate from that encoding.

use cozy_chess::{Board, Color, File, Move, Piece, Rank, Square};

/// Promotion options in the order they are offered to the player.
pub const PROMOTION_CHOICES: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Knight, Piece::Bishop];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

/// All legal moves in the position.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// Legal moves whose origin is `from`.
pub fn legal_moves_from(board: &Board, from: Square) -> Vec<Move> {
    legal_moves(board)
        .into_iter()
        .filter(|mv| mv.from == from)
        .collect()
}

/// Apply a legal move, returning the resulting position.
pub fn apply(board: &Board, mv: Move) -> Result<Board, RulesError> {
    if !legal_moves(board).contains(&mv) {
        return Err(RulesError::IllegalMove(crate::format_uci_move(mv)));
    }
    let mut next = board.clone();
    next.play_unchecked(mv);
    Ok(next)
}

/// Piece and color standing on `square`.
pub fn piece_at(board: &Board, square: Square) -> Option<(Piece, Color)> {
    Some((board.piece_on(square)?, board.color_on(square)?))
}

/// The side to move is checkmated.
pub fn is_checkmate(board: &Board) -> bool {
    !board.checkers().is_empty() && legal_moves(board).is_empty()
}

/// The side to move has no legal move and is not in check.
pub fn is_stalemate(board: &Board) -> bool {
    board.checkers().is_empty() && legal_moves(board).is_empty()
}

/// Neither side can possibly deliver mate: bare kings, a single minor piece,
/// or only bishops that all stand on the same square color.
pub fn is_insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }

    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    let minors = knights.len() + bishops.len();
    if minors <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }

    let mut colors = bishops.into_iter().map(is_light_square);
    match colors.next() {
        Some(first) => colors.all(|c| c == first),
        None => true,
    }
}

fn is_light_square(sq: Square) -> bool {
    (sq.file() as usize + sq.rank() as usize) % 2 == 1
}

/// The move takes an enemy piece, including en passant.
pub fn is_capture(board: &Board, mv: Move) -> bool {
    let mover = board.side_to_move();
    if board.color_on(mv.to) == Some(!mover) {
        return true;
    }
    board.piece_on(mv.from) == Some(Piece::Pawn)
        && mv.from.file() != mv.to.file()
        && board.piece_on(mv.to).is_none()
}

/// The move is a castle in cozy-chess encoding (king onto its own rook).
pub fn is_castling(board: &Board, mv: Move) -> bool {
    let mover = board.side_to_move();
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.from) == Some(mover)
        && board.piece_on(mv.to) == Some(Piece::Rook)
        && board.color_on(mv.to) == Some(mover)
}

/// A pawn move onto the last rank for the side to move.
pub fn is_promotion(board: &Board, mv: Move) -> bool {
    if board.piece_on(mv.from) != Some(Piece::Pawn) {
        return false;
    }
    let last = match board.side_to_move() {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    };
    mv.to.rank() == last
}

/// Square the moving king lands on; for any other move, `mv.to`.
pub fn king_destination(board: &Board, mv: Move) -> Square {
    if !is_castling(board, mv) {
        return mv.to;
    }
    let file = if mv.to.file() > mv.from.file() {
        File::G
    } else {
        File::C
    };
    Square::new(file, mv.from.rank())
}

/// Rook relocation `(from, to)` that accompanies a castle.
pub fn castle_rook_move(board: &Board, mv: Move) -> Option<(Square, Square)> {
    if !is_castling(board, mv) {
        return None;
    }
    let file = if mv.to.file() > mv.from.file() {
        File::F
    } else {
        File::D
    };
    Some((mv.to, Square::new(file, mv.from.rank())))
}

/// Playing `mv` puts the opponent in check.
pub fn gives_check(board: &Board, mv: Move) -> bool {
    match apply(board, mv) {
        Ok(next) => !next.checkers().is_empty(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fen;

    fn sq(s: &str) -> Square {
        crate::parse_square(s).unwrap()
    }

    fn mv(from: &str, to: &str) -> Move {
        Move {
            from: sq(from),
            to: sq(to),
            promotion: None,
        }
    }

    #[test]
    fn test_start_position_has_twenty_moves() {
        assert_eq!(legal_moves(&Board::default()).len(), 20);
        assert_eq!(legal_moves_from(&Board::default(), sq("g1")).len(), 2);
    }

    #[test]
    fn test_apply_rejects_illegal_move() {
        let board = Board::default();
        assert!(apply(&board, mv("e2", "e5")).is_err());
        let next = apply(&board, mv("e2", "e4")).unwrap();
        assert_eq!(next.side_to_move(), Color::Black);
        assert_eq!(piece_at(&next, sq("e4")), Some((Piece::Pawn, Color::White)));
    }

    #[test]
    fn test_fools_mate_is_checkmate() {
        let board = parse_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        assert!(is_checkmate(&board));
        assert!(!is_stalemate(&board));
    }

    #[test]
    fn test_stalemate() {
        let board = parse_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(is_stalemate(&board));
        assert!(!is_checkmate(&board));
    }

    #[test]
    fn test_insufficient_material() {
        let bare = parse_fen("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();
        assert!(is_insufficient_material(&bare));

        let knight = parse_fen("8/8/4k3/8/8/4KN2/8/8 w - - 0 1").unwrap();
        assert!(is_insufficient_material(&knight));

        // c1 and f8 are both dark squares
        let same_bishops = parse_fen("5b2/8/4k3/8/8/4K3/8/2B5 w - - 0 1").unwrap();
        assert!(is_insufficient_material(&same_bishops));

        let opposite_bishops = parse_fen("2b5/8/4k3/8/8/4K3/8/2B5 w - - 0 1").unwrap();
        assert!(!is_insufficient_material(&opposite_bishops));

        let pawn = parse_fen("8/8/4k3/8/8/4K3/4P3/8 w - - 0 1").unwrap();
        assert!(!is_insufficient_material(&pawn));
    }

    #[test]
    fn test_castling_geometry() {
        let board = parse_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let short = mv("e1", "h1");
        assert!(legal_moves(&board).contains(&short));
        assert!(is_castling(&board, short));
        assert!(!is_capture(&board, short));
        assert_eq!(king_destination(&board, short), sq("g1"));
        assert_eq!(castle_rook_move(&board, short), Some((sq("h1"), sq("f1"))));

        let long = mv("e1", "a1");
        assert_eq!(king_destination(&board, long), sq("c1"));
        assert_eq!(castle_rook_move(&board, long), Some((sq("a1"), sq("d1"))));

        let after = apply(&board, short).unwrap();
        assert_eq!(piece_at(&after, sq("g1")), Some((Piece::King, Color::White)));
        assert_eq!(piece_at(&after, sq("f1")), Some((Piece::Rook, Color::White)));
    }

    #[test]
    fn test_en_passant_is_capture() {
        let board = parse_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        assert!(is_capture(&board, mv("e5", "d6")));
        assert!(!is_capture(&board, mv("e5", "e6")));
    }

    #[test]
    fn test_promotion_detection() {
        let white = parse_fen("8/4P2k/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(is_promotion(&white, mv("e7", "e8")));

        let black = parse_fen("4k3/8/8/8/8/8/4p3/K7 b - - 0 1").unwrap();
        assert!(is_promotion(&black, mv("e2", "e1")));

        let knight = parse_fen("4k3/4N3/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(!is_promotion(&knight, mv("e7", "g8")));
    }

    #[test]
    fn test_gives_check() {
        let board = parse_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        assert!(gives_check(&board, mv("a1", "a8")));
        assert!(!gives_check(&board, mv("a1", "a2")));
    }
}
