use chess::{is_castling, is_promotion, king_destination, legal_moves_from};
use cozy_chess::{Board, Color, Move, Square};

/// Click-to-move selection for the human player.
///
/// Purely local to the input path; the session is consulted only when a
/// target is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    NoSelection,
    Source {
        square: Square,
        /// Legal moves from `square`.
        moves: Vec<Move>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Selected(Square),
    Deselected,
    Ignored,
    /// A target was chosen. Promotions come back with `promotion: None`.
    Move(Move),
}

impl Selection {
    pub fn clear(&mut self) {
        *self = Self::NoSelection;
    }

    pub fn source(&self) -> Option<Square> {
        match self {
            Self::NoSelection => None,
            Self::Source { square, .. } => Some(*square),
        }
    }

    /// Squares to highlight as destinations. A castle shows where the king
    /// lands.
    pub fn targets(&self, board: &Board) -> Vec<Square> {
        let Self::Source { moves, .. } = self else {
            return Vec::new();
        };
        let mut targets = Vec::new();
        for mv in moves {
            let target = king_destination(board, *mv);
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    /// Handle a click on `square` by `player` in `board`.
    pub fn click(&mut self, board: &Board, player: Color, square: Square) -> ClickOutcome {
        if board.side_to_move() != player {
            self.clear();
            return ClickOutcome::Ignored;
        }

        let (source, chosen) = match self {
            Self::NoSelection => return self.select(board, player, square),
            Self::Source {
                square: source,
                moves,
            } => (
                *source,
                moves
                    .iter()
                    .find(|mv| king_destination(board, **mv) == square)
                    .copied(),
            ),
        };

        if source == square {
            self.clear();
            return ClickOutcome::Deselected;
        }

        if let Some(mv) = chosen {
            self.clear();
            let mv = if is_promotion(board, mv) && !is_castling(board, mv) {
                Move {
                    promotion: None,
                    ..mv
                }
            } else {
                mv
            };
            return ClickOutcome::Move(mv);
        }

        match self.select(board, player, square) {
            ClickOutcome::Ignored => {
                self.clear();
                ClickOutcome::Deselected
            }
            outcome => outcome,
        }
    }

    fn select(&mut self, board: &Board, player: Color, square: Square) -> ClickOutcome {
        if board.color_on(square) != Some(player) {
            return ClickOutcome::Ignored;
        }
        *self = Self::Source {
            square,
            moves: legal_moves_from(board, square),
        };
        ClickOutcome::Selected(square)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{parse_fen, parse_square};

    fn sq(s: &str) -> Square {
        parse_square(s).unwrap()
    }

    #[test]
    fn test_select_and_move() {
        let board = Board::default();
        let mut selection = Selection::default();
        assert_eq!(
            selection.click(&board, Color::White, sq("e2")),
            ClickOutcome::Selected(sq("e2"))
        );
        assert_eq!(selection.targets(&board), vec![sq("e3"), sq("e4")]);
        assert_eq!(
            selection.click(&board, Color::White, sq("e4")),
            ClickOutcome::Move(Move {
                from: sq("e2"),
                to: sq("e4"),
                promotion: None
            })
        );
        assert_eq!(selection, Selection::NoSelection);
    }

    #[test]
    fn test_click_empty_square_without_selection_is_ignored() {
        let board = Board::default();
        let mut selection = Selection::default();
        assert_eq!(
            selection.click(&board, Color::White, sq("e4")),
            ClickOutcome::Ignored
        );
        assert_eq!(
            selection.click(&board, Color::White, sq("e7")),
            ClickOutcome::Ignored
        );
    }

    #[test]
    fn test_reselect_own_piece() {
        let board = Board::default();
        let mut selection = Selection::default();
        selection.click(&board, Color::White, sq("e2"));
        assert_eq!(
            selection.click(&board, Color::White, sq("g1")),
            ClickOutcome::Selected(sq("g1"))
        );
        assert_eq!(selection.source(), Some(sq("g1")));
    }

    #[test]
    fn test_same_square_deselects() {
        let board = Board::default();
        let mut selection = Selection::default();
        selection.click(&board, Color::White, sq("e2"));
        assert_eq!(
            selection.click(&board, Color::White, sq("e2")),
            ClickOutcome::Deselected
        );
        assert_eq!(selection.source(), None);
    }

    #[test]
    fn test_illegal_target_deselects() {
        let board = Board::default();
        let mut selection = Selection::default();
        selection.click(&board, Color::White, sq("e2"));
        assert_eq!(
            selection.click(&board, Color::White, sq("e5")),
            ClickOutcome::Deselected
        );
        assert_eq!(
            selection.click(&board, Color::White, sq("b1")),
            ClickOutcome::Selected(sq("b1"))
        );
        assert_eq!(
            selection.click(&board, Color::White, sq("e7")),
            ClickOutcome::Deselected
        );
    }

    #[test]
    fn test_not_players_turn() {
        let board = Board::default();
        let mut selection = Selection::default();
        assert_eq!(
            selection.click(&board, Color::Black, sq("e7")),
            ClickOutcome::Ignored
        );
    }

    #[test]
    fn test_castle_by_king_destination() {
        let board = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mut selection = Selection::default();
        selection.click(&board, Color::White, sq("e1"));
        assert!(selection.targets(&board).contains(&sq("g1")));
        assert_eq!(
            selection.click(&board, Color::White, sq("g1")),
            ClickOutcome::Move(Move {
                from: sq("e1"),
                to: sq("h1"),
                promotion: None
            })
        );
    }

    #[test]
    fn test_click_own_rook_with_king_selected_reselects() {
        let board = parse_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let mut selection = Selection::default();
        selection.click(&board, Color::White, sq("e1"));
        assert!(!selection.targets(&board).contains(&sq("h1")));
        assert_eq!(
            selection.click(&board, Color::White, sq("h1")),
            ClickOutcome::Selected(sq("h1"))
        );
        assert_eq!(selection.source(), Some(sq("h1")));

        selection.click(&board, Color::White, sq("e1"));
        assert_eq!(
            selection.click(&board, Color::White, sq("a1")),
            ClickOutcome::Selected(sq("a1"))
        );
    }

    #[test]
    fn test_promotion_target_leaves_piece_open() {
        let board = parse_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        let mut selection = Selection::default();
        selection.click(&board, Color::White, sq("e7"));
        assert_eq!(selection.targets(&board), vec![sq("e8")]);
        match selection.click(&board, Color::White, sq("e8")) {
            ClickOutcome::Move(mv) => {
                assert_eq!(mv.to, sq("e8"));
                assert_eq!(mv.promotion, None);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
