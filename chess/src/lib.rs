//! Rules layer over `cozy-chess`.
//!
//! Everything the session needs to know about chess lives here: legal moves,
//! applying a move, terminal-condition predicates, move classification
//! (capture, castle, promotion) and the text formats used on the engine wire.

pub mod analysis;
pub mod converters;
pub mod fen;
pub mod material;
pub mod rules;
pub mod uci;

pub use analysis::AnalysisScore;
pub use converters::*;
pub use fen::{format_fen, parse_fen, FenError};
pub use material::AbsentPieces;
pub use rules::{
    apply, castle_rook_move, gives_check, is_capture, is_castling, is_checkmate,
    is_insufficient_material, is_promotion, is_stalemate, king_destination, legal_moves,
    legal_moves_from, piece_at, RulesError, PROMOTION_CHOICES,
};
pub use uci::{format_uci_move, normalize_castling};

pub use cozy_chess::{Board, Color, File, Move, Piece, Rank, Square};
