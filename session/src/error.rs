use cozy_chess::Piece;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Game is not in progress")]
    NotPlaying,
    #[error("Game is in progress; stop it first")]
    GameInProgress,
    #[error("Not the human player's turn")]
    NotYourTurn,
    #[error("Not the engine's turn")]
    NotEngineTurn,
    #[error("A move is already pending")]
    MovePending,
    #[error("No promotion is awaiting a choice")]
    NoPromotionPending,
    #[error("Cannot promote to {0:?}")]
    InvalidPromotion(Piece),
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    #[error("Engine is already thinking")]
    EngineBusy,
    #[error("Session is shutting down")]
    ShuttingDown,
}

/// Why a background search ended without a move to stage.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    #[error("engine gave no final move within {0:?}")]
    Deadline(Duration),
    #[error("engine stream ended without a final move")]
    NoResult,
    #[error("engine reported no move")]
    NoMove,
    #[error("engine move rejected: {0}")]
    Rejected(SessionError),
}
