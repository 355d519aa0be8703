use chess::{
    apply, format_uci_move, is_capture, is_castling, is_checkmate, is_insufficient_material,
    is_promotion, is_stalemate, legal_moves, parse_fen, AbsentPieces, PROMOTION_CHOICES,
};
use cozy_chess::{Board, Color, Move, Piece};
use std::time::{Duration, Instant};

use crate::animation::{MoveOrigin, StagedMove};
use crate::clock::Clock;
use crate::config::GameSettings;
use crate::error::SessionError;
use crate::status::GameStatus;

/// What a commit did, for sounds and highlights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub mv: Move,
    pub mover: Color,
    pub origin: MoveOrigin,
    pub captured: Option<Piece>,
    pub is_castle: bool,
    pub gives_check: bool,
    /// Status after the move.
    pub status: GameStatus,
}

/// The authoritative game. Lives behind the session lock; nothing here
/// does I/O.
#[derive(Debug, Clone)]
pub struct SessionState {
    position: Board,
    status: GameStatus,
    clock: Clock,
    pending: Option<StagedMove>,
    search_generation: u64,
    force_quit: bool,
    human_side: Color,
    increment: Duration,
    absent: AbsentPieces,
    history: Vec<Move>,
}

impl SessionState {
    /// Paused at the starting position with full clocks.
    pub fn new(time_control: Duration, now: Instant) -> Self {
        let position = Board::default();
        Self {
            absent: AbsentPieces::from_board(&position),
            position,
            status: GameStatus::Paused,
            clock: Clock::new(time_control, now),
            pending: None,
            search_generation: 0,
            force_quit: false,
            human_side: Color::White,
            increment: Duration::ZERO,
            history: Vec::new(),
        }
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn pending(&self) -> Option<&StagedMove> {
        self.pending.as_ref()
    }

    pub fn search_generation(&self) -> u64 {
        self.search_generation
    }

    pub fn force_quit(&self) -> bool {
        self.force_quit
    }

    pub fn human_side(&self) -> Color {
        self.human_side
    }

    pub fn absent(&self) -> &AbsentPieces {
        &self.absent
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn is_human_turn(&self) -> bool {
        self.side_to_move() == self.human_side
    }

    pub fn is_playing(&self) -> bool {
        self.status == GameStatus::Playing
    }

    /// Reinitialise in place for a new game and start playing.
    ///
    /// The generation is bumped so that anything still running against the
    /// previous game is stale.
    pub fn reset(&mut self, settings: &GameSettings, now: Instant) -> Result<(), SessionError> {
        if self.force_quit {
            return Err(SessionError::ShuttingDown);
        }
        let position = match settings.start_fen.as_deref() {
            Some(fen) => parse_fen(fen).map_err(|e| SessionError::InvalidFen(e.to_string()))?,
            None => Board::default(),
        };

        self.absent = AbsentPieces::from_board(&position);
        self.position = position;
        self.clock.reset(settings.time_control, now);
        self.pending = None;
        self.human_side = settings.human_side;
        self.increment = settings.increment;
        self.history.clear();
        self.bump_generation();
        self.status = GameStatus::Playing;
        // A start position can already be decided.
        self.status = self.evaluate_status();
        Ok(())
    }

    /// Playing -> Paused. Discards any staged move.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.status = GameStatus::Paused;
        self.pending = None;
        self.bump_generation();
        true
    }

    /// Invalidate any search in flight. Returns the new generation.
    pub fn bump_generation(&mut self) -> u64 {
        self.search_generation += 1;
        self.search_generation
    }

    pub fn set_force_quit(&mut self) {
        self.force_quit = true;
        self.pending = None;
        self.bump_generation();
    }

    /// Charge elapsed time to the side to move. On a flag fall the game ends
    /// on time, any staged move is dropped and the loser is returned.
    pub fn tick_clock(&mut self, now: Instant) -> Option<Color> {
        let side = self.side_to_move();
        let running = self.is_playing();
        let loser = self.clock.tick(now, side, running)?;
        self.status = GameStatus::timeout_of(loser);
        self.pending = None;
        self.bump_generation();
        Some(loser)
    }

    /// Stage a move into the animation gate.
    ///
    /// Human promotions may leave the piece out; the move then waits for
    /// [`resolve_promotion`](Self::resolve_promotion). Engine moves must be
    /// complete and legal as given.
    pub fn stage(
        &mut self,
        mv: Move,
        origin: MoveOrigin,
        animation: Duration,
    ) -> Result<(), SessionError> {
        if self.force_quit {
            return Err(SessionError::ShuttingDown);
        }
        if !self.is_playing() {
            return Err(SessionError::NotPlaying);
        }
        if self.pending.is_some() {
            return Err(SessionError::MovePending);
        }
        match origin {
            MoveOrigin::Human if !self.is_human_turn() => return Err(SessionError::NotYourTurn),
            MoveOrigin::Engine if self.is_human_turn() => {
                return Err(SessionError::NotEngineTurn)
            }
            _ => {}
        }

        let legal = legal_moves(&self.position);
        let allowed = legal.contains(&mv)
            || (origin == MoveOrigin::Human
                && mv.promotion.is_none()
                && is_promotion(&self.position, mv)
                && legal.iter().any(|m| m.from == mv.from && m.to == mv.to));
        if !allowed {
            return Err(SessionError::IllegalMove(format_uci_move(mv)));
        }

        self.pending = Some(StagedMove::new(&self.position, mv, origin, animation));
        Ok(())
    }

    /// Advance the staged move's animation and commit it once the gate
    /// opens.
    pub fn advance_gate(&mut self, dt: Duration) -> Option<CommitRecord> {
        let pending = self.pending.as_mut()?;
        if !pending.advance(dt) || pending.awaiting_promotion_choice() {
            return None;
        }
        self.commit()
    }

    /// Supply the missing promotion piece. Commits right away if the
    /// animation has already finished.
    pub fn resolve_promotion(&mut self, piece: Piece) -> Result<Option<CommitRecord>, SessionError> {
        if !PROMOTION_CHOICES.contains(&piece) {
            return Err(SessionError::InvalidPromotion(piece));
        }
        let pending = match self.pending.as_mut() {
            Some(p) if p.awaiting_promotion_choice() => p,
            _ => return Err(SessionError::NoPromotionPending),
        };

        let mv = Move {
            promotion: Some(piece),
            ..pending.mv
        };
        if !legal_moves(&self.position).contains(&mv) {
            return Err(SessionError::IllegalMove(format_uci_move(mv)));
        }
        pending.mv = mv;

        if pending.animations_done() {
            Ok(self.commit())
        } else {
            Ok(None)
        }
    }

    /// Drop a promotion that is waiting for its piece.
    pub fn cancel_promotion(&mut self) -> Result<StagedMove, SessionError> {
        match self.pending.take() {
            Some(p) if p.awaiting_promotion_choice() => Ok(p),
            other => {
                self.pending = other;
                Err(SessionError::NoPromotionPending)
            }
        }
    }

    /// Apply the staged move. The only path that mutates the position
    /// during a game.
    fn commit(&mut self) -> Option<CommitRecord> {
        let staged = self.pending.take()?;
        let mv = staged.mv;
        let next = match apply(&self.position, mv) {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!("Dropping staged move: {}", e);
                return None;
            }
        };

        let captured = if is_castling(&self.position, mv) {
            None
        } else if is_capture(&self.position, mv) {
            Some(self.position.piece_on(mv.to).unwrap_or(Piece::Pawn))
        } else {
            None
        };
        let is_castle = is_castling(&self.position, mv);
        let mover = staged.mover;

        self.position = next;
        self.history.push(mv);
        self.absent = AbsentPieces::from_board(&self.position);
        self.status = self.evaluate_status();
        if self.is_playing() {
            self.clock.add_increment(mover, self.increment);
        } else {
            self.bump_generation();
        }

        let record = CommitRecord {
            mv,
            mover,
            origin: staged.origin,
            captured,
            is_castle,
            gives_check: !self.position.checkers().is_empty(),
            status: self.status,
        };
        tracing::info!(
            "Committed {} by {:?} ({:?}), status {:?}",
            format_uci_move(mv),
            mover,
            staged.origin,
            self.status
        );
        Some(record)
    }

    /// Status of the current position, first match wins: checkmate,
    /// stalemate, insufficient material, a clock at zero.
    fn evaluate_status(&self) -> GameStatus {
        if is_checkmate(&self.position) {
            return GameStatus::checkmate_by(!self.side_to_move());
        }
        if is_stalemate(&self.position) {
            return GameStatus::Stalemate;
        }
        if is_insufficient_material(&self.position) {
            return GameStatus::InsufficientMaterial;
        }
        if let Some(loser) = self.clock.flagged() {
            return GameStatus::timeout_of(loser);
        }
        GameStatus::Playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::GatePhase;
    use chess::parse_square;
    use proptest::prelude::*;

    const ANIM: Duration = Duration::from_millis(150);

    fn mv(s: &str) -> Move {
        let promotion = s.chars().nth(4).and_then(chess::parse_piece);
        Move {
            from: parse_square(&s[0..2]).unwrap(),
            to: parse_square(&s[2..4]).unwrap(),
            promotion,
        }
    }

    fn playing(fen: Option<&str>, human_side: Color) -> SessionState {
        let now = Instant::now();
        let mut state = SessionState::new(Duration::from_secs(60), now);
        state
            .reset(
                &GameSettings {
                    human_side,
                    time_control: Duration::from_secs(60),
                    increment: Duration::ZERO,
                    start_fen: fen.map(str::to_string),
                },
                now,
            )
            .unwrap();
        state
    }

    #[test]
    fn test_new_state_is_paused() {
        let state = SessionState::new(Duration::from_secs(300), Instant::now());
        assert_eq!(state.status(), GameStatus::Paused);
        assert_eq!(state.clock().remaining(Color::White), Duration::from_secs(300));
        assert!(state.pending().is_none());
    }

    #[test]
    fn test_reset_bumps_generation() {
        let mut state = playing(None, Color::White);
        let before = state.search_generation();
        state
            .reset(&GameSettings::default(), Instant::now())
            .unwrap();
        assert!(state.search_generation() > before);
        assert!(state.is_playing());
    }

    #[test]
    fn test_reset_rejects_bad_fen() {
        let mut state = SessionState::new(Duration::from_secs(60), Instant::now());
        let settings = GameSettings {
            start_fen: Some("not a fen".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            state.reset(&settings, Instant::now()),
            Err(SessionError::InvalidFen(_))
        ));
        assert_eq!(state.status(), GameStatus::Paused);
    }

    #[test]
    fn test_stage_then_commit_after_animation() {
        let mut state = playing(None, Color::White);
        state.stage(mv("e2e4"), MoveOrigin::Human, ANIM).unwrap();
        assert!(state.advance_gate(Duration::from_millis(100)).is_none());
        assert_eq!(state.position(), &Board::default());

        let record = state.advance_gate(Duration::from_millis(50)).unwrap();
        assert_eq!(record.mv, mv("e2e4"));
        assert_eq!(record.mover, Color::White);
        assert_eq!(record.status, GameStatus::Playing);
        assert_eq!(state.side_to_move(), Color::Black);
        assert!(state.pending().is_none());
        assert_eq!(state.history(), &[mv("e2e4")]);
    }

    #[test]
    fn test_second_stage_rejected() {
        let mut state = playing(None, Color::White);
        state.stage(mv("e2e4"), MoveOrigin::Human, ANIM).unwrap();
        assert_eq!(
            state.stage(mv("d2d4"), MoveOrigin::Human, ANIM),
            Err(SessionError::MovePending)
        );
        assert_eq!(state.pending().unwrap().mv, mv("e2e4"));
    }

    #[test]
    fn test_stage_rejects_wrong_turn_and_illegal() {
        let mut state = playing(None, Color::White);
        assert_eq!(
            state.stage(mv("e7e5"), MoveOrigin::Engine, ANIM),
            Err(SessionError::NotEngineTurn)
        );
        assert!(matches!(
            state.stage(mv("e2e5"), MoveOrigin::Human, ANIM),
            Err(SessionError::IllegalMove(_))
        ));
    }

    #[test]
    fn test_stage_requires_playing() {
        let mut state = SessionState::new(Duration::from_secs(60), Instant::now());
        assert_eq!(
            state.stage(mv("e2e4"), MoveOrigin::Human, ANIM),
            Err(SessionError::NotPlaying)
        );
    }

    #[test]
    fn test_promotion_deferred_until_choice() {
        let mut state = playing(Some("8/4P3/8/8/8/8/k7/4K3 w - - 0 1"), Color::White);
        state.stage(mv("e7e8"), MoveOrigin::Human, ANIM).unwrap();
        assert!(state.pending().unwrap().awaiting_promotion_choice());

        assert!(state.advance_gate(Duration::from_secs(1)).is_none());
        assert_eq!(
            state.pending().unwrap().phase(),
            GatePhase::AwaitingPromotion
        );

        let record = state.resolve_promotion(Piece::Knight).unwrap().unwrap();
        assert_eq!(record.mv, mv("e7e8n"));
        assert_eq!(
            state.position().piece_on(parse_square("e8").unwrap()),
            Some(Piece::Knight)
        );
    }

    #[test]
    fn test_promotion_chosen_during_animation() {
        let mut state = playing(Some("8/4P3/8/8/8/8/k7/4K3 w - - 0 1"), Color::White);
        state.stage(mv("e7e8"), MoveOrigin::Human, ANIM).unwrap();
        assert_eq!(state.resolve_promotion(Piece::Queen), Ok(None));
        let record = state.advance_gate(ANIM).unwrap();
        assert_eq!(record.mv.promotion, Some(Piece::Queen));
    }

    #[test]
    fn test_promotion_rejects_king() {
        let mut state = playing(Some("8/4P3/8/8/8/8/k7/4K3 w - - 0 1"), Color::White);
        state.stage(mv("e7e8"), MoveOrigin::Human, ANIM).unwrap();
        assert_eq!(
            state.resolve_promotion(Piece::King),
            Err(SessionError::InvalidPromotion(Piece::King))
        );
    }

    #[test]
    fn test_cancel_promotion_discards() {
        let mut state = playing(Some("8/4P3/8/8/8/8/k7/4K3 w - - 0 1"), Color::White);
        state.stage(mv("e7e8"), MoveOrigin::Human, ANIM).unwrap();
        state.cancel_promotion().unwrap();
        assert!(state.pending().is_none());
        assert_eq!(state.side_to_move(), Color::White);
        assert_eq!(
            state.cancel_promotion().map(|_| ()),
            Err(SessionError::NoPromotionPending)
        );
    }

    #[test]
    fn test_engine_promotion_commits_without_choice() {
        let mut state = playing(Some("4k3/8/8/8/8/8/p7/4K3 b - - 0 1"), Color::White);
        state.stage(mv("a2a1q"), MoveOrigin::Engine, ANIM).unwrap();
        let record = state.advance_gate(ANIM).unwrap();
        assert_eq!(record.mv.promotion, Some(Piece::Queen));
        assert!(record.gives_check);
    }

    #[test]
    fn test_engine_promotion_requires_piece() {
        let mut state = playing(Some("4k3/8/8/8/8/8/p7/4K3 b - - 0 1"), Color::White);
        assert!(matches!(
            state.stage(mv("a2a1"), MoveOrigin::Engine, ANIM),
            Err(SessionError::IllegalMove(_))
        ));
    }

    #[test]
    fn test_castle_commits_both_pieces() {
        let mut state = playing(Some("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1"), Color::White);
        state.stage(mv("e1h1"), MoveOrigin::Human, ANIM).unwrap();
        let record = state.advance_gate(ANIM).unwrap();
        assert!(record.is_castle);
        assert_eq!(record.captured, None);
        let board = state.position();
        assert_eq!(board.piece_on(parse_square("g1").unwrap()), Some(Piece::King));
        assert_eq!(board.piece_on(parse_square("f1").unwrap()), Some(Piece::Rook));
    }

    #[test]
    fn test_capture_updates_absent_pieces() {
        let mut state = playing(
            Some("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2"),
            Color::White,
        );
        state.stage(mv("e4d5"), MoveOrigin::Human, ANIM).unwrap();
        let record = state.advance_gate(ANIM).unwrap();
        assert_eq!(record.captured, Some(Piece::Pawn));
        assert_eq!(state.absent().count(Color::Black, Piece::Pawn), 1);
        assert_eq!(state.absent().count(Color::White, Piece::Pawn), 0);
    }

    #[test]
    fn test_checkmate_ends_game() {
        let mut state = playing(
            Some("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2"),
            Color::White,
        );
        let before = state.search_generation();
        state.stage(mv("d8h4"), MoveOrigin::Engine, ANIM).unwrap();
        let record = state.advance_gate(ANIM).unwrap();
        assert_eq!(record.status, GameStatus::CheckmateBlack);
        assert_eq!(state.status(), GameStatus::CheckmateBlack);
        assert!(state.search_generation() > before);
    }

    #[test]
    fn test_checkmate_beats_flag() {
        let start = Instant::now();
        let mut state = playing(
            Some("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2"),
            Color::White,
        );
        state.stage(mv("d8h4"), MoveOrigin::Engine, ANIM).unwrap();
        // White's clock is at zero but it is Black's turn, so no flag yet.
        state.clock.tick(start, Color::White, true);
        state
            .clock
            .tick(start + Duration::from_secs(120), Color::White, true);
        let record = state.advance_gate(ANIM).unwrap();
        assert_eq!(record.status, GameStatus::CheckmateBlack);
    }

    #[test]
    fn test_stalemate_at_start_is_terminal() {
        let state = playing(Some("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1"), Color::White);
        assert_eq!(state.status(), GameStatus::Stalemate);
    }

    #[test]
    fn test_flag_fall_is_terminal() {
        let start = Instant::now();
        let mut state = playing(None, Color::White);
        state.stage(mv("e2e4"), MoveOrigin::Human, ANIM).unwrap();
        let generation = state.search_generation();

        assert_eq!(
            state.tick_clock(start + Duration::from_secs(61)),
            Some(Color::White)
        );
        assert_eq!(state.status(), GameStatus::TimeoutWhite);
        assert!(state.pending().is_none());
        assert!(state.search_generation() > generation);

        assert_eq!(state.tick_clock(start + Duration::from_secs(90)), None);
        assert_eq!(state.status(), GameStatus::TimeoutWhite);
        assert_eq!(
            state.stage(mv("e2e4"), MoveOrigin::Human, ANIM),
            Err(SessionError::NotPlaying)
        );
    }

    #[test]
    fn test_pause_only_from_playing() {
        let mut state = playing(None, Color::White);
        state.stage(mv("e2e4"), MoveOrigin::Human, ANIM).unwrap();
        assert!(state.pause());
        assert!(state.pending().is_none());
        assert_eq!(state.status(), GameStatus::Paused);
        assert!(!state.pause());
    }

    #[test]
    fn test_force_quit_blocks_staging_and_reset() {
        let mut state = playing(None, Color::White);
        state.set_force_quit();
        assert_eq!(
            state.stage(mv("e2e4"), MoveOrigin::Human, ANIM),
            Err(SessionError::ShuttingDown)
        );
        assert_eq!(
            state.reset(&GameSettings::default(), Instant::now()),
            Err(SessionError::ShuttingDown)
        );
    }

    #[test]
    fn test_increment_added_to_mover() {
        let now = Instant::now();
        let mut state = SessionState::new(Duration::from_secs(60), now);
        state
            .reset(
                &GameSettings {
                    increment: Duration::from_secs(2),
                    ..GameSettings::new(Color::White, Duration::from_secs(60))
                },
                now,
            )
            .unwrap();
        state.stage(mv("e2e4"), MoveOrigin::Human, ANIM).unwrap();
        state.advance_gate(ANIM).unwrap();
        assert_eq!(state.clock().remaining(Color::White), Duration::from_secs(62));
        assert_eq!(state.clock().remaining(Color::Black), Duration::from_secs(60));
    }

    proptest! {
        #[test]
        fn commit_matches_rules_engine(choices in prop::collection::vec(any::<u16>(), 1..40)) {
            let mut state = playing(None, Color::White);
            let mut expected = Board::default();

            for choice in choices {
                let moves = legal_moves(&expected);
                if moves.is_empty() || !state.is_playing() {
                    break;
                }
                let next = moves[choice as usize % moves.len()];
                let origin = if state.is_human_turn() {
                    MoveOrigin::Human
                } else {
                    MoveOrigin::Engine
                };
                state.stage(next, origin, Duration::ZERO).unwrap();
                prop_assert!(state.advance_gate(Duration::ZERO).is_some());
                expected = apply(&expected, next).unwrap();
                prop_assert_eq!(state.position(), &expected);
            }
            let mut replayed = Board::default();
            for m in state.history() {
                replayed = apply(&replayed, *m).unwrap();
            }
            prop_assert_eq!(&replayed, state.position());
        }
    }
}
