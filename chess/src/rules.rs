//! The game-rules capability consumed by the game store.
//!
//! Everything crosses this boundary as string tokens (FEN for positions, UCI for moves) so the
//! store never depends on a particular move generator. [`CozyRules`] is the production
//! implementation backed by cozy-chess.

use cozy_chess::{Board, GameStatus, Move};

use crate::fen::{format_fen, parse_fen, FenError, STARTING_FEN};
use crate::san::{captured_piece, format_san};
use crate::types::{GameResult, PieceKind, PlayerSide};
use crate::uci::{
    convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, parse_move_token, parse_uci_move,
    CandidateMove, MoveTokenError,
};

/// Derived queries over a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionStatus {
    pub side_to_move: PlayerSide,
    pub in_check: bool,
    pub game_over: bool,
    /// Set exactly when `game_over` is.
    pub result: Option<GameResult>,
}

/// Outcome of applying a legal move to a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// Canonical token of the move that was played.
    pub token: String,
    pub san: String,
    pub fen_after: String,
    /// Piece standing on the destination before the move (pawn for en passant).
    pub captured: Option<PieceKind>,
    pub status_after: PositionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    Token(#[from] MoveTokenError),
    #[error("Illegal move {token} in {fen}")]
    IllegalMove { token: String, fen: String },
}

pub trait GameRules: Send {
    /// Position token of the standard starting position.
    fn starting_position(&self) -> String {
        STARTING_FEN.to_string()
    }

    /// Parse and normalise a position token.
    fn parse_position(&self, fen: &str) -> Result<String, RulesError>;

    fn candidate_moves(&self, fen: &str) -> Result<Vec<CandidateMove>, RulesError>;

    /// Apply `token` to `fen`. Fails without side effects when the move is illegal.
    fn apply_move(&self, fen: &str, token: &str) -> Result<AppliedMove, RulesError>;

    fn status(&self, fen: &str) -> Result<PositionStatus, RulesError>;

    fn parse_move(&self, token: &str) -> Result<CandidateMove, RulesError> {
        Ok(parse_move_token(token)?)
    }
}

/// Rules backed by cozy-chess.
#[derive(Debug, Clone, Copy, Default)]
pub struct CozyRules;

impl GameRules for CozyRules {
    fn parse_position(&self, fen: &str) -> Result<String, RulesError> {
        Ok(format_fen(&parse_fen(fen)?))
    }

    fn candidate_moves(&self, fen: &str) -> Result<Vec<CandidateMove>, RulesError> {
        let board = parse_fen(fen)?;
        Ok(legal_moves(&board)
            .into_iter()
            .map(|mv| CandidateMove::from_move(convert_cozy_castling_to_uci(&board, mv)))
            .collect())
    }

    fn apply_move(&self, fen: &str, token: &str) -> Result<AppliedMove, RulesError> {
        let board = parse_fen(fen)?;
        let legal = legal_moves(&board);
        let requested = parse_uci_move(token)?;
        let mv = convert_uci_castling_to_cozy(requested, &legal);

        if !legal.contains(&mv) {
            return Err(RulesError::IllegalMove {
                token: token.to_string(),
                fen: fen.to_string(),
            });
        }

        // Capture classification and SAN both read the board before the move.
        let captured = captured_piece(&board, mv).map(PieceKind::from);
        let san = format_san(&board, mv, &legal);
        let canonical = convert_cozy_castling_to_uci(&board, mv);

        let mut after = board;
        after.play_unchecked(mv);

        Ok(AppliedMove {
            token: crate::uci::format_uci_move(canonical),
            san,
            fen_after: format_fen(&after),
            captured,
            status_after: board_status(&after),
        })
    }

    fn status(&self, fen: &str) -> Result<PositionStatus, RulesError> {
        Ok(board_status(&parse_fen(fen)?))
    }
}

/// Get all legal moves for a board, in cozy_chess notation.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

fn board_status(board: &Board) -> PositionStatus {
    let side_to_move = PlayerSide::from(board.side_to_move());
    let result = match board.status() {
        GameStatus::Ongoing => None,
        // The side to move has been mated.
        GameStatus::Won => Some(GameResult::win_for(side_to_move.opponent())),
        GameStatus::Drawn => Some(GameResult::Draw),
    };
    PositionStatus {
        side_to_move,
        in_check: !board.checkers().is_empty(),
        game_over: result.is_some(),
        result,
    }
}
