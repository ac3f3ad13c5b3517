pub mod analysis;
pub mod arena;
pub mod effects;
pub mod fen;
pub mod history;
pub mod rules;
pub mod san;
pub mod store;
pub mod types;
pub mod uci;

pub use analysis::{encode_mate, SearchInfo, MATE_SCORE};
pub use arena::{GameArena, GameHandle};
pub use effects::{GameEffects, NoEffects};
pub use fen::{FenError, StartPosition, STARTING_FEN};
pub use history::{MoveHistoryEntry, ViewCursor};
pub use rules::{AppliedMove, CozyRules, GameRules, PositionStatus, RulesError};
pub use store::{GameEvent, GameSnapshot, GameStore, MoveEffect, Position, StoreError};
pub use types::{GameResult, PieceKind, PlayerSide};
pub use uci::{parse_move_token, CandidateMove, MoveTokenError};
