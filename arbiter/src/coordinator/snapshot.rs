use chess::{GameSnapshot, PlayerSide};
use engine::ConnectionState;

use super::commands::Participant;

/// Complete, immutable snapshot of arbiter state.
/// Sent to subscribers on every state change and on subscribe.
#[derive(Debug, Clone)]
pub struct ArbiterSnapshot {
    pub game: GameSnapshot,
    pub white: Participant,
    pub black: Participant,
    pub auto_play: bool,
    pub pending: Option<PendingMove>,
    pub connection: ConnectionState,
    pub identities: Vec<String>,
}

impl ArbiterSnapshot {
    pub fn participant(&self, side: PlayerSide) -> &Participant {
        match side {
            PlayerSide::White => &self.white,
            PlayerSide::Black => &self.black,
        }
    }

    pub fn move_count(&self) -> usize {
        self.game.history.len()
    }
}

/// A search the arbiter is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub side: PlayerSide,
    pub identity: String,
    /// History length when the search was started.
    pub ply: usize,
    pub game: Option<chess::GameHandle>,
}
