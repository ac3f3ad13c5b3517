//! Side-effect hooks fired by the game store (sounds, notifications).

use crate::types::GameResult;

/// Named side effects of store mutations. Every hook defaults to a no-op, so an implementation
/// only overrides what it cares about.
pub trait GameEffects: Send {
    fn game_start(&self) {}
    fn move_played(&self) {}
    fn capture(&self) {}
    fn check(&self) {}
    fn game_over(&self, _result: Option<GameResult>) {}
}

/// Effects sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEffects;

impl GameEffects for NoEffects {}
