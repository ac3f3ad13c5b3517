//! The authoritative game record: live position, append-only move history, and a view cursor
//! for browsing that history without touching the live game.

use tokio::sync::broadcast;

use crate::analysis::SearchInfo;
use crate::arena::{GameArena, GameHandle};
use crate::effects::{GameEffects, NoEffects};
use crate::fen::StartPosition;
use crate::history::{MoveHistoryEntry, ViewCursor};
use crate::rules::{AppliedMove, CozyRules, GameRules, PositionStatus};
use crate::types::{GameResult, PlayerSide};

const EVENT_CAPACITY: usize = 64;

/// A live game object owned by the store's arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub fen: String,
    pub status: PositionStatus,
}

/// Observable side effect of a committed move, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEffect {
    GameOver(Option<GameResult>),
    Check,
    Capture,
    Move,
}

impl MoveEffect {
    fn classify(applied: &AppliedMove) -> Self {
        if applied.status_after.game_over {
            Self::GameOver(applied.status_after.result)
        } else if applied.status_after.in_check {
            Self::Check
        } else if applied.captured.is_some() {
            Self::Capture
        } else {
            Self::Move
        }
    }
}

/// Notifications published by the store after each mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    GameStarted {
        handle: GameHandle,
        fen: String,
    },
    MoveCommitted {
        ply: usize,
        token: String,
        san: String,
        fen: String,
        effect: MoveEffect,
    },
    ViewChanged {
        cursor: ViewCursor,
    },
    SearchInfoAttached {
        ply: usize,
    },
    TornDown,
}

impl GameEvent {
    /// True for events that change the live position.
    pub fn is_live_change(&self) -> bool {
        matches!(
            self,
            Self::GameStarted { .. } | Self::MoveCommitted { .. } | Self::TornDown
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("No active game")]
    NoActiveGame,
    #[error("Illegal move {token}: {reason}")]
    IllegalMove { token: String, reason: String },
    #[error("Invalid FEN {fen}: {reason}")]
    InvalidFen { fen: String, reason: String },
    #[error("History replay failed: {0}")]
    Replay(String),
}

/// Immutable copy of the store's observable state.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub handle: Option<GameHandle>,
    pub start_fen: String,
    pub live_fen: Option<String>,
    pub viewed_fen: String,
    pub cursor: ViewCursor,
    pub history: Vec<MoveHistoryEntry>,
    pub status: Option<PositionStatus>,
}

impl GameSnapshot {
    pub fn is_viewing_live(&self) -> bool {
        self.cursor == ViewCursor::live(self.history.len())
    }
}

pub struct GameStore<R: GameRules = CozyRules> {
    rules: R,
    effects: Box<dyn GameEffects>,
    games: GameArena<Position>,
    live: Option<GameHandle>,
    start: StartPosition,
    history: Vec<MoveHistoryEntry>,
    cursor: ViewCursor,
    viewed_fen: String,
    events: broadcast::Sender<GameEvent>,
}

impl GameStore<CozyRules> {
    pub fn standard() -> Self {
        Self::new(CozyRules)
    }
}

impl<R: GameRules> GameStore<R> {
    /// Create a store with no active game. Call [`GameStore::init`] before making moves.
    pub fn new(rules: R) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let viewed_fen = rules.starting_position();
        Self {
            rules,
            effects: Box::new(NoEffects),
            games: GameArena::new(),
            live: None,
            start: StartPosition::Standard,
            history: Vec::new(),
            cursor: ViewCursor::START,
            viewed_fen,
            events,
        }
    }

    pub fn with_effects(mut self, effects: impl GameEffects + 'static) -> Self {
        self.effects = Box::new(effects);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub fn init(&mut self) {
        self.new_game();
    }

    /// Start a fresh game from the standard position.
    pub fn new_game(&mut self) {
        if let Err(e) = self.start_game(StartPosition::Standard) {
            // Only reachable with a rules implementation that rejects its own start position.
            tracing::error!("Failed to start new game: {}", e);
        }
    }

    /// Replace the game with one starting from `fen`. State is untouched on rejection.
    pub fn load_fen(&mut self, fen: &str) -> Result<(), StoreError> {
        self.start_game(StartPosition::Fen(fen.to_string()))
    }

    /// Drop the live game. Moves are rejected until the next `init`/`new_game`/`load_fen`.
    pub fn teardown(&mut self) {
        if let Some(handle) = self.live.take() {
            self.games.remove(handle);
        }
        self.history.clear();
        self.cursor = ViewCursor::START;
        self.start = StartPosition::Standard;
        self.viewed_fen = self.rules.starting_position();
        tracing::debug!("Game store torn down");
        self.emit(GameEvent::TornDown);
    }

    fn start_game(&mut self, start: StartPosition) -> Result<(), StoreError> {
        let invalid = |reason: String| StoreError::InvalidFen {
            fen: start.fen().to_string(),
            reason,
        };
        let fen = self
            .rules
            .parse_position(start.fen())
            .map_err(|e| invalid(e.to_string()))?;
        let status = self.rules.status(&fen).map_err(|e| invalid(e.to_string()))?;

        if let Some(old) = self.live.take() {
            self.games.remove(old);
        }
        let handle = self.games.insert(Position {
            fen: fen.clone(),
            status,
        });
        self.live = Some(handle);
        self.start = match start {
            StartPosition::Standard => StartPosition::Standard,
            StartPosition::Fen(_) => StartPosition::Fen(fen.clone()),
        };
        self.history.clear();
        self.cursor = ViewCursor::START;
        self.viewed_fen = fen.clone();

        tracing::info!(%handle, %fen, "Game started");
        self.effects.game_start();
        self.emit(GameEvent::GameStarted { handle, fen });
        Ok(())
    }

    /// Play `token` on the live position.
    ///
    /// On success the move is appended to the history and the view snaps to live. On failure
    /// nothing changes.
    pub fn make_move(&mut self, token: &str) -> Result<MoveEffect, StoreError> {
        let handle = self.live.ok_or(StoreError::NoActiveGame)?;
        let live_fen = self
            .games
            .get(handle)
            .map(|p| p.fen.clone())
            .ok_or(StoreError::NoActiveGame)?;

        let applied =
            self.rules
                .apply_move(&live_fen, token)
                .map_err(|e| StoreError::IllegalMove {
                    token: token.to_string(),
                    reason: e.to_string(),
                })?;

        let Some(position) = self.games.get_mut(handle) else {
            return Err(StoreError::NoActiveGame);
        };
        *position = Position {
            fen: applied.fen_after.clone(),
            status: applied.status_after,
        };

        let effect = MoveEffect::classify(&applied);
        self.history.push(MoveHistoryEntry {
            token: applied.token.clone(),
            san: applied.san.clone(),
            fen: applied.fen_after.clone(),
            search: None,
        });
        self.cursor = ViewCursor::live(self.history.len());
        self.viewed_fen = applied.fen_after.clone();

        tracing::debug!(token = %applied.token, san = %applied.san, ?effect, "Move committed");
        match effect {
            MoveEffect::GameOver(result) => self.effects.game_over(result),
            MoveEffect::Check => self.effects.check(),
            MoveEffect::Capture => self.effects.capture(),
            MoveEffect::Move => self.effects.move_played(),
        }
        self.emit(GameEvent::MoveCommitted {
            ply: self.history.len(),
            token: applied.token,
            san: applied.san,
            fen: applied.fen_after,
            effect,
        });
        Ok(effect)
    }

    /// Attach `info` to the most recent move. Returns `false` on an empty history.
    pub fn attach_search_info_to_last_move(&mut self, info: SearchInfo) -> bool {
        let Some(last) = self.history.last_mut() else {
            return false;
        };
        *last = last.with_search(info);
        let ply = self.history.len();
        self.emit(GameEvent::SearchInfoAttached { ply });
        true
    }

    pub fn view_prev(&mut self) -> bool {
        self.move_cursor(self.cursor.value() - 1)
    }

    pub fn view_next(&mut self) -> bool {
        self.move_cursor(self.cursor.value() + 1)
    }

    /// Jump to history index `index` (`-1` for the start). Out-of-range indices are ignored.
    pub fn go_to_move(&mut self, index: isize) -> bool {
        if ViewCursor::checked(index, self.history.len()).is_none() {
            return false;
        }
        self.move_cursor(index)
    }

    pub fn go_to_start(&mut self) -> bool {
        self.move_cursor(ViewCursor::START.value())
    }

    pub fn go_to_live(&mut self) -> bool {
        self.move_cursor(ViewCursor::live(self.history.len()).value())
    }

    fn move_cursor(&mut self, target: isize) -> bool {
        let target = ViewCursor::clamped(target, self.history.len());
        if target == self.cursor {
            return false;
        }
        let fen = match self.replay(target) {
            Ok(fen) => fen,
            Err(e) => {
                tracing::warn!("Cannot view move {}: {}", target, e);
                return false;
            }
        };
        self.cursor = target;
        self.viewed_fen = fen;
        self.emit(GameEvent::ViewChanged { cursor: target });
        true
    }

    /// Position token reached by replaying the history from the start up to `upto`.
    pub fn replay(&self, upto: ViewCursor) -> Result<String, StoreError> {
        let mut fen = self
            .rules
            .parse_position(self.start.fen())
            .map_err(|e| StoreError::Replay(e.to_string()))?;
        let count = upto.index().map_or(0, |i| i + 1);
        for entry in self.history.iter().take(count) {
            fen = self
                .rules
                .apply_move(&fen, &entry.token)
                .map_err(|e| StoreError::Replay(e.to_string()))?
                .fen_after;
        }
        Ok(fen)
    }

    pub fn history(&self) -> &[MoveHistoryEntry] {
        &self.history
    }

    pub fn move_tokens(&self) -> Vec<String> {
        self.history.iter().map(|e| e.token.clone()).collect()
    }

    pub fn cursor(&self) -> ViewCursor {
        self.cursor
    }

    pub fn is_viewing_live(&self) -> bool {
        self.cursor == ViewCursor::live(self.history.len())
    }

    pub fn handle(&self) -> Option<GameHandle> {
        self.live
    }

    pub fn live_position(&self) -> Option<&Position> {
        self.games.get(self.live?)
    }

    pub fn viewed_fen(&self) -> &str {
        &self.viewed_fen
    }

    pub fn start_position(&self) -> &StartPosition {
        &self.start
    }

    pub fn status(&self) -> Option<PositionStatus> {
        self.live_position().map(|p| p.status)
    }

    pub fn side_to_move(&self) -> Option<PlayerSide> {
        self.status().map(|s| s.side_to_move)
    }

    pub fn is_game_over(&self) -> bool {
        self.status().is_some_and(|s| s.game_over)
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            handle: self.live,
            start_fen: self.start.fen().to_string(),
            live_fen: self.live_position().map(|p| p.fen.clone()),
            viewed_fen: self.viewed_fen.clone(),
            cursor: self.cursor,
            history: self.history.clone(),
            status: self.status(),
        }
    }

    fn emit(&self, event: GameEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::STARTING_FEN;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<&'static str>>>);

    impl Recorder {
        fn take(&self) -> Vec<&'static str> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl GameEffects for Recorder {
        fn game_start(&self) {
            self.0.lock().unwrap().push("start");
        }
        fn move_played(&self) {
            self.0.lock().unwrap().push("move");
        }
        fn capture(&self) {
            self.0.lock().unwrap().push("capture");
        }
        fn check(&self) {
            self.0.lock().unwrap().push("check");
        }
        fn game_over(&self, _result: Option<GameResult>) {
            self.0.lock().unwrap().push("game_over");
        }
    }

    fn started() -> GameStore {
        let mut store = GameStore::standard();
        store.init();
        store
    }

    #[test]
    fn test_make_move_before_init_is_rejected() {
        let mut store = GameStore::standard();
        assert_eq!(store.make_move("e2e4"), Err(StoreError::NoActiveGame));
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_two_moves_then_navigate() {
        let mut store = started();
        store.make_move("e2e4").unwrap();
        store.make_move("e7e5").unwrap();

        assert_eq!(store.history().len(), 2);
        assert_eq!(store.cursor().value(), 1);
        let live = store.live_position().unwrap().fen.clone();
        assert!(live.starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w"));

        assert!(store.view_prev());
        assert_eq!(store.cursor().value(), 0);
        assert_eq!(store.viewed_fen(), store.history()[0].fen);
        assert_eq!(store.live_position().unwrap().fen, live);

        assert!(store.go_to_start());
        assert_eq!(store.cursor(), ViewCursor::START);
        assert_eq!(store.viewed_fen(), STARTING_FEN);

        assert!(store.go_to_live());
        assert_eq!(store.cursor().value(), 1);
        assert_eq!(store.viewed_fen(), live);
    }

    #[test]
    fn test_navigation_clamps() {
        let mut store = started();
        assert!(!store.view_prev());
        assert!(!store.view_next());

        store.make_move("d2d4").unwrap();
        assert!(!store.view_next());
        assert!(store.view_prev());
        assert!(!store.view_prev());
        assert_eq!(store.cursor(), ViewCursor::START);
    }

    #[test]
    fn test_go_to_move_out_of_range_is_noop() {
        let mut store = started();
        store.make_move("e2e4").unwrap();
        store.make_move("e7e5").unwrap();

        assert!(!store.go_to_move(2));
        assert!(!store.go_to_move(-2));
        assert_eq!(store.cursor().value(), 1);

        assert!(store.go_to_move(-1));
        assert_eq!(store.cursor(), ViewCursor::START);
        assert!(store.go_to_move(0));
        assert_eq!(store.cursor().value(), 0);
    }

    #[test]
    fn test_move_while_browsing_snaps_to_live_and_appends() {
        let mut store = started();
        store.make_move("e2e4").unwrap();
        store.make_move("e7e5").unwrap();
        store.go_to_start();

        store.make_move("g1f3").unwrap();
        assert_eq!(store.history().len(), 3);
        assert_eq!(store.cursor().value(), 2);
        assert!(store.is_viewing_live());
        assert_eq!(store.move_tokens(), vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_illegal_move_leaves_state_unchanged() {
        let mut store = started();
        store.make_move("e2e4").unwrap();
        store.go_to_start();
        let before = store.snapshot();

        assert!(matches!(
            store.make_move("e2e4"),
            Err(StoreError::IllegalMove { .. })
        ));
        let after = store.snapshot();
        assert_eq!(after.history, before.history);
        assert_eq!(after.cursor, before.cursor);
        assert_eq!(after.live_fen, before.live_fen);
        assert_eq!(after.viewed_fen, before.viewed_fen);
    }

    #[test]
    fn test_load_fen_resets_and_rejects_garbage() {
        let mut store = started();
        store.make_move("e2e4").unwrap();

        let err = store.load_fen("definitely not a position").unwrap_err();
        assert!(matches!(err, StoreError::InvalidFen { .. }));
        assert_eq!(store.history().len(), 1);

        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        store.load_fen(fen).unwrap();
        assert!(store.history().is_empty());
        assert_eq!(store.cursor(), ViewCursor::START);
        assert_eq!(store.start_position(), &StartPosition::Fen(fen.to_string()));
        assert_eq!(store.live_position().unwrap().fen, fen);

        store.make_move("e1g1").unwrap();
        assert_eq!(store.history()[0].san, "O-O");
        assert_eq!(store.replay(store.cursor()).unwrap(), store.history()[0].fen);
    }

    #[test]
    fn test_new_game_tombstones_previous_handle() {
        let mut store = started();
        let first = store.handle().unwrap();
        store.make_move("e2e4").unwrap();

        store.new_game();
        let second = store.handle().unwrap();
        assert_ne!(first, second);
        assert!(store.history().is_empty());
        assert_eq!(store.cursor(), ViewCursor::START);
        assert_eq!(store.live_position().unwrap().fen, STARTING_FEN);
    }

    #[test]
    fn test_teardown_rejects_moves() {
        let mut store = started();
        store.teardown();
        assert!(store.live_position().is_none());
        assert_eq!(store.make_move("e2e4"), Err(StoreError::NoActiveGame));
    }

    #[test]
    fn test_attach_search_info_only_touches_last_entry() {
        let mut store = started();
        let info = SearchInfo {
            depth: 20,
            score: 35,
            nodes: 1000,
            time_ms: 500,
            pv: vec!["e2e4".into(), "e7e5".into()],
        };
        assert!(!store.attach_search_info_to_last_move(info.clone()));

        store.make_move("e2e4").unwrap();
        store.make_move("e7e5").unwrap();
        assert!(store.attach_search_info_to_last_move(info.clone()));

        assert_eq!(store.history()[0].search, None);
        assert_eq!(store.history()[1].search, Some(info));
        assert_eq!(store.history()[1].token, "e7e5");
    }

    #[test]
    fn test_effect_priority() {
        let recorder = Recorder::default();
        let mut store = GameStore::standard().with_effects(recorder.clone());
        store.init();
        assert_eq!(recorder.take(), vec!["start"]);

        // Fool's mate.
        assert_eq!(store.make_move("f2f3"), Ok(MoveEffect::Move));
        store.make_move("e7e5").unwrap();
        store.make_move("g2g4").unwrap();
        assert_eq!(
            store.make_move("d8h4"),
            Ok(MoveEffect::GameOver(Some(GameResult::BlackWins)))
        );
        assert_eq!(recorder.take(), vec!["move", "move", "move", "game_over"]);
        assert!(store.is_game_over());
    }

    #[test]
    fn test_capture_and_check_effects() {
        let mut store = started();
        for token in ["e2e4", "d7d5"] {
            store.make_move(token).unwrap();
        }
        assert_eq!(store.make_move("e4d5"), Ok(MoveEffect::Capture));
        store.make_move("a7a6").unwrap();
        // With the d7 pawn gone the b5-e8 diagonal is open.
        assert_eq!(store.make_move("f1b5"), Ok(MoveEffect::Check));
        assert_eq!(store.status().map(|s| s.in_check), Some(true));
    }

    #[test]
    fn test_events_published() {
        let mut store = GameStore::standard();
        let mut rx = store.subscribe();
        store.init();
        store.make_move("e2e4").unwrap();
        store.view_prev();

        assert!(matches!(rx.try_recv(), Ok(GameEvent::GameStarted { .. })));
        match rx.try_recv() {
            Ok(GameEvent::MoveCommitted { ply, token, .. }) => {
                assert_eq!(ply, 1);
                assert_eq!(token, "e2e4");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            rx.try_recv(),
            Ok(GameEvent::ViewChanged { cursor }) if cursor == ViewCursor::START
        ));
    }
}
