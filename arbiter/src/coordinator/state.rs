use std::collections::HashMap;

use chess::{GameStore, MoveEffect, PlayerSide, SearchInfo, StoreError};
use engine::{BotClient, ClientError, GoParams, Session};

use super::commands::{ArbiterError, Participant};
use super::snapshot::{ArbiterSnapshot, PendingMove};

/// What became of an engine's announced move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BestMoveOutcome {
    /// Answer to a search that was cancelled earlier.
    Stale,
    /// Nothing was pending, or a different engine is owed the move.
    Unexpected,
    /// The pending search no longer matches the live game.
    Outdated,
    /// The engine had no legal move.
    NoMove,
    Committed(MoveEffect),
    Rejected(StoreError),
}

/// Internal mutable state, owned entirely by the arbiter actor. No locks.
pub(crate) struct ArbiterState {
    pub store: GameStore,
    pub client: BotClient,
    sessions: HashMap<String, Session>,
    white: Participant,
    black: Participant,
    auto_play: bool,
    pending: Option<PendingMove>,
    last_search: Option<SearchInfo>,
    /// Best moves still owed by engines whose search was cancelled.
    stale: HashMap<String, u32>,
    movetime_ms: u64,
}

impl ArbiterState {
    pub fn new(store: GameStore, client: BotClient, movetime_ms: u64) -> Self {
        Self {
            store,
            client,
            sessions: HashMap::new(),
            white: Participant::Human,
            black: Participant::Human,
            auto_play: true,
            pending: None,
            last_search: None,
            stale: HashMap::new(),
            movetime_ms,
        }
    }

    /// Build a full snapshot of the current state.
    pub fn snapshot(&self) -> ArbiterSnapshot {
        ArbiterSnapshot {
            game: self.store.snapshot(),
            white: self.white.clone(),
            black: self.black.clone(),
            auto_play: self.auto_play,
            pending: self.pending.clone(),
            connection: self.client.state(),
            identities: self.client.identities().to_vec(),
        }
    }

    pub fn participant(&self, side: PlayerSide) -> &Participant {
        match side {
            PlayerSide::White => &self.white,
            PlayerSide::Black => &self.black,
        }
    }

    pub fn set_participant(&mut self, side: PlayerSide, participant: Participant) {
        tracing::info!(%side, %participant, "Participant bound");
        match side {
            PlayerSide::White => self.white = participant,
            PlayerSide::Black => self.black = participant,
        }
    }

    pub fn set_auto_play(&mut self, enabled: bool) {
        tracing::info!(enabled, "Auto-play toggled");
        self.auto_play = enabled;
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    /// Check if an engine move should be requested for the current position.
    /// Re-evaluated after every live position change.
    pub fn should_auto_trigger(&self) -> bool {
        if self.pending.is_some() || !self.auto_play || !self.client.is_connected() {
            return false;
        }
        if self.store.live_position().is_none() || self.store.is_game_over() {
            return false;
        }
        self.store
            .side_to_move()
            .is_some_and(|side| self.participant(side).engine_identity().is_some())
    }

    /// Ask the engine bound to the side to move for a move.
    pub async fn trigger_engine(&mut self) -> Result<(), ArbiterError> {
        let side = self
            .store
            .side_to_move()
            .ok_or(ArbiterError::Rejected(StoreError::NoActiveGame))?;
        let identity = self
            .participant(side)
            .engine_identity()
            .map(str::to_string)
            .ok_or_else(|| ArbiterError::Internal(format!("{} is not an engine", side)))?;

        let session = self.session_for(&identity).await?;
        let moves = self.store.move_tokens();
        session
            .send_position(self.store.start_position(), &moves)
            .await?;
        session.go(GoParams::movetime(self.movetime_ms)).await?;

        tracing::info!(%side, %identity, ply = moves.len(), "Engine search started");
        self.pending = Some(PendingMove {
            side,
            identity,
            ply: moves.len(),
            game: self.store.handle(),
        });
        self.last_search = None;
        Ok(())
    }

    /// The live session for `identity`, started on first use.
    pub async fn session_for(&mut self, identity: &str) -> Result<Session, ArbiterError> {
        if let Some(session) = self.sessions.get(identity) {
            if self.client.has_session(identity) {
                return Ok(session.clone());
            }
        }
        let session = self.client.start_session(identity).await?;
        self.sessions.insert(identity.to_string(), session.clone());
        Ok(session)
    }

    /// Drop the pending search, telling its engine to stop. The engine still owes a best move
    /// for it, which will be swallowed when it arrives.
    pub async fn cancel_pending(&mut self, reason: &str) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        self.last_search = None;
        tracing::info!(identity = %pending.identity, reason, "Cancelling pending search");

        if let Some(session) = self.sessions.get(&pending.identity) {
            match session.stop().await {
                Ok(()) => *self.stale.entry(pending.identity).or_default() += 1,
                Err(e) => tracing::warn!("Failed to stop search: {}", e),
            }
        }
        true
    }

    fn pending_is_current(&self, pending: &PendingMove) -> bool {
        pending.game == self.store.handle()
            && pending.ply == self.store.history().len()
            && self.store.side_to_move() == Some(pending.side)
    }

    /// Cancel the pending search if the live game moved on without it.
    pub async fn revalidate_pending(&mut self) -> bool {
        match &self.pending {
            Some(pending) if !self.pending_is_current(pending) => {
                self.cancel_pending("live position changed").await
            }
            _ => false,
        }
    }

    /// Keep the latest progress of the pending search. Returns whether it was kept.
    pub fn record_search(&mut self, identity: &str, info: &SearchInfo) -> bool {
        let owed = self
            .pending
            .as_ref()
            .is_some_and(|p| p.identity == identity)
            && !self.stale.contains_key(identity);
        if owed {
            self.last_search = Some(info.clone());
        }
        owed
    }

    /// Resolve an announced move. Clearing the pending search and committing the move happen
    /// together here, with no await in between.
    pub fn handle_best_move(&mut self, identity: &str, mv: Option<String>) -> BestMoveOutcome {
        if let Some(owed) = self.stale.get_mut(identity) {
            *owed -= 1;
            if *owed == 0 {
                self.stale.remove(identity);
            }
            tracing::debug!(identity, ?mv, "Swallowing best move of a cancelled search");
            return BestMoveOutcome::Stale;
        }

        let Some(pending) = self.pending.take_if(|p| p.identity == identity) else {
            tracing::debug!(identity, ?mv, "Discarding unexpected best move");
            return BestMoveOutcome::Unexpected;
        };
        let search = self.last_search.take();

        if !self.pending_is_current(&pending) {
            tracing::warn!(identity, ?mv, "Discarding best move for an outdated position");
            return BestMoveOutcome::Outdated;
        }
        let Some(token) = mv else {
            tracing::warn!(identity, "Engine reported no legal move");
            return BestMoveOutcome::NoMove;
        };

        match self.store.make_move(&token) {
            Ok(effect) => {
                if let Some(info) = search {
                    self.store.attach_search_info_to_last_move(info);
                }
                tracing::info!(identity, %token, "Engine move committed");
                BestMoveOutcome::Committed(effect)
            }
            Err(e) => {
                tracing::error!(identity, %token, "Engine move rejected: {}", e);
                BestMoveOutcome::Rejected(e)
            }
        }
    }

    /// Forget a session the host closed. Returns whether a pending search died with it.
    pub fn session_closed(&mut self, identity: &str) -> bool {
        self.sessions.remove(identity);
        self.stale.remove(identity);
        if self.pending.as_ref().is_some_and(|p| p.identity == identity) {
            self.pending = None;
            self.last_search = None;
            return true;
        }
        false
    }

    /// Drop everything tied to the channel.
    pub fn connection_lost(&mut self) {
        self.sessions.clear();
        self.stale.clear();
        self.pending = None;
        self.last_search = None;
    }

    pub async fn connect(&mut self) -> Result<(), ArbiterError> {
        Ok(self.client.connect().await?)
    }

    pub fn disconnect(&mut self) {
        self.connection_lost();
        self.client.disconnect();
    }

    /// Ask the pending engine to move now.
    pub async fn stop_search(&mut self) -> Result<(), ArbiterError> {
        let identity = self
            .pending
            .as_ref()
            .map(|p| p.identity.clone())
            .ok_or(ArbiterError::NoSearch)?;
        let session = self
            .sessions
            .get(&identity)
            .ok_or_else(|| ArbiterError::Client(ClientError::NoSession(identity.clone())))?;
        Ok(session.stop().await?)
    }

    pub async fn send_raw(&mut self, identity: &str, text: &str) -> Result<(), ArbiterError> {
        let session = self.session_for(identity).await?;
        Ok(session.send_raw(text).await?)
    }
}
