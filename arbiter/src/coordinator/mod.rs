//! Auto-play coordination: one actor task owns the game store and the bot client, and asks
//! engines for moves whenever an engine-bound side is to move.

mod actor;
pub mod commands;
pub mod events;
pub mod handle;
pub mod snapshot;
mod state;

use chess::{GameEffects, GameStore};
use engine::{BotClient, Connector};
use tokio::sync::{broadcast, mpsc};

use crate::config::ArbiterConfig;
use actor::run_arbiter_actor;
pub use commands::{ArbiterError, Navigation, Participant};
pub use events::ArbiterEvent;
pub use handle::ArbiterHandle;
pub use snapshot::{ArbiterSnapshot, PendingMove};
use state::ArbiterState;

/// Start a fresh game and spawn the arbiter actor for it. Must be called inside a Tokio runtime.
pub fn spawn_arbiter(
    config: &ArbiterConfig,
    connector: impl Connector + 'static,
    effects: impl GameEffects + 'static,
) -> ArbiterHandle {
    let mut store = GameStore::standard().with_effects(effects);
    store.init();
    let store_rx = store.subscribe();

    let client = BotClient::new(connector).with_ready_timeout(config.ready_timeout);
    let state = ArbiterState::new(store, client, config.movetime_ms);

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, _) = broadcast::channel(100);
    tokio::spawn(run_arbiter_actor(state, store_rx, cmd_rx, event_tx));

    tracing::info!(
        bot_addr = %config.bot_addr,
        movetime_ms = config.movetime_ms,
        "Arbiter spawned"
    );
    ArbiterHandle::new(cmd_tx)
}
