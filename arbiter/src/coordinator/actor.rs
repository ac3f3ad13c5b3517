use chess::GameEvent;
use engine::{ClientEvent, UciMessage};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;

use super::commands::{ArbiterCommand, ArbiterError, Navigation};
use super::events::ArbiterEvent;
use super::state::{ArbiterState, BestMoveOutcome};

/// The main arbiter actor loop.
/// Owns all mutable state. Processes store notifications, commands and channel events
/// sequentially.
pub(crate) async fn run_arbiter_actor(
    state: ArbiterState,
    store_rx: broadcast::Receiver<GameEvent>,
    cmd_rx: mpsc::Receiver<ArbiterCommand>,
    event_tx: broadcast::Sender<ArbiterEvent>,
) {
    run_arbiter_actor_inner(state, store_rx, cmd_rx, event_tx)
        .instrument(tracing::info_span!("arbiter"))
        .await;
}

async fn run_arbiter_actor_inner(
    mut state: ArbiterState,
    mut store_rx: broadcast::Receiver<GameEvent>,
    mut cmd_rx: mpsc::Receiver<ArbiterCommand>,
    event_tx: broadcast::Sender<ArbiterEvent>,
) {
    tracing::info!("Arbiter actor started");

    loop {
        tokio::select! {
            biased;

            // Live changes are handled before anything else can observe the new position.
            event = store_rx.recv() => {
                match event {
                    Ok(event) if event.is_live_change() => {
                        tracing::debug!(?event, "Live position changed");
                        on_live_change(&mut state, &event_tx).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Store notifications lagged");
                        on_live_change(&mut state, &event_tx).await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::error!("Store notifications closed");
                        break;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ArbiterCommand::Shutdown) | None => {
                        tracing::info!("Arbiter actor shutting down");
                        state.store.teardown();
                        state.disconnect();
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, cmd, &event_tx).await,
                }
            }

            client_event = state.client.next_event() => {
                handle_client_event(&mut state, client_event, &event_tx).await;
            }
        }
    }

    tracing::info!("Arbiter actor exited");
}

async fn on_live_change(state: &mut ArbiterState, event_tx: &broadcast::Sender<ArbiterEvent>) {
    if state.revalidate_pending().await {
        let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
    }
    maybe_auto_trigger(state, event_tx).await;
}

async fn handle_command(
    state: &mut ArbiterState,
    cmd: ArbiterCommand,
    event_tx: &broadcast::Sender<ArbiterEvent>,
) {
    match cmd {
        ArbiterCommand::Connect { reply } => {
            let result = state.connect().await;
            let _ = event_tx.send(ArbiterEvent::Connection(state.client.state()));
            let _ = reply.send(result);
            maybe_auto_trigger(state, event_tx).await;
        }
        ArbiterCommand::Disconnect { reply } => {
            state.disconnect();
            let _ = event_tx.send(ArbiterEvent::Connection(state.client.state()));
            let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
            let _ = reply.send(());
        }
        ArbiterCommand::MakeMove { token, reply } => {
            let result = state
                .store
                .make_move(&token)
                .map(|_| state.snapshot())
                .map_err(ArbiterError::from);
            if let Ok(ref snap) = result {
                let _ = event_tx.send(ArbiterEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        ArbiterCommand::NewGame { reply } => {
            state.store.new_game();
            let snap = state.snapshot();
            let _ = event_tx.send(ArbiterEvent::StateChanged(snap.clone()));
            let _ = reply.send(snap);
        }
        ArbiterCommand::LoadFen { fen, reply } => {
            let result = state
                .store
                .load_fen(&fen)
                .map(|()| state.snapshot())
                .map_err(ArbiterError::from);
            if let Ok(ref snap) = result {
                let _ = event_tx.send(ArbiterEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        ArbiterCommand::Navigate { nav, reply } => {
            let moved = match nav {
                Navigation::Prev => state.store.view_prev(),
                Navigation::Next => state.store.view_next(),
                Navigation::Start => state.store.go_to_start(),
                Navigation::Live => state.store.go_to_live(),
                Navigation::Move(index) => state.store.go_to_move(index),
            };
            if moved {
                let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
            }
            let _ = reply.send(moved);
        }
        ArbiterCommand::SetParticipant {
            side,
            participant,
            reply,
        } => {
            state.cancel_pending("participant rebound").await;
            state.set_participant(side, participant);
            let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
            let _ = reply.send(());
            maybe_auto_trigger(state, event_tx).await;
        }
        ArbiterCommand::SetAutoPlay { enabled, reply } => {
            state.cancel_pending("auto-play toggled").await;
            state.set_auto_play(enabled);
            let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
            let _ = reply.send(());
            maybe_auto_trigger(state, event_tx).await;
        }
        ArbiterCommand::StopSearch { reply } => {
            let _ = reply.send(state.stop_search().await);
        }
        ArbiterCommand::SendRaw {
            identity,
            text,
            reply,
        } => {
            let _ = reply.send(state.send_raw(&identity, &text).await);
        }
        ArbiterCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        ArbiterCommand::Subscribe { reply } => {
            let snapshot = state.snapshot();
            let rx = event_tx.subscribe();
            let _ = reply.send((snapshot, rx));
        }
        ArbiterCommand::Shutdown => unreachable!(),
    }
}

/// Request an engine move if the side to move is owed one.
async fn maybe_auto_trigger(state: &mut ArbiterState, event_tx: &broadcast::Sender<ArbiterEvent>) {
    if !state.should_auto_trigger() {
        return;
    }
    match state.trigger_engine().await {
        Ok(()) => {
            let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
        }
        Err(e) => {
            tracing::error!("Failed to auto-trigger engine: {}", e);
            let _ = event_tx.send(ArbiterEvent::Error(format!("Engine trigger failed: {}", e)));
        }
    }
}

async fn handle_client_event(
    state: &mut ArbiterState,
    event: ClientEvent,
    event_tx: &broadcast::Sender<ArbiterEvent>,
) {
    match event {
        ClientEvent::EngineLine {
            identity: Some(identity),
            message: Some(UciMessage::BestMove { mv, .. }),
            ..
        } => {
            let outcome = state.handle_best_move(&identity, mv);
            match outcome {
                BestMoveOutcome::Committed(_) => {
                    // The store notification that follows drives the next trigger.
                    let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
                }
                BestMoveOutcome::NoMove => {
                    let _ = event_tx.send(ArbiterEvent::Error(format!(
                        "{} reported no legal move",
                        identity
                    )));
                    let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
                }
                BestMoveOutcome::Rejected(e) => {
                    let _ = event_tx.send(ArbiterEvent::Error(format!(
                        "Engine {} suggested illegal move: {}",
                        identity, e
                    )));
                    let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
                }
                BestMoveOutcome::Outdated => {
                    let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
                    maybe_auto_trigger(state, event_tx).await;
                }
                BestMoveOutcome::Stale | BestMoveOutcome::Unexpected => {}
            }
        }
        ClientEvent::EngineLine {
            identity: Some(identity),
            message: Some(UciMessage::Info(info)),
            ..
        } => {
            state.record_search(&identity, &info);
            let _ = event_tx.send(ArbiterEvent::SearchProgress { identity, info });
        }
        ClientEvent::EngineLine { identity, text, .. } => {
            tracing::trace!(?identity, %text, "Engine line");
            let _ = event_tx.send(ArbiterEvent::EngineLine { identity, text });
        }
        ClientEvent::Identities(identities) => {
            tracing::info!(?identities, "Engines available");
            let _ = event_tx.send(ArbiterEvent::Identities(identities));
        }
        ClientEvent::SessionConnected(identity) => {
            tracing::debug!(%identity, "Unsolicited session acknowledgement");
        }
        ClientEvent::SessionDisconnected(identity) => {
            tracing::info!(%identity, "Session closed by host");
            if state.session_closed(&identity) {
                let _ = event_tx.send(ArbiterEvent::Error(format!(
                    "{} disconnected during its search",
                    identity
                )));
                let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
            }
        }
        ClientEvent::Error(message) => {
            tracing::error!(%message, "Bot host error");
            let _ = event_tx.send(ArbiterEvent::Error(message));
        }
        ClientEvent::ConnectionLost => {
            tracing::warn!("Connection to bot host lost");
            state.connection_lost();
            let _ = event_tx.send(ArbiterEvent::Connection(state.client.state()));
            let _ = event_tx.send(ArbiterEvent::StateChanged(state.snapshot()));
        }
    }
}
