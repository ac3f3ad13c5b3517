//! Plain-text rendering of arbiter state for the terminal.

use std::fmt::Write;

use arbiter::{ArbiterEvent, ArbiterSnapshot};
use chess::PlayerSide;

/// Multi-line description of the game: moves, viewed position, bindings.
pub fn describe_snapshot(snap: &ArbiterSnapshot) -> String {
    let mut out = String::new();
    let game = &snap.game;

    let mut moves = String::new();
    for (i, entry) in game.history.iter().enumerate() {
        if i % 2 == 0 {
            let _ = write!(moves, "{}. ", i / 2 + 1);
        }
        let marker = if game.cursor.index() == Some(i) { "*" } else { "" };
        let _ = write!(moves, "{}{} ", entry.san, marker);
    }
    if moves.is_empty() {
        moves.push_str("(no moves)");
    }
    let _ = writeln!(out, "Moves: {}", moves.trim_end());

    if game.is_viewing_live() {
        let _ = writeln!(out, "Position: {}", game.viewed_fen);
    } else {
        let _ = writeln!(
            out,
            "Viewing {} of {}: {}",
            game.cursor.value(),
            game.history.len().saturating_sub(1),
            game.viewed_fen
        );
    }

    if let Some(info) = game.history.last().and_then(|e| e.search.as_ref()) {
        let _ = writeln!(out, "Last search: {}", info);
    }

    match &game.status {
        Some(status) if status.game_over => {
            let result = status.result.map_or("*", |r| r.as_str());
            let _ = writeln!(out, "Game over: {}", result);
        }
        Some(status) => {
            let check = if status.in_check { " (check)" } else { "" };
            let _ = writeln!(out, "{} to move{}", status.side_to_move, check);
        }
        None => {
            let _ = writeln!(out, "No active game");
        }
    }

    let _ = write!(
        out,
        "White: {}  Black: {}  Auto-play: {}  Connection: {}",
        snap.participant(PlayerSide::White),
        snap.participant(PlayerSide::Black),
        if snap.auto_play { "on" } else { "off" },
        snap.connection
    );
    if let Some(pending) = &snap.pending {
        let _ = write!(out, "\n{} is thinking for {}", pending.identity, pending.side);
    }
    out
}

/// One-line notice for an event, or `None` for events not worth printing.
pub fn describe_event(event: &ArbiterEvent) -> Option<String> {
    match event {
        ArbiterEvent::StateChanged(_) => None,
        ArbiterEvent::SearchProgress { identity, info } => {
            Some(format!("[{}] {}", identity, info))
        }
        ArbiterEvent::EngineLine { identity, text } => Some(match identity {
            Some(identity) => format!("[{}] {}", identity, text),
            None => format!("[host] {}", text),
        }),
        ArbiterEvent::Identities(identities) if identities.is_empty() => {
            Some("No engines available".to_string())
        }
        ArbiterEvent::Identities(identities) => {
            Some(format!("Engines: {}", identities.join(", ")))
        }
        ArbiterEvent::Connection(state) => Some(format!("Connection: {}", state)),
        ArbiterEvent::Error(message) => Some(format!("Error: {}", message)),
    }
}
