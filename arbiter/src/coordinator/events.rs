use chess::SearchInfo;
use engine::ConnectionState;

use super::snapshot::ArbiterSnapshot;

/// Events broadcast from the arbiter actor to all subscribers.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum ArbiterEvent {
    /// Full state snapshot after any mutation.
    StateChanged(ArbiterSnapshot),
    /// Transient search progress (frequent, lightweight).
    SearchProgress { identity: String, info: SearchInfo },
    /// Engine output that is neither progress nor a best move.
    EngineLine {
        identity: Option<String>,
        text: String,
    },
    Identities(Vec<String>),
    Connection(ConnectionState),
    /// Error notification.
    Error(String),
}
