//! Error types for the bot client

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Failed to open channel: {0}")]
    ConnectFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("No session for {0}")]
    NoSession(String),

    #[error("{identity} did not acknowledge {stage} in time")]
    ReadyTimeout { identity: String, stage: ReadyStage },

    #[error("Host rejected {identity}: {message}")]
    Rejected { identity: String, message: String },

    #[error("Channel closed")]
    ConnectionClosed,

    #[error("Failed to encode message: {0}")]
    Encode(String),
}

/// Session start-up stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyStage {
    /// Host spawned the engine (`connected`).
    Connected,
    /// Engine finished the `uci` handshake (`uciok`).
    Initialized,
    /// Engine answered `isready` (`readyok`).
    Ready,
}

impl std::fmt::Display for ReadyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connected => "connect",
            Self::Initialized => "uci",
            Self::Ready => "isready",
        };
        f.write_str(s)
    }
}
