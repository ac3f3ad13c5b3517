use chess::{PlayerSide, StoreError};
use engine::ClientError;
use tokio::sync::{broadcast, oneshot};

use super::events::ArbiterEvent;
use super::snapshot::ArbiterSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArbiterError {
    #[error(transparent)]
    Rejected(#[from] StoreError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("No search in progress")]
    NoSearch,
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Who plays a side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Participant {
    #[default]
    Human,
    /// An engine, by the identity the bot host knows it under.
    Engine(String),
}

impl Participant {
    pub fn engine_identity(&self) -> Option<&str> {
        match self {
            Self::Human => None,
            Self::Engine(identity) => Some(identity),
        }
    }
}

impl std::str::FromStr for Participant {
    type Err = ArbiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ArbiterError::Internal("empty participant".to_string())),
            "human" => Ok(Self::Human),
            identity => Ok(Self::Engine(identity.to_string())),
        }
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => f.write_str("human"),
            Self::Engine(identity) => f.write_str(identity),
        }
    }
}

/// View cursor movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Prev,
    Next,
    Start,
    Live,
    /// History index, `-1` for the starting position.
    Move(isize),
}

/// Commands sent to the arbiter actor. Each embeds a oneshot for the reply.
pub enum ArbiterCommand {
    Connect {
        reply: oneshot::Sender<Result<(), ArbiterError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    MakeMove {
        token: String,
        reply: oneshot::Sender<Result<ArbiterSnapshot, ArbiterError>>,
    },
    NewGame {
        reply: oneshot::Sender<ArbiterSnapshot>,
    },
    LoadFen {
        fen: String,
        reply: oneshot::Sender<Result<ArbiterSnapshot, ArbiterError>>,
    },
    Navigate {
        nav: Navigation,
        reply: oneshot::Sender<bool>,
    },
    SetParticipant {
        side: PlayerSide,
        participant: Participant,
        reply: oneshot::Sender<()>,
    },
    SetAutoPlay {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    StopSearch {
        reply: oneshot::Sender<Result<(), ArbiterError>>,
    },
    SendRaw {
        identity: String,
        text: String,
        reply: oneshot::Sender<Result<(), ArbiterError>>,
    },
    GetSnapshot {
        reply: oneshot::Sender<ArbiterSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(ArbiterSnapshot, broadcast::Receiver<ArbiterEvent>)>,
    },
    Shutdown,
}
