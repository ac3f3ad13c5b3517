use chess::PlayerSide;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::{ArbiterCommand, ArbiterError, Navigation, Participant};
use super::events::ArbiterEvent;
use super::snapshot::ArbiterSnapshot;

/// Cheap, cloneable handle to the arbiter actor.
#[derive(Clone)]
pub struct ArbiterHandle {
    cmd_tx: mpsc::Sender<ArbiterCommand>,
}

impl ArbiterHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<ArbiterCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Open the channel to the bot host. Resolves once the channel is open; the engine list
    /// arrives later as [`ArbiterEvent::Identities`].
    pub async fn connect(&self) -> Result<(), ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::Connect { reply: tx }).await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))?
    }

    pub async fn disconnect(&self) -> Result<(), ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::Disconnect { reply: tx }).await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))
    }

    pub async fn make_move(&self, token: impl Into<String>) -> Result<ArbiterSnapshot, ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::MakeMove {
            token: token.into(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))?
    }

    pub async fn new_game(&self) -> Result<ArbiterSnapshot, ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::NewGame { reply: tx }).await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))
    }

    pub async fn load_fen(&self, fen: impl Into<String>) -> Result<ArbiterSnapshot, ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::LoadFen {
            fen: fen.into(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))?
    }

    /// Move the view cursor. Returns `false` when the cursor did not move.
    pub async fn navigate(&self, nav: Navigation) -> Result<bool, ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::Navigate { nav, reply: tx })
            .await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))
    }

    pub async fn set_participant(
        &self,
        side: PlayerSide,
        participant: Participant,
    ) -> Result<(), ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::SetParticipant {
            side,
            participant,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))
    }

    pub async fn set_auto_play(&self, enabled: bool) -> Result<(), ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::SetAutoPlay { enabled, reply: tx })
            .await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))
    }

    /// Ask the engine currently searching to move now.
    pub async fn stop_search(&self) -> Result<(), ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::StopSearch { reply: tx }).await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))?
    }

    pub async fn send_raw(
        &self,
        identity: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::SendRaw {
            identity: identity.into(),
            text: text.into(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))?
    }

    pub async fn get_snapshot(&self) -> Result<ArbiterSnapshot, ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::GetSnapshot { reply: tx }).await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(ArbiterSnapshot, broadcast::Receiver<ArbiterEvent>), ArbiterError> {
        let (tx, rx) = oneshot::channel();
        self.send(ArbiterCommand::Subscribe { reply: tx }).await?;
        rx.await
            .map_err(|_| ArbiterError::Internal("Reply dropped".into()))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(ArbiterCommand::Shutdown).await;
    }

    async fn send(&self, cmd: ArbiterCommand) -> Result<(), ArbiterError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| ArbiterError::Internal("Arbiter actor closed".into()))
    }
}
