use chess::StartPosition;
use tokio::sync::mpsc;

use crate::client::BotClient;
use crate::error::{ClientError, ClientResult};
use crate::protocol::{self, ClientMessage};
use crate::uci::{GoParams, UciCommand};

/// Handle for talking to one engine over the shared channel.
///
/// Cheap to clone. Sends fail with [`ClientError::ConnectionClosed`] once the channel it was
/// created on has gone away.
#[derive(Debug, Clone)]
pub struct Session {
    identity: String,
    outbound: mpsc::Sender<String>,
}

impl Session {
    pub(crate) fn new(identity: &str, outbound: mpsc::Sender<String>) -> Self {
        Self {
            identity: identity.to_string(),
            outbound,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Set the position to `start` followed by the full move list.
    pub async fn send_position(&self, start: &StartPosition, moves: &[String]) -> ClientResult<()> {
        self.send(UciCommand::Position {
            start: start.clone(),
            moves: moves.to_vec(),
        })
        .await
    }

    pub async fn go(&self, params: GoParams) -> ClientResult<()> {
        self.send(UciCommand::Go(params)).await
    }

    pub async fn stop(&self) -> ClientResult<()> {
        self.send(UciCommand::Stop).await
    }

    /// Pass a command line through to the engine untouched.
    pub async fn send_raw(&self, text: &str) -> ClientResult<()> {
        self.send(UciCommand::Raw(text.to_string())).await
    }

    /// Stop the engine and drop the session from the registry.
    pub async fn close(self, client: &mut BotClient) -> ClientResult<()> {
        // The engine may already be gone; the disconnect is what matters.
        let _ = self.stop().await;
        client.close_session(&self.identity).await
    }

    pub async fn send(&self, command: UciCommand) -> ClientResult<()> {
        tracing::debug!(identity = %self.identity, "UCI >> {}", command);
        let line = protocol::encode(&ClientMessage::UciCommand {
            text: command.to_line(),
            identity: Some(self.identity.clone()),
        })
        .map_err(|e| ClientError::Encode(e.to_string()))?;
        self.outbound
            .send(line)
            .await
            .map_err(|_| ClientError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode;

    async fn sent_text(rx: &mut mpsc::Receiver<String>) -> (String, Option<String>) {
        match decode::<ClientMessage>(&rx.recv().await.unwrap()).unwrap() {
            ClientMessage::UciCommand { text, identity } => (text, identity),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_commands_are_addressed() {
        let (tx, mut rx) = mpsc::channel(8);
        let session = Session::new("sf", tx);

        session
            .send_position(&StartPosition::Standard, &["e2e4".into(), "e7e5".into()])
            .await
            .unwrap();
        session.go(GoParams::movetime(250)).await.unwrap();
        session.send_raw("setoption name Threads value 2").await.unwrap();

        assert_eq!(
            sent_text(&mut rx).await,
            (
                "position startpos moves e2e4 e7e5".to_string(),
                Some("sf".to_string())
            )
        );
        assert_eq!(sent_text(&mut rx).await.0, "go movetime 250");
        assert_eq!(
            sent_text(&mut rx).await.0,
            "setoption name Threads value 2"
        );
    }

    #[tokio::test]
    async fn test_send_after_channel_closed() {
        let (tx, rx) = mpsc::channel(8);
        let session = Session::new("sf", tx);
        drop(rx);
        assert_eq!(session.stop().await, Err(ClientError::ConnectionClosed));
    }
}
