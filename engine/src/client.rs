//! Session registry: one channel to the bot host, many named engine sessions over it.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use crate::error::{ClientError, ClientResult, ReadyStage};
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::session::Session;
use crate::transport::{Channel, Connector};
use crate::uci::{parse_uci_message, UciCommand, UciMessage};

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Events surfaced by [`BotClient::next_event`], in receipt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Identities(Vec<String>),
    SessionConnected(String),
    SessionDisconnected(String),
    /// One line of engine output. `message` is `None` for lines that are not understood.
    EngineLine {
        identity: Option<String>,
        text: String,
        message: Option<UciMessage>,
    },
    Error(String),
    /// The channel closed. All session state has been reset.
    ConnectionLost,
}

/// Start-up progress of one session. `None` in the map means connect was requested but not
/// yet acknowledged.
type Readiness = Option<ReadyStage>;

/// Owns the duplex channel and the readiness of every session on it.
///
/// Single consumer: the owner drives inbound traffic through [`BotClient::next_event`], and
/// session start-up reads the channel itself while it waits for acknowledgements.
pub struct BotClient {
    connector: Box<dyn Connector>,
    state: ConnectionState,
    channel: Option<Channel>,
    sessions: HashMap<String, Readiness>,
    identities: Vec<String>,
    buffered: VecDeque<ClientEvent>,
    ready_timeout: Duration,
}

impl BotClient {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            state: ConnectionState::Disconnected,
            channel: None,
            sessions: HashMap::new(),
            identities: Vec::new(),
            buffered: VecDeque::new(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    /// Bound on each acknowledgement wait during [`BotClient::start_session`].
    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Identities from the most recent `identities` message.
    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    pub fn has_session(&self, identity: &str) -> bool {
        self.sessions.contains_key(identity)
    }

    pub fn readiness(&self, identity: &str) -> Option<ReadyStage> {
        self.sessions.get(identity).copied().flatten()
    }

    /// Open the channel and request the identity list.
    ///
    /// Resolves once the channel is open; the list arrives later as
    /// [`ClientEvent::Identities`]. Does nothing when already connected.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn connect(&mut self) -> ClientResult<()> {
        if self.channel.is_some() {
            return Ok(());
        }
        self.state = ConnectionState::Connecting;
        match self.connector.open().await {
            Ok(channel) => {
                self.channel = Some(channel);
                self.state = ConnectionState::Connected;
                tracing::info!("Bot channel open");
                self.send(&ClientMessage::List).await
            }
            Err(e) => {
                tracing::error!("Failed to connect: {}", e);
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Close the channel and forget every session. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if self.channel.is_some() {
            tracing::info!("Disconnecting from bot host");
        }
        self.reset();
    }

    /// Return the live session for `identity`, starting one if needed.
    ///
    /// A new session is only handed out after the host confirms the connection and the engine
    /// has answered both `uci` and `isready`. Each wait is bounded by the ready timeout.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn start_session(&mut self, identity: &str) -> ClientResult<Session> {
        let tx = self.outbound()?;
        if self.sessions.contains_key(identity) {
            return Ok(Session::new(identity, tx));
        }

        self.sessions.insert(identity.to_string(), None);
        match self.handshake(identity).await {
            Ok(()) => {
                tracing::info!("Session ready");
                Ok(Session::new(identity, tx))
            }
            Err(e) => {
                tracing::warn!("Session start failed: {}", e);
                if self.sessions.remove(identity).is_some() && self.channel.is_some() {
                    let _ = self
                        .send(&ClientMessage::Disconnect {
                            identity: identity.to_string(),
                        })
                        .await;
                }
                Err(e)
            }
        }
    }

    async fn handshake(&mut self, identity: &str) -> ClientResult<()> {
        self.send(&ClientMessage::Connect {
            identity: identity.to_string(),
        })
        .await?;
        self.wait_for(identity, ReadyStage::Connected).await?;

        self.send_uci(identity, &UciCommand::Uci).await?;
        self.wait_for(identity, ReadyStage::Initialized).await?;

        self.send_uci(identity, &UciCommand::IsReady).await?;
        self.wait_for(identity, ReadyStage::Ready).await
    }

    /// Read the channel until `identity` reaches `stage`, buffering everything read.
    async fn wait_for(&mut self, identity: &str, stage: ReadyStage) -> ClientResult<()> {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            match self.sessions.get(identity) {
                None => {
                    return Err(ClientError::Rejected {
                        identity: identity.to_string(),
                        message: "disconnected during start-up".to_string(),
                    })
                }
                Some(Some(reached)) if *reached >= stage => return Ok(()),
                Some(_) => {}
            }

            let Some(channel) = self.channel.as_mut() else {
                return Err(ClientError::NotConnected);
            };
            match timeout_at(deadline, channel.rx.recv()).await {
                Err(_) => {
                    return Err(ClientError::ReadyTimeout {
                        identity: identity.to_string(),
                        stage,
                    })
                }
                Ok(None) => {
                    self.connection_lost();
                    return Err(ClientError::ConnectionClosed);
                }
                Ok(Some(line)) => {
                    if let Some(event) = self.process_line(&line) {
                        self.buffered.push_back(event);
                    }
                }
            }
        }
    }

    /// Stop tracking `identity` and tell the host to drop it.
    pub async fn close_session(&mut self, identity: &str) -> ClientResult<()> {
        if self.sessions.remove(identity).is_none() {
            return Err(ClientError::NoSession(identity.to_string()));
        }
        tracing::info!(identity, "Closing session");
        self.send(&ClientMessage::Disconnect {
            identity: identity.to_string(),
        })
        .await
    }

    /// Next inbound event. Stays pending while disconnected.
    ///
    /// Cancel safe: nothing is lost if the future is dropped before completing.
    pub async fn next_event(&mut self) -> ClientEvent {
        loop {
            if let Some(event) = self.buffered.pop_front() {
                return event;
            }
            let Some(channel) = self.channel.as_mut() else {
                return std::future::pending().await;
            };
            match channel.rx.recv().await {
                None => {
                    self.connection_lost();
                }
                Some(line) => {
                    if let Some(event) = self.process_line(&line) {
                        return event;
                    }
                }
            }
        }
    }

    /// Send a UCI command to `identity` without going through a [`Session`].
    pub async fn send_uci(&mut self, identity: &str, command: &UciCommand) -> ClientResult<()> {
        if !self.sessions.contains_key(identity) {
            return Err(ClientError::NoSession(identity.to_string()));
        }
        tracing::debug!(identity, "UCI >> {}", command);
        self.send(&ClientMessage::UciCommand {
            text: command.to_line(),
            identity: Some(identity.to_string()),
        })
        .await
    }

    async fn send(&mut self, msg: &ClientMessage) -> ClientResult<()> {
        let tx = self.outbound()?;
        let line = protocol::encode(msg).map_err(|e| ClientError::Encode(e.to_string()))?;
        if tx.send(line).await.is_err() {
            self.connection_lost();
            return Err(ClientError::ConnectionClosed);
        }
        Ok(())
    }

    fn outbound(&self) -> ClientResult<tokio::sync::mpsc::Sender<String>> {
        self.channel
            .as_ref()
            .map(|c| c.tx.clone())
            .ok_or(ClientError::NotConnected)
    }

    /// Decode one inbound line and update registry state. Malformed lines are dropped.
    fn process_line(&mut self, line: &str) -> Option<ClientEvent> {
        let msg = match protocol::decode::<ServerMessage>(line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Dropping malformed message ({}): {}", e, line);
                return None;
            }
        };

        let event = match msg {
            ServerMessage::Identities { identities } => {
                tracing::debug!(?identities, "Engine identities");
                self.identities = identities.clone();
                ClientEvent::Identities(identities)
            }
            ServerMessage::Connected { identity } => {
                if let Some(readiness) = self.sessions.get_mut(&identity) {
                    readiness.get_or_insert(ReadyStage::Connected);
                }
                ClientEvent::SessionConnected(identity)
            }
            ServerMessage::Disconnected { identity } => {
                tracing::info!(%identity, "Session disconnected by host");
                self.sessions.remove(&identity);
                ClientEvent::SessionDisconnected(identity)
            }
            ServerMessage::Error { message } => {
                tracing::warn!("Bot host error: {}", message);
                ClientEvent::Error(message)
            }
            ServerMessage::EngineLine { text, identity } => {
                tracing::trace!(identity = ?identity, "UCI << {}", text);
                let message = parse_uci_message(&text).ok();
                if let (Some(id), Some(msg)) = (&identity, &message) {
                    self.advance_readiness(id, msg);
                }
                ClientEvent::EngineLine {
                    identity,
                    text,
                    message,
                }
            }
        };
        Some(event)
    }

    fn advance_readiness(&mut self, identity: &str, msg: &UciMessage) {
        let Some(readiness) = self.sessions.get_mut(identity) else {
            return;
        };
        let next = match msg {
            UciMessage::UciOk => ReadyStage::Initialized,
            UciMessage::ReadyOk => ReadyStage::Ready,
            _ => return,
        };
        // Acknowledgements only count once the previous stage was reached.
        if readiness.is_some_and(|current| current < next) {
            *readiness = Some(next);
        }
    }

    fn connection_lost(&mut self) {
        tracing::warn!("Bot channel closed");
        self.reset();
        self.buffered.push_back(ClientEvent::ConnectionLost);
    }

    fn reset(&mut self) {
        self.channel = None;
        self.state = ConnectionState::Disconnected;
        self.sessions.clear();
        self.identities.clear();
        self.buffered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryConnector;

    fn client() -> (BotClient, Channel) {
        let mut connector = MemoryConnector::new();
        let host = connector.push_pair();
        let client = BotClient::new(connector).with_ready_timeout(Duration::from_millis(200));
        (client, host)
    }

    async fn expect_sent(host: &mut Channel) -> ClientMessage {
        let line = host.rx.recv().await.unwrap();
        protocol::decode(&line).unwrap()
    }

    async fn reply(host: &Channel, msg: ServerMessage) {
        host.tx.send(protocol::encode(&msg).unwrap()).await.unwrap();
    }

    fn engine_line(identity: &str, text: &str) -> ServerMessage {
        ServerMessage::EngineLine {
            text: text.to_string(),
            identity: Some(identity.to_string()),
        }
    }

    /// Plays the host side of a full handshake for `identity`.
    async fn acknowledge(host: &mut Channel, identity: &str) {
        assert_eq!(
            expect_sent(host).await,
            ClientMessage::Connect {
                identity: identity.into()
            }
        );
        reply(
            host,
            ServerMessage::Connected {
                identity: identity.into(),
            },
        )
        .await;
        assert!(matches!(
            expect_sent(host).await,
            ClientMessage::UciCommand { text, .. } if text == "uci"
        ));
        reply(host, engine_line(identity, "id name Fake")).await;
        reply(host, engine_line(identity, "uciok")).await;
        assert!(matches!(
            expect_sent(host).await,
            ClientMessage::UciCommand { text, .. } if text == "isready"
        ));
        reply(host, engine_line(identity, "readyok")).await;
    }

    #[tokio::test]
    async fn test_connect_requests_identities() {
        let (mut client, mut host) = client();
        client.connect().await.unwrap();
        assert!(client.is_connected());
        assert_eq!(expect_sent(&mut host).await, ClientMessage::List);

        reply(
            &host,
            ServerMessage::Identities {
                identities: vec!["sf".into()],
            },
        )
        .await;
        assert_eq!(
            client.next_event().await,
            ClientEvent::Identities(vec!["sf".into()])
        );
        assert_eq!(client.identities(), ["sf".to_string()]);

        // Already connected: no second channel is opened.
        client.connect().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_session_waits_for_each_acknowledgement() {
        let (mut client, mut host) = client();
        client.connect().await.unwrap();
        expect_sent(&mut host).await;

        let host_task = tokio::spawn(async move {
            acknowledge(&mut host, "sf").await;
            host
        });
        let session = client.start_session("sf").await.unwrap();
        let mut host = host_task.await.unwrap();

        assert_eq!(session.identity(), "sf");
        assert_eq!(client.readiness("sf"), Some(ReadyStage::Ready));

        // Lines read during the handshake are delivered afterwards, in order.
        assert_eq!(
            client.next_event().await,
            ClientEvent::SessionConnected("sf".into())
        );
        assert!(matches!(
            client.next_event().await,
            ClientEvent::EngineLine { message: Some(UciMessage::Id { .. }), .. }
        ));
        assert!(matches!(
            client.next_event().await,
            ClientEvent::EngineLine { message: Some(UciMessage::UciOk), .. }
        ));

        // A second start reuses the session without another handshake.
        let again = client.start_session("sf").await.unwrap();
        again.stop().await.unwrap();
        assert!(matches!(
            expect_sent(&mut host).await,
            ClientMessage::UciCommand { text, .. } if text == "stop"
        ));
    }

    #[tokio::test]
    async fn test_start_session_times_out_without_readyok() {
        let (mut client, mut host) = client();
        client.connect().await.unwrap();
        expect_sent(&mut host).await;

        let host_task = tokio::spawn(async move {
            expect_sent(&mut host).await;
            reply(
                &host,
                ServerMessage::Connected {
                    identity: "slow".into(),
                },
            )
            .await;
            expect_sent(&mut host).await;
            reply(&host, engine_line("slow", "uciok")).await;
            expect_sent(&mut host).await;
            // Never answers isready.
            let closing = expect_sent(&mut host).await;
            (host, closing)
        });

        let err = client.start_session("slow").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::ReadyTimeout {
                identity: "slow".into(),
                stage: ReadyStage::Ready,
            }
        );
        assert!(!client.has_session("slow"));

        let (_host, closing) = host_task.await.unwrap();
        assert_eq!(
            closing,
            ClientMessage::Disconnect {
                identity: "slow".into()
            }
        );
    }

    #[tokio::test]
    async fn test_host_rejection_during_start() {
        let (mut client, mut host) = client();
        client.connect().await.unwrap();
        expect_sent(&mut host).await;

        let host_task = tokio::spawn(async move {
            expect_sent(&mut host).await;
            reply(
                &host,
                ServerMessage::Error {
                    message: "unknown engine ghost".into(),
                },
            )
            .await;
            reply(
                &host,
                ServerMessage::Disconnected {
                    identity: "ghost".into(),
                },
            )
            .await;
            host
        });

        let err = client.start_session("ghost").await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));
        let _host = host_task.await.unwrap();

        assert_eq!(
            client.next_event().await,
            ClientEvent::Error("unknown engine ghost".into())
        );
        assert_eq!(
            client.next_event().await,
            ClientEvent::SessionDisconnected("ghost".into())
        );
    }

    #[tokio::test]
    async fn test_malformed_messages_are_dropped() {
        let (mut client, mut host) = client();
        client.connect().await.unwrap();
        expect_sent(&mut host).await;

        host.tx.send("{not json".into()).await.unwrap();
        host.tx.send(r#"{"type":"warp"}"#.into()).await.unwrap();
        reply(&host, engine_line("sf", "gibberish")).await;

        assert_eq!(
            client.next_event().await,
            ClientEvent::EngineLine {
                identity: Some("sf".into()),
                text: "gibberish".into(),
                message: None,
            }
        );
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_channel_close_resets_state() {
        let (mut client, mut host) = client();
        client.connect().await.unwrap();
        expect_sent(&mut host).await;

        let host_task = tokio::spawn(async move {
            acknowledge(&mut host, "sf").await;
            host
        });
        client.start_session("sf").await.unwrap();
        drop(host_task.await.unwrap());

        // Buffered handshake events come first, then the loss.
        let mut last = client.next_event().await;
        while last != ClientEvent::ConnectionLost {
            last = client.next_event().await;
        }
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.has_session("sf"));
        assert_eq!(
            client.start_session("sf").await.unwrap_err(),
            ClientError::NotConnected
        );
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (mut client, _host) = client();
        client.disconnect();
        client.connect().await.unwrap();
        client.disconnect();
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(
            client.close_session("sf").await.unwrap_err(),
            ClientError::NoSession("sf".into())
        );
    }

    #[tokio::test]
    async fn test_close_session_notifies_host() {
        let (mut client, mut host) = client();
        client.connect().await.unwrap();
        expect_sent(&mut host).await;

        let host_task = tokio::spawn(async move {
            acknowledge(&mut host, "sf").await;
            host
        });
        let session = client.start_session("sf").await.unwrap();
        let mut host = host_task.await.unwrap();

        session.close(&mut client).await.unwrap();
        assert!(!client.has_session("sf"));
        assert!(matches!(
            expect_sent(&mut host).await,
            ClientMessage::UciCommand { text, .. } if text == "stop"
        ));
        assert_eq!(
            expect_sent(&mut host).await,
            ClientMessage::Disconnect {
                identity: "sf".into()
            }
        );
    }
}
