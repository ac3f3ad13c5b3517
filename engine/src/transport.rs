//! Duplex line channels to the bot host.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::error::{ClientError, ClientResult};

const CHANNEL_CAPACITY: usize = 64;

/// One end of an open channel: whole lines out, whole lines in, delivered in order.
///
/// The peer has gone away once `rx` yields `None`.
#[derive(Debug)]
pub struct Channel {
    pub tx: mpsc::Sender<String>,
    pub rx: mpsc::Receiver<String>,
}

/// Two connected in-memory channel ends.
pub fn channel_pair() -> (Channel, Channel) {
    let (a_tx, b_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (b_tx, a_rx) = mpsc::channel(CHANNEL_CAPACITY);
    (
        Channel { tx: a_tx, rx: a_rx },
        Channel { tx: b_tx, rx: b_rx },
    )
}

/// Opens channels to a bot host.
#[async_trait]
pub trait Connector: Send {
    async fn open(&mut self) -> ClientResult<Channel>;
}

/// Newline-delimited JSON over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn open(&mut self) -> ClientResult<Channel> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| ClientError::ConnectFailed(format!("{}: {}", self.addr, e)))?;
        tracing::info!(addr = %self.addr, "Connected to bot host");
        Ok(spawn_stream_tasks(stream, self.addr.clone()))
    }
}

fn spawn_stream_tasks(stream: TcpStream, addr: String) -> Channel {
    let (read_half, mut write_half) = stream.into_split();
    let (
        client,
        Channel {
            tx: inbound,
            rx: mut outbound,
        },
    ) = channel_pair();
    let span = tracing::info_span!("bot_channel", %addr);

    // Reader: socket -> client
    tokio::spawn(
        async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        tracing::trace!("<< {}", line);
                        if inbound.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("Bot host closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Error reading from bot host: {}", e);
                        break;
                    }
                }
            }
        }
        .instrument(span.clone()),
    );

    // Writer: client -> socket
    tokio::spawn(
        async move {
            while let Some(line) = outbound.recv().await {
                tracing::trace!(">> {}", line);
                let written = async {
                    write_half.write_all(line.as_bytes()).await?;
                    write_half.write_all(b"\n").await?;
                    write_half.flush().await
                };
                if let Err(e) = written.await {
                    tracing::error!("Failed to write to bot host: {}", e);
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        }
        .instrument(span),
    );

    client
}

/// Hands out pre-built channels in order; used to run the client against an in-process host.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    pending: VecDeque<Channel>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a channel end and return its peer.
    pub fn push_pair(&mut self) -> Channel {
        let (client, host) = channel_pair();
        self.pending.push_back(client);
        host
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&mut self) -> ClientResult<Channel> {
        self.pending
            .pop_front()
            .ok_or_else(|| ClientError::ConnectFailed("no in-memory channel queued".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_channel_pair_delivers_in_order() {
        let (mut a, mut b) = channel_pair();
        a.tx.send("one".into()).await.unwrap();
        a.tx.send("two".into()).await.unwrap();
        assert_eq!(b.rx.recv().await.as_deref(), Some("one"));
        assert_eq!(b.rx.recv().await.as_deref(), Some("two"));

        drop(b);
        assert_eq!(a.rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_memory_connector_runs_dry() {
        let mut connector = MemoryConnector::new();
        let _host = connector.push_pair();
        assert!(connector.open().await.is_ok());
        assert!(matches!(
            connector.open().await,
            Err(ClientError::ConnectFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_tcp_connector_frames_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (r, mut w) = socket.into_split();
            let mut lines = BufReader::new(r).lines();
            let got = lines.next_line().await.unwrap().unwrap();
            w.write_all(b"{\"type\":\"identities\",\"identities\":[]}\n")
                .await
                .unwrap();
            got
        });

        let mut channel = TcpConnector::new(addr).open().await.unwrap();
        channel.tx.send("{\"type\":\"list\"}".into()).await.unwrap();
        let reply = channel.rx.recv().await.unwrap();
        assert_eq!(reply, "{\"type\":\"identities\",\"identities\":[]}");
        assert_eq!(server.await.unwrap(), "{\"type\":\"list\"}");
    }

    #[tokio::test]
    async fn test_tcp_connector_reports_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(matches!(
            TcpConnector::new(addr).open().await,
            Err(ClientError::ConnectFailed(_))
        ));
    }
}
