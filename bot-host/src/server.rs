//! The host end of the channel: one JSON message per line, one engine process per `connect`.

use std::collections::HashMap;
use std::sync::Arc;

use engine::protocol::{decode, encode};
use engine::{ClientMessage, EngineProcess, ProcessEvent, ServerMessage};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{EngineTable, HostError};

/// Accept connections until the listener fails.
pub async fn serve(listener: TcpListener, engines: Arc<EngineTable>) -> Result<(), HostError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let id = Uuid::new_v4();
        tracing::info!(%id, %peer, "Client connected");
        tokio::spawn(
            serve_connection(stream, engines.clone())
                .instrument(tracing::info_span!("connection", %id)),
        );
    }
}

/// Engines started for one client connection.
struct Connection {
    engines: Arc<EngineTable>,
    running: HashMap<String, EngineProcess>,
    /// Processes shut down whose exit has not been reported yet.
    retired: HashMap<String, usize>,
    process_tx: mpsc::Sender<ProcessEvent>,
}

/// Serve one client until it hangs up. All of its engines are shut down afterwards.
pub async fn serve_connection<S>(stream: S, engines: Arc<EngineTable>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();
    let (process_tx, mut process_rx) = mpsc::channel(256);
    let mut conn = Connection {
        engines,
        running: HashMap::new(),
        retired: HashMap::new(),
        process_tx,
    };

    loop {
        let replies = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => conn.handle_line(&line).await,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Read error: {}", e);
                    break;
                }
            },
            Some(event) = process_rx.recv() => conn.handle_process_event(event),
        };

        if let Err(e) = write_messages(&mut writer, &replies).await {
            tracing::warn!("Write error: {}", e);
            break;
        }
    }

    conn.shutdown_all().await;
    tracing::info!("Client disconnected");
}

async fn write_messages<W: AsyncWrite + Unpin>(
    writer: &mut W,
    messages: &[ServerMessage],
) -> std::io::Result<()> {
    if messages.is_empty() {
        return Ok(());
    }
    for msg in messages {
        let line = encode(msg).map_err(std::io::Error::other)?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await
}

impl Connection {
    async fn handle_line(&mut self, line: &str) -> Vec<ServerMessage> {
        if line.trim().is_empty() {
            return Vec::new();
        }
        let msg = match decode::<ClientMessage>(line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Malformed message ({}): {}", e, line);
                return vec![ServerMessage::Error {
                    message: format!("malformed message: {}", e),
                }];
            }
        };
        tracing::debug!(?msg, "Client message");

        match msg {
            ClientMessage::List => vec![ServerMessage::Identities {
                identities: self.engines.keys().cloned().collect(),
            }],
            ClientMessage::Connect { identity } => self.connect(identity),
            ClientMessage::Disconnect { identity } => {
                if let Some(process) = self.running.remove(&identity) {
                    *self.retired.entry(identity.clone()).or_default() += 1;
                    process.shutdown().await;
                }
                vec![ServerMessage::Disconnected { identity }]
            }
            ClientMessage::UciCommand {
                text,
                identity: Some(identity),
            } => match self.running.get(&identity) {
                Some(process) => match process.send_line(&text).await {
                    Ok(()) => Vec::new(),
                    Err(e) => vec![ServerMessage::Error {
                        message: format!("{}: {}", identity, e),
                    }],
                },
                None => vec![ServerMessage::Error {
                    message: format!("{} is not connected", identity),
                }],
            },
            ClientMessage::UciCommand {
                text,
                identity: None,
            } => {
                for process in self.running.values() {
                    if let Err(e) = process.send_line(&text).await {
                        tracing::warn!(identity = process.identity(), "Broadcast failed: {}", e);
                    }
                }
                Vec::new()
            }
        }
    }

    fn connect(&mut self, identity: String) -> Vec<ServerMessage> {
        if self.running.contains_key(&identity) {
            return vec![ServerMessage::Connected { identity }];
        }
        let Some(spec) = self.engines.get(&identity) else {
            tracing::warn!(%identity, "Unknown engine requested");
            return vec![
                ServerMessage::Error {
                    message: format!("Unknown engine {}", identity),
                },
                ServerMessage::Disconnected { identity },
            ];
        };

        match EngineProcess::spawn(&identity, spec, self.process_tx.clone()) {
            Ok(process) => {
                self.running.insert(identity.clone(), process);
                vec![ServerMessage::Connected { identity }]
            }
            Err(e) => vec![
                ServerMessage::Error {
                    message: format!("Failed to start {}: {}", identity, e),
                },
                ServerMessage::Disconnected { identity },
            ],
        }
    }

    fn handle_process_event(&mut self, event: ProcessEvent) -> Vec<ServerMessage> {
        match event {
            ProcessEvent::Line { identity, text } => {
                if self.retired.contains_key(&identity) && !self.running.contains_key(&identity) {
                    return Vec::new();
                }
                vec![ServerMessage::EngineLine {
                    text,
                    identity: Some(identity),
                }]
            }
            ProcessEvent::Exited { identity } => {
                if let Some(pending) = self.retired.get_mut(&identity) {
                    *pending -= 1;
                    if *pending == 0 {
                        self.retired.remove(&identity);
                    }
                    return Vec::new();
                }
                match self.running.remove(&identity) {
                    Some(_) => {
                        tracing::warn!(%identity, "Engine exited");
                        vec![ServerMessage::Disconnected { identity }]
                    }
                    None => Vec::new(),
                }
            }
        }
    }

    async fn shutdown_all(&mut self) {
        for (_, process) in self.running.drain() {
            process.shutdown().await;
        }
    }
}
