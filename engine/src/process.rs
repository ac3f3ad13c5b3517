//! Local UCI engine processes, as run by the bot host.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::uci::{UciCommand, UciError};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// How to launch an engine: a bare path, or a path plus arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineSpec {
    Path(PathBuf),
    Command {
        path: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl EngineSpec {
    pub fn path(&self) -> &Path {
        match self {
            Self::Path(path) | Self::Command { path, .. } => path,
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            Self::Path(_) => &[],
            Self::Command { args, .. } => args,
        }
    }
}

/// Output of a running engine process, tagged with the identity it was started under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Line { identity: String, text: String },
    Exited { identity: String },
}

pub struct EngineProcess {
    identity: String,
    process: Child,
    stdin: mpsc::Sender<String>,
}

impl EngineProcess {
    /// Spawn `spec` and forward every stdout line to `events`.
    ///
    /// No handshake is performed; the caller drives `uci`/`isready` itself.
    #[tracing::instrument(level = "info", skip(spec, events))]
    pub fn spawn(
        identity: &str,
        spec: &EngineSpec,
        events: mpsc::Sender<ProcessEvent>,
    ) -> Result<Self, UciError> {
        tracing::info!(path = ?spec.path(), "Spawning engine process");
        let mut process = tokio::process::Command::new(spec.path())
            .args(spec.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                UciError::Io(e)
            })?;

        let mut stdin = process.stdin.take().ok_or(UciError::NoStdin)?;
        let stdout = process.stdout.take().ok_or(UciError::NoStdout)?;
        let span = tracing::info_span!("engine", %identity);

        // Output reader
        let id = identity.to_string();
        tokio::spawn(
            async move {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            let text = line.trim_end().to_string();
                            tracing::trace!("UCI << {}", text);
                            let event = ProcessEvent::Line {
                                identity: id.clone(),
                                text,
                            };
                            if events.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            tracing::info!("Engine stdout EOF");
                            break;
                        }
                        Err(e) => {
                            tracing::error!("Error reading engine stdout: {}", e);
                            break;
                        }
                    }
                }
                let _ = events.send(ProcessEvent::Exited { identity: id }).await;
            }
            .instrument(span.clone()),
        );

        // Stdin writer
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(
            async move {
                while let Some(line) = stdin_rx.recv().await {
                    tracing::trace!("UCI >> {}", line);
                    let written = async {
                        stdin.write_all(line.as_bytes()).await?;
                        stdin.write_all(b"\n").await?;
                        stdin.flush().await
                    };
                    if let Err(e) = written.await {
                        tracing::error!("Failed to write to engine stdin: {}", e);
                        break;
                    }
                }
                tracing::debug!("Stdin writer exiting");
            }
            .instrument(span),
        );

        Ok(Self {
            identity: identity.to_string(),
            process,
            stdin: stdin_tx,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Queue one line for the engine's stdin.
    pub async fn send_line(&self, line: &str) -> Result<(), UciError> {
        self.stdin
            .send(line.trim_end().to_string())
            .await
            .map_err(|_| UciError::InputClosed)
    }

    /// Ask the engine to quit, then kill it if it lingers.
    pub async fn shutdown(mut self) {
        tracing::info!(identity = %self.identity, "Shutting down engine");
        let _ = self.send_line(&UciCommand::Quit.to_line()).await;
        if tokio::time::timeout(SHUTDOWN_GRACE, self.process.wait())
            .await
            .is_err()
        {
            tracing::warn!(identity = %self.identity, "Engine ignored quit, killing");
            let _ = self.process.kill().await;
        }
    }
}

/// Find a Stockfish executable in common locations
pub fn find_engine_path() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];

    if let Some(found) = CANDIDATES.iter().map(Path::new).find(|p| p.exists()) {
        return Some(found.to_path_buf());
    }

    // Fall back to PATH lookup.
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join("stockfish"))
            .find(|p| p.is_file())
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const FAKE_ENGINE: &str = r#"
while read line; do
  case "$line" in
    uci) echo "id name Fake"; echo "uciok" ;;
    isready) echo "readyok" ;;
    quit) exit 0 ;;
  esac
done
"#;

    fn fake_engine(dir: &tempfile::TempDir) -> EngineSpec {
        let script = dir.path().join("fake.sh");
        std::fs::write(&script, FAKE_ENGINE).unwrap();
        EngineSpec::Command {
            path: PathBuf::from("/bin/sh"),
            args: vec![script.to_string_lossy().into_owned()],
        }
    }

    async fn next_line(rx: &mut mpsc::Receiver<ProcessEvent>) -> String {
        match rx.recv().await.unwrap() {
            ProcessEvent::Line { text, .. } => text,
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_engine_process_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let engine = EngineProcess::spawn("fake", &fake_engine(&dir), tx).unwrap();

        engine.send_line("uci").await.unwrap();
        assert_eq!(next_line(&mut rx).await, "id name Fake");
        assert_eq!(next_line(&mut rx).await, "uciok");
        engine.send_line("isready").await.unwrap();
        assert_eq!(next_line(&mut rx).await, "readyok");

        engine.shutdown().await;
        assert_eq!(
            rx.recv().await,
            Some(ProcessEvent::Exited {
                identity: "fake".into()
            })
        );
    }

    #[tokio::test]
    async fn test_spawn_missing_executable_fails() {
        let (tx, _rx) = mpsc::channel(1);
        let spec = EngineSpec::Path(PathBuf::from("/definitely/not/an/engine"));
        assert!(matches!(
            EngineProcess::spawn("ghost", &spec, tx),
            Err(UciError::Io(_))
        ));
    }

    #[test]
    fn test_engine_spec_accepts_both_forms() {
        let bare: EngineSpec = serde_json::from_str(r#""/usr/bin/stockfish""#).unwrap();
        assert_eq!(bare.path(), Path::new("/usr/bin/stockfish"));
        assert!(bare.args().is_empty());

        let full: EngineSpec =
            serde_json::from_str(r#"{"path":"/bin/sh","args":["engine.sh"]}"#).unwrap();
        assert_eq!(full.path(), Path::new("/bin/sh"));
        assert_eq!(full.args(), ["engine.sh".to_string()]);
    }
}
