//! Configuration for the bot host.
//!
//! The listen address and the engine table file can be set through environment variables;
//! command-line flags override both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use engine::{find_engine_path, EngineSpec};

/// Default listen address.
const DEFAULT_ADDR: &str = "127.0.0.1:7878";

/// Identity used for an engine found on the system when nothing is configured.
const FALLBACK_IDENTITY: &str = "stockfish";

/// Engines by identity. Sorted, so `list` answers are stable.
pub type EngineTable = BTreeMap<String, EngineSpec>;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Failed to read engine table {path}: {source}")]
    ReadTable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid engine table {path}: {source}")]
    ParseTable {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid engine argument {0:?}, expected name=path")]
    EngineArg(String),
    #[error("No engines configured and no stockfish found")]
    NoEngines,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Get the listen address.
///
/// Priority:
/// 1. `BOT_HOST_ADDR` env variable if set
/// 2. `127.0.0.1:7878` as fallback
pub fn get_listen_addr() -> String {
    std::env::var("BOT_HOST_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string())
}

/// Path of the JSON engine table from `BOT_HOST_ENGINES`, if set.
pub fn get_engines_file() -> Option<PathBuf> {
    std::env::var_os("BOT_HOST_ENGINES").map(PathBuf::from)
}

/// Parse a `name=path` flag value.
pub fn parse_engine_arg(arg: &str) -> Result<(String, EngineSpec), HostError> {
    match arg.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => Ok((
            name.trim().to_string(),
            EngineSpec::Path(PathBuf::from(path.trim())),
        )),
        _ => Err(HostError::EngineArg(arg.to_string())),
    }
}

/// Read a JSON object mapping identity to a path or `{ "path": ..., "args": [...] }`.
pub fn load_engine_table(path: &Path) -> Result<EngineTable, HostError> {
    let text = std::fs::read_to_string(path).map_err(|source| HostError::ReadTable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| HostError::ParseTable {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the engine table: file entries first, flags override them. With neither, fall back
/// to a stockfish found on the system.
pub fn resolve_engines(
    file: Option<&Path>,
    args: &[(String, EngineSpec)],
) -> Result<EngineTable, HostError> {
    let mut engines = match file {
        Some(path) => load_engine_table(path)?,
        None => EngineTable::new(),
    };
    for (name, spec) in args {
        engines.insert(name.clone(), spec.clone());
    }

    if engines.is_empty() {
        let path = find_engine_path().ok_or(HostError::NoEngines)?;
        tracing::info!(path = %path.display(), "Using system stockfish");
        engines.insert(FALLBACK_IDENTITY.to_string(), EngineSpec::Path(path));
    }
    Ok(engines)
}
