pub mod command;
pub mod parser;

pub use command::{GoParams, UciCommand, DEFAULT_MOVETIME_MS};
pub use parser::{parse_search_info, parse_uci_message, UciMessage};

#[derive(Debug, thiserror::Error)]
pub enum UciError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine has no stdin")]
    NoStdin,
    #[error("Engine has no stdout")]
    NoStdout,
    #[error("Malformed UCI message: {0}")]
    MalformedMessage(String),
    #[error("Unknown UCI message: {0}")]
    UnknownMessage(String),
    #[error("Info line without depth: {0}")]
    NoDepth(String),
    #[error("Engine input closed")]
    InputClosed,
}
