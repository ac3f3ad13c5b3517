//! Engine session protocol client: UCI line parsing and command building, the JSON channel
//! protocol spoken with the bot host, and the session registry multiplexing engines over it.

pub mod client;
pub mod error;
pub mod process;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod uci;

pub use client::{BotClient, ClientEvent, ConnectionState, DEFAULT_READY_TIMEOUT};
pub use error::{ClientError, ClientResult, ReadyStage};
pub use process::{find_engine_path, EngineProcess, EngineSpec, ProcessEvent};
pub use protocol::{ClientMessage, ServerMessage};
pub use session::Session;
pub use transport::{channel_pair, Channel, Connector, MemoryConnector, TcpConnector};
pub use uci::{parse_search_info, parse_uci_message, GoParams, UciCommand, UciError, UciMessage};
