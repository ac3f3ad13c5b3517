//! Game arbiter: the authoritative game plus auto-play against engines served by a bot host.
//!
//! [`spawn_arbiter`] starts one actor that owns the [`chess::GameStore`] and the
//! [`engine::BotClient`]. Everything else talks to it through an [`ArbiterHandle`].

pub mod config;
pub mod coordinator;

pub use config::ArbiterConfig;
pub use coordinator::{
    spawn_arbiter, ArbiterError, ArbiterEvent, ArbiterHandle, ArbiterSnapshot, Navigation,
    Participant, PendingMove,
};
