//! Live presence channel
//!
//! - [`socketio`]: Socket.IO client over a websocket
//! - [`reporter`]: decides what to send each tick and owns the channel
//!
//! The reporter task is the only owner of the channel; everyone else talks
//! to it through [`LiveCommand`]s.

pub mod reporter;
pub mod socketio;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{GameId, LiveError, PlayerId};

pub use reporter::{plan, LiveAction, LiveSettings, LiveStats};
pub use socketio::SocketIoChannel;

/// Event names understood by the server
pub mod events {
    pub const LOGIN: &str = "login";
    pub const SUBMIT: &str = "submit";
    pub const STATUS_UPDATE: &str = "status_update";
    pub const GAME_SUBMITTED: &str = "game_submitted";
}

/// Connection state of the live channel
///
/// A disconnect or error from any state goes straight back to
/// `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    LoggedIn,
}

impl PresenceState {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::LoggedIn => "Logged in",
        }
    }
}

/// Requests for the reporter from other tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveCommand {
    GameSubmitted { game_id: GameId, notify_player_best: bool, notify_above_1000: bool },
}

/// Publish side of the live channel
#[async_trait]
pub trait LiveChannel: Send {
    fn state(&self) -> PresenceState;

    /// Connect and log in as `player`
    async fn connect(&mut self, player: PlayerId) -> Result<(), LiveError>;

    async fn disconnect(&mut self) -> Result<(), LiveError>;

    /// Send a named event with positional arguments
    async fn emit(&mut self, event: &str, args: Vec<Value>) -> Result<(), LiveError>;
}
