//! Connection lifecycle state.

use serde::{Deserialize, Serialize};

/// State of the connection to the chat room server.
///
/// Sends are only accepted in [`Connected`](Self::Connected); every
/// other state invalidates the outgoing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection attempt has been made, or the last session ended.
    Disconnected,
    /// A connect attempt is in flight; the sign-on has not completed.
    Connecting,
    /// The session is live and the outgoing channel is valid.
    Connected,
    /// The last connect attempt failed; a new connect may be issued.
    Failed,
}

impl ConnectionState {
    /// Whether a session exists in this state.
    #[must_use]
    pub const fn has_session(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}
