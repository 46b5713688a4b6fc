//! Live session state: the connection gate, the outgoing channel and
//! the incoming listener task.

use std::sync::Arc;

use chatline_core::{ConnectionState, DisplayBuffer};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    sync::Mutex,
    task::JoinHandle,
};
use uuid::Uuid;

use crate::protocol::{self, OutboundLine};

/// Status line shown when the transport fails mid-session.
const LOST_STATUS: &str = "Connection to server lost";

/// Send error.
#[derive(Debug, Error)]
pub enum SendError {
    /// The session is not in the `Connected` state; no I/O was
    /// performed.
    #[error("not connected to a server")]
    NotConnected,
    /// Writing to the transport failed; the session has been torn
    /// down.
    #[error("write to server failed: {0}")]
    Transport(#[from] std::io::Error),
}

/// The state both execution contexts must observe consistently: the
/// connection state and the write half it gates.
///
/// Kept behind one mutex so a send can never slip past a teardown
/// that has logically started.
pub(crate) struct Gate {
    state: ConnectionState,
    writer: Option<OwnedWriteHalf>,
}

impl Gate {
    /// Transition out of the session states, dropping the write half.
    ///
    /// Returns whether this call performed the transition; the first
    /// caller to tear down a live session gets `true` and owns any
    /// user-visible notification.
    fn tear_down(&mut self) -> bool {
        let was_live = self.state.has_session();
        self.state = ConnectionState::Disconnected;
        self.writer = None;
        was_live
    }
}

/// State shared between the caller context and the listener task.
pub(crate) struct Shared {
    pub(crate) gate: Mutex<Gate>,
    pub(crate) display: Arc<DisplayBuffer>,
    pub(crate) id: Uuid,
}

impl Shared {
    pub(crate) fn connected(display: Arc<DisplayBuffer>, writer: OwnedWriteHalf) -> Self {
        Self {
            gate: Mutex::new(Gate {
                state: ConnectionState::Connected,
                writer: Some(writer),
            }),
            display,
            id: Uuid::new_v4(),
        }
    }

    pub(crate) async fn state(&self) -> ConnectionState {
        self.gate.lock().await.state
    }

    /// Tear down after an I/O failure, emitting the lost-connection
    /// status line exactly once per session.
    pub(crate) async fn fail(&self) {
        if self.gate.lock().await.tear_down() {
            self.display.append_status(LOST_STATUS);
        }
    }

    /// Tear down silently (explicit disconnect or supersession).
    pub(crate) async fn close(&self) {
        self.gate.lock().await.tear_down();
    }
}

/// Write one line plus terminator and flush it.
///
/// Each outgoing line is written as a single buffer so it reaches the
/// OS send buffer whole before the call returns.
pub(crate) async fn write_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    line: &str,
) -> std::io::Result<()> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    writer.write_all(buf.as_bytes()).await?;
    writer.flush().await
}

/// Cloneable handle for sending chat lines over a session.
///
/// Valid only while its session is `Connected`; any teardown
/// invalidates every clone at once.
#[derive(Clone)]
pub struct OutgoingChannel {
    pub(crate) screen_name: Arc<str>,
    pub(crate) shared: Arc<Shared>,
}

impl OutgoingChannel {
    /// Send one chat message as a single wire line.
    ///
    /// `text` must not contain a line terminator; the protocol has no
    /// escaping and the transport would split it into two lines.
    ///
    /// # Errors
    /// [`SendError::NotConnected`] if the session is not connected
    /// (no I/O is performed); [`SendError::Transport`] if the write
    /// fails, which also tears the session down.
    pub async fn send(&self, text: &str) -> Result<(), SendError> {
        let mut gate = self.shared.gate.lock().await;
        if gate.state != ConnectionState::Connected {
            return Err(SendError::NotConnected);
        }
        let Some(writer) = gate.writer.as_mut() else {
            return Err(SendError::NotConnected);
        };

        let line = OutboundLine::Chat {
            screen_name: &self.screen_name,
            text,
        }
        .encode();

        match write_line(writer, &line).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(session = %self.shared.id, error = %e, "write to server failed");
                if gate.tear_down() {
                    self.shared.display.append_status(LOST_STATUS);
                }
                Err(SendError::Transport(e))
            }
        }
    }

    /// Current state of the underlying session.
    pub async fn state(&self) -> ConnectionState {
        self.shared.state().await
    }
}

/// One live connection to the chat room server.
///
/// Holds the outgoing channel and the handle of the background
/// listener that owns the read half of the transport.
pub struct Session {
    pub(crate) screen_name: Arc<str>,
    pub(crate) outgoing: OutgoingChannel,
    pub(crate) listener: JoinHandle<()>,
}

impl Session {
    /// Identifier of this session, for log correlation.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.outgoing.shared.id
    }

    /// Screen name the session signed on with.
    #[must_use]
    pub fn screen_name(&self) -> &str {
        &self.screen_name
    }

    /// Handle for sending chat lines.
    #[must_use]
    pub fn outgoing(&self) -> OutgoingChannel {
        self.outgoing.clone()
    }

    /// Send one chat message.
    ///
    /// # Errors
    /// See [`OutgoingChannel::send`].
    pub async fn send(&self, text: &str) -> Result<(), SendError> {
        self.outgoing.send(text).await
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.outgoing.shared.state().await
    }

    /// Wait until the incoming listener terminates (connection lost,
    /// peer close, or supersession).
    pub async fn wait_closed(self) {
        // JoinError only happens when the listener was aborted by a
        // superseding connect or an explicit disconnect.
        let _ = self.listener.await;
    }
}

/// Incoming listener loop: reads one line at a time, appends each to
/// the display buffer verbatim, and tears the session down once on
/// end-of-stream or I/O error.
pub(crate) async fn run_listener(shared: Arc<Shared>, read_half: OwnedReadHalf) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => shared.display.append(protocol::decode_incoming(&line)),
            Ok(None) => {
                tracing::info!(session = %shared.id, "server closed the connection");
                break;
            }
            Err(e) => {
                tracing::warn!(session = %shared.id, error = %e, "read from server failed");
                break;
            }
        }
    }
    shared.fail().await;
}
