//! Connection manager: connect orchestration and session lifecycle.

use std::sync::Arc;

use chatline_core::{ConnectionState, DisplayBuffer};
use thiserror::Error;
use tokio::net::TcpStream;

use crate::protocol::OutboundLine;
use crate::session::{self, OutgoingChannel, SendError, Session, Shared, write_line};

const CONNECTING_STATUS: &str = "Connecting to server...";
const CONNECTED_STATUS: &str = "Connected";
const FAILED_STATUS: &str = "Failed to connect to server.";

/// Connect error.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Opening the transport failed (resolution, refusal, timeout).
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),
    /// The transport opened but writing the sign-on line failed.
    #[error("sign-on failed: {0}")]
    SignOn(#[source] std::io::Error),
}

/// The manager's record of the current session.
struct ActiveSession {
    outgoing: OutgoingChannel,
    shared: Arc<Shared>,
    listener_abort: tokio::task::AbortHandle,
}

struct Inner {
    session: Option<ActiveSession>,
    /// State reported while no session is stored.
    idle: ConnectionState,
}

/// Owns the connection lifecycle for one chat client instance.
///
/// At most one session is active at a time; a new
/// [`connect`](Self::connect) supersedes the previous session, and
/// every lifecycle transition is surfaced as a status line on the
/// shared [`DisplayBuffer`].
pub struct ConnectionManager {
    display: Arc<DisplayBuffer>,
    inner: tokio::sync::Mutex<Inner>,
}

impl ConnectionManager {
    /// Create a manager appending to the given display buffer.
    #[must_use]
    pub fn new(display: Arc<DisplayBuffer>) -> Self {
        Self {
            display,
            inner: tokio::sync::Mutex::new(Inner {
                session: None,
                idle: ConnectionState::Disconnected,
            }),
        }
    }

    /// The display buffer this manager appends to.
    #[must_use]
    pub fn display(&self) -> &Arc<DisplayBuffer> {
        &self.display
    }

    /// Connect to the chat room server and sign on.
    ///
    /// Emits a "connecting" status line, opens the transport, writes
    /// the sign-on line first (fire-and-forget, flushed), spawns the
    /// incoming listener and returns the new [`Session`]. Any prior
    /// session is torn down first. Blocks until the underlying
    /// connect completes or fails (OS-level timeout only).
    ///
    /// # Errors
    /// [`ConnectError`] if the transport cannot be opened or the
    /// sign-on write fails; a "failed to connect" status line is
    /// emitted, the state is left at `Failed` and no session exists.
    pub async fn connect(
        &self,
        host: &str,
        port: u16,
        screen_name: &str,
    ) -> Result<Session, ConnectError> {
        let mut inner = self.inner.lock().await;

        if let Some(old) = inner.session.take() {
            tracing::debug!(session = %old.shared.id, "superseding previous session");
            old.shared.close().await;
            old.listener_abort.abort();
        }

        inner.idle = ConnectionState::Connecting;
        self.display.append_status(CONNECTING_STATUS);

        let stream = match TcpStream::connect((host, port)).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(host, port, error = %e, "connect failed");
                inner.idle = ConnectionState::Failed;
                self.display.append_status(FAILED_STATUS);
                return Err(ConnectError::Connect(e));
            }
        };

        let (read_half, mut write_half) = stream.into_split();

        // The sign-on line is strictly the first write on this
        // transport; the outgoing channel does not exist yet.
        let sign_on = OutboundLine::SignOn { screen_name }.encode();
        if let Err(e) = write_line(&mut write_half, &sign_on).await {
            tracing::warn!(host, port, error = %e, "sign-on write failed");
            inner.idle = ConnectionState::Failed;
            self.display.append_status(FAILED_STATUS);
            return Err(ConnectError::SignOn(e));
        }

        let shared = Arc::new(Shared::connected(Arc::clone(&self.display), write_half));
        let listener = tokio::spawn(session::run_listener(Arc::clone(&shared), read_half));

        let outgoing = OutgoingChannel {
            screen_name: Arc::from(screen_name),
            shared: Arc::clone(&shared),
        };

        inner.session = Some(ActiveSession {
            outgoing: outgoing.clone(),
            shared: Arc::clone(&shared),
            listener_abort: listener.abort_handle(),
        });
        inner.idle = ConnectionState::Disconnected;
        drop(inner);

        self.display.append_status(CONNECTED_STATUS);
        tracing::info!(session = %shared.id, host, port, screen_name, "connected");

        Ok(Session {
            screen_name: Arc::from(screen_name),
            outgoing,
            listener,
        })
    }

    /// Send one chat message over the current session.
    ///
    /// # Errors
    /// [`SendError::NotConnected`] if there is no connected session;
    /// [`SendError::Transport`] if the write fails.
    pub async fn send(&self, text: &str) -> Result<(), SendError> {
        let outgoing = {
            let inner = self.inner.lock().await;
            inner.session.as_ref().map(|s| s.outgoing.clone())
        };
        match outgoing {
            Some(channel) => channel.send(text).await,
            None => Err(SendError::NotConnected),
        }
    }

    /// Tear down the current session, if any.
    ///
    /// The outgoing channel becomes invalid immediately; the listener
    /// task is stopped and the transport closed. No status line is
    /// emitted.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(old) = inner.session.take() {
            tracing::info!(session = %old.shared.id, "disconnecting");
            old.shared.close().await;
            old.listener_abort.abort();
        }
        inner.idle = ConnectionState::Disconnected;
    }

    /// Current connection state.
    ///
    /// Reports the live session's state, or the outcome of the last
    /// connect attempt when no session exists. May wait for an
    /// in-flight `connect` on this manager to finish.
    pub async fn state(&self) -> ConnectionState {
        let inner = self.inner.lock().await;
        match &inner.session {
            Some(session) => session.shared.state().await,
            None => inner.idle,
        }
    }
}
