//! End-to-end tests against a loopback TCP server standing in for the
//! chat room server.

use std::{sync::Arc, time::Duration};

use chatline_client::{ConnectionManager, SendError};
use chatline_core::{ConnectionState, DisplayBuffer, DisplayLine};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::broadcast,
    time::timeout,
};

const TICK: Duration = Duration::from_secs(5);

fn manager() -> (Arc<DisplayBuffer>, ConnectionManager) {
    let display = Arc::new(DisplayBuffer::new(100));
    let manager = ConnectionManager::new(Arc::clone(&display));
    (display, manager)
}

async fn accept_lines(
    listener: &TcpListener,
) -> tokio::io::Lines<BufReader<TcpStream>> {
    let (stream, _) = timeout(TICK, listener.accept()).await.unwrap().unwrap();
    BufReader::new(stream).lines()
}

async fn next_line(lines: &mut tokio::io::Lines<BufReader<TcpStream>>) -> String {
    timeout(TICK, lines.next_line())
        .await
        .unwrap()
        .unwrap()
        .expect("peer closed before a line arrived")
}

/// Wait for a specific status line on the display event stream.
async fn await_status(rx: &mut broadcast::Receiver<DisplayLine>, text: &str) {
    loop {
        let line = timeout(TICK, rx.recv()).await.unwrap().unwrap();
        if line == DisplayLine::status(text) {
            return;
        }
    }
}

#[tokio::test]
async fn sign_on_is_the_first_line_on_the_wire() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (display, manager) = manager();

    let session = manager.connect("127.0.0.1", port, "alice").await.unwrap();
    assert_eq!(session.state().await, ConnectionState::Connected);
    assert_eq!(session.screen_name(), "alice");

    let mut lines = accept_lines(&listener).await;
    assert_eq!(next_line(&mut lines).await, "alice:SIGN-ON");

    let statuses = display.lines();
    assert_eq!(
        statuses,
        vec![
            DisplayLine::status("Connecting to server..."),
            DisplayLine::status("Connected"),
        ]
    );
}

#[tokio::test]
async fn send_writes_exactly_one_line_per_call() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (_display, manager) = manager();

    let session = manager.connect("127.0.0.1", port, "bob").await.unwrap();
    let mut lines = accept_lines(&listener).await;
    assert_eq!(next_line(&mut lines).await, "bob:SIGN-ON");

    session.send("hi").await.unwrap();
    session.send("").await.unwrap();
    manager.send("one more").await.unwrap();

    assert_eq!(next_line(&mut lines).await, "bob: hi");
    assert_eq!(next_line(&mut lines).await, "bob: ");
    assert_eq!(next_line(&mut lines).await, "bob: one more");
}

#[tokio::test]
async fn incoming_lines_are_displayed_verbatim() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (display, manager) = manager();
    let mut events = display.subscribe();

    let _session = manager.connect("127.0.0.1", port, "carol").await.unwrap();
    let (mut server, _) = timeout(TICK, listener.accept()).await.unwrap().unwrap();

    server.write_all(b"dave: hello\n<< motd >>\n").await.unwrap();

    await_status(&mut events, "Connected").await;
    let first = timeout(TICK, events.recv()).await.unwrap().unwrap();
    let second = timeout(TICK, events.recv()).await.unwrap().unwrap();
    assert_eq!(first, DisplayLine::chat("dave: hello"));
    assert_eq!(second, DisplayLine::chat("<< motd >>"));
}

#[tokio::test]
async fn peer_close_emits_one_lost_line_and_invalidates_sends() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (display, manager) = manager();
    let mut events = display.subscribe();

    let session = manager.connect("127.0.0.1", port, "erin").await.unwrap();
    let (server, _) = timeout(TICK, listener.accept()).await.unwrap().unwrap();
    drop(server);

    await_status(&mut events, "Connection to server lost").await;
    assert_eq!(session.state().await, ConnectionState::Disconnected);

    // The channel is permanently invalid for this session and the
    // failed send performs no I/O.
    let outgoing = session.outgoing();
    assert!(matches!(
        outgoing.send("x").await,
        Err(SendError::NotConnected)
    ));
    assert!(matches!(
        manager.send("x").await,
        Err(SendError::NotConnected)
    ));

    session.wait_closed().await;
    let lost = display
        .lines()
        .iter()
        .filter(|l| **l == DisplayLine::status("Connection to server lost"))
        .count();
    assert_eq!(lost, 1);
}

#[tokio::test]
async fn failed_connect_leaves_failed_state_and_no_session() {
    // Bind then drop to get a port with nothing listening on it.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (display, manager) = manager();
    let result = manager.connect("127.0.0.1", port, "frank").await;

    assert!(result.is_err());
    assert_eq!(manager.state().await, ConnectionState::Failed);
    assert_eq!(
        display.lines(),
        vec![
            DisplayLine::status("Connecting to server..."),
            DisplayLine::status("Failed to connect to server."),
        ]
    );
    assert!(matches!(
        manager.send("x").await,
        Err(SendError::NotConnected)
    ));
}

#[tokio::test]
async fn send_before_any_connect_fails_without_io() {
    let (_display, manager) = manager();
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
    assert!(matches!(
        manager.send("hello").await,
        Err(SendError::NotConnected)
    ));
}

#[tokio::test]
async fn new_connect_supersedes_the_previous_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (_display, manager) = manager();

    let first = manager.connect("127.0.0.1", port, "gail").await.unwrap();
    let mut first_lines = accept_lines(&listener).await;
    assert_eq!(next_line(&mut first_lines).await, "gail:SIGN-ON");
    let first_outgoing = first.outgoing();

    let second = manager.connect("127.0.0.1", port, "gail").await.unwrap();
    let mut second_lines = accept_lines(&listener).await;
    assert_eq!(next_line(&mut second_lines).await, "gail:SIGN-ON");

    // The superseded session's channel is invalid; the new one works.
    assert!(matches!(
        first_outgoing.send("stale").await,
        Err(SendError::NotConnected)
    ));
    second.send("fresh").await.unwrap();
    assert_eq!(next_line(&mut second_lines).await, "gail: fresh");
}

#[tokio::test]
async fn disconnect_invalidates_the_channel_immediately() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (display, manager) = manager();

    let session = manager.connect("127.0.0.1", port, "hank").await.unwrap();
    let mut lines = accept_lines(&listener).await;
    assert_eq!(next_line(&mut lines).await, "hank:SIGN-ON");

    manager.disconnect().await;
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
    assert!(matches!(
        session.send("x").await,
        Err(SendError::NotConnected)
    ));

    // Explicit teardown is silent; no lost-connection status line.
    assert!(
        !display
            .lines()
            .contains(&DisplayLine::status("Connection to server lost"))
    );
}
