//! Terminal chat client built on the chatline core.
//!
//! Run with: cargo run -p tui-chat -- <host> <port> <screen-name>
//!
//! The message pane renders the core's display buffer; the terminal
//! height supplies the buffer's visible capacity and is refreshed on
//! resize. Logs go to `tui-chat.log` since stdout is the UI.

use std::{io, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use chatline_client::{ConnectionManager, SendError};
use chatline_core::{ConnectionState, DisplayBuffer, DisplayLine};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rows taken by borders, the input box and the status bar.
const CHROME_ROWS: u16 = 6;

struct Args {
    host: String,
    port: u16,
    screen_name: String,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let (Some(host), Some(port), Some(screen_name)) = (args.next(), args.next(), args.next())
    else {
        bail!("usage: tui-chat <host> <port> <screen-name>");
    };
    let port = port.parse().context("port must be a number in 1-65535")?;
    Ok(Args {
        host,
        port,
        screen_name,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    // Log to a file; the terminal belongs to the UI.
    let log_file = std::fs::File::create("tui-chat.log")?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(log_file))
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, &args).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

struct App {
    lines: Vec<DisplayLine>,
    input: String,
    status: String,
    state: ConnectionState,
    screen_name: String,
}

impl App {
    fn new(screen_name: &str) -> Self {
        Self {
            lines: Vec::new(),
            input: String::new(),
            status: String::new(),
            state: ConnectionState::Disconnected,
            screen_name: screen_name.to_string(),
        }
    }

    /// Pull status notices off the display event stream.
    fn drain_events(&mut self, events: &mut broadcast::Receiver<DisplayLine>) {
        while let Ok(line) = events.try_recv() {
            if line.is_status() {
                self.status = line.text().to_string();
            }
        }
    }
}

fn visible_rows(terminal_height: u16) -> usize {
    usize::from(terminal_height.saturating_sub(CHROME_ROWS))
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    args: &Args,
) -> anyhow::Result<()> {
    let mut app = App::new(&args.screen_name);

    // The visible capacity comes from the terminal geometry; the core
    // only honors it.
    let size = terminal.size()?;
    let display = Arc::new(DisplayBuffer::new(visible_rows(size.height)));
    let mut events = display.subscribe();

    let manager = ConnectionManager::new(Arc::clone(&display));

    // Connect on startup; on failure the loop keeps running so the
    // user can retry with Ctrl+R.
    let _ = manager
        .connect(&args.host, args.port, &args.screen_name)
        .await;

    loop {
        app.drain_events(&mut events);
        app.lines = display.lines();
        app.state = manager.state().await;

        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(KeyEvent {
                    code: KeyCode::Char('c'),
                    modifiers: KeyModifiers::CONTROL,
                    ..
                }) => {
                    manager.disconnect().await;
                    return Ok(());
                }
                Event::Key(KeyEvent {
                    code: KeyCode::Char('r'),
                    modifiers: KeyModifiers::CONTROL,
                    ..
                }) => {
                    let _ = manager
                        .connect(&args.host, args.port, &args.screen_name)
                        .await;
                }
                Event::Key(KeyEvent {
                    code: KeyCode::Char(c),
                    modifiers: KeyModifiers::NONE | KeyModifiers::SHIFT,
                    ..
                }) => {
                    app.input.push(c);
                }
                Event::Key(KeyEvent {
                    code: KeyCode::Backspace,
                    ..
                }) => {
                    app.input.pop();
                }
                Event::Key(KeyEvent {
                    code: KeyCode::Enter,
                    ..
                }) => {
                    if !app.input.is_empty() {
                        let text = std::mem::take(&mut app.input);
                        match manager.send(&text).await {
                            Ok(()) => {}
                            Err(SendError::NotConnected) => {
                                app.status = "Not connected".to_string();
                            }
                            Err(SendError::Transport(e)) => {
                                tracing::warn!(error = %e, "send failed");
                            }
                        }
                    }
                }
                Event::Resize(_, height) => {
                    display.set_visible_capacity(visible_rows(height));
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Messages
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status
        ])
        .split(f.area());

    // Message area
    let message_text: Vec<Line> = app
        .lines
        .iter()
        .map(|l| {
            if l.is_status() {
                Line::from(Span::styled(
                    l.text(),
                    Style::default().fg(Color::DarkGray),
                ))
            } else {
                Line::from(l.text())
            }
        })
        .collect();

    let messages = Paragraph::new(message_text)
        .block(Block::default().borders(Borders::ALL).title("Messages"));
    f.render_widget(messages, chunks[0]);

    // Input area
    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Message"));
    f.render_widget(input, chunks[1]);

    // Set cursor
    f.set_cursor_position((chunks[1].x + app.input.len() as u16 + 1, chunks[1].y + 1));

    // Status bar
    let state_style = match app.state {
        ConnectionState::Connected => Style::default().fg(Color::Green),
        ConnectionState::Failed => Style::default().fg(Color::Red),
        ConnectionState::Connecting | ConnectionState::Disconnected => {
            Style::default().fg(Color::Yellow)
        }
    };

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(&app.screen_name, Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        Span::styled(format!("{:?}", app.state), state_style),
        Span::raw(" | "),
        Span::raw(app.status.as_str()),
        Span::raw(" | "),
        Span::styled("Ctrl+R", Style::default().fg(Color::Yellow)),
        Span::raw(" reconnect | "),
        Span::styled("Ctrl+C", Style::default().fg(Color::Yellow)),
        Span::raw(" quit "),
    ]));
    f.render_widget(status, chunks[2]);
}
