//! Wire protocol for client-server communication.
//!
//! The chat room protocol is newline-delimited UTF-8 text. The client
//! sends a sign-on line first, then one line per chat message; the
//! server broadcasts arbitrary lines which are displayed verbatim.
//! There is no framing beyond the line terminator and no escaping, so
//! outbound text must not itself contain a line terminator (the
//! caller's contract).

use chatline_core::DisplayLine;

/// A line sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundLine<'a> {
    /// First line after connection establishment, identifying the
    /// client's screen name.
    SignOn {
        /// Screen name to register with the server.
        screen_name: &'a str,
    },
    /// A chat message line.
    Chat {
        /// Screen name prefixed to the message.
        screen_name: &'a str,
        /// Message text; may be empty, must be a single line.
        text: &'a str,
    },
}

impl OutboundLine<'_> {
    /// Encode this line for the wire, without the trailing newline.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::SignOn { screen_name } => format!("{screen_name}:SIGN-ON"),
            Self::Chat { screen_name, text } => format!("{screen_name}: {text}"),
        }
    }
}

/// Decode a line received from the server.
///
/// Incoming lines are displayed verbatim; the server is trusted to
/// format broadcast lines, including sender prefixes.
#[must_use]
pub fn decode_incoming(line: &str) -> DisplayLine {
    DisplayLine::chat(line)
}
