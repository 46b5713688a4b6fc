//! Typed display line enum.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of the visible message history.
///
/// Both variants render their text verbatim; the distinction only
/// lets presentation layers style local status notices differently
/// from lines that arrived from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLine {
    /// Local status notice ("Connecting to server...", etc.).
    Status(String),
    /// A line received from the server, shown as-is.
    Chat(String),
}

impl DisplayLine {
    /// Create a status line.
    pub fn status<S: Into<String>>(text: S) -> Self {
        Self::Status(text.into())
    }

    /// Create a chat line.
    pub fn chat<S: Into<String>>(text: S) -> Self {
        Self::Chat(text.into())
    }

    /// The rendered text of this line.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Status(s) | Self::Chat(s) => s,
        }
    }

    /// Whether this is a local status notice.
    #[must_use]
    pub const fn is_status(&self) -> bool {
        matches!(self, Self::Status(_))
    }
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
