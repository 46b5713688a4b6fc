//! Network core of the chatline chat client.
//!
//! This crate provides:
//! - `protocol` - The line-oriented wire codec
//! - `Session` / `OutgoingChannel` - One live connection and its send path
//! - `ConnectionManager` - Connect orchestration and session lifecycle
//!
//! Presentation layers consume the [`chatline_core::DisplayBuffer`]
//! event stream and call [`ConnectionManager::connect`] and
//! [`OutgoingChannel::send`]; nothing in this crate depends on a
//! rendering toolkit.

pub mod manager;
pub mod protocol;
pub mod session;

pub use manager::{ConnectError, ConnectionManager};
pub use session::{OutgoingChannel, SendError, Session};
