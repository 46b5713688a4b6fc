//! Display-side state shared between the chatline network core and
//! presentation layers.
//!
//! This crate provides the fundamental building blocks:
//! - `DisplayBuffer` - Bounded history + broadcast of appended lines
//! - `DisplayLine` - Typed display line enum
//! - `ConnectionState` - Connection lifecycle state

pub mod display;
pub mod display_line;
pub mod state;

pub use display::DisplayBuffer;
pub use display_line::DisplayLine;
pub use state::ConnectionState;
