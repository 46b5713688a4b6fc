//! Bounded display buffer with broadcast of appended lines.

use std::{collections::VecDeque, sync::RwLock};

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::DisplayLine;

/// Broadcast channel depth for live listeners.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

struct Inner {
    lines: VecDeque<DisplayLine>,
    visible_capacity: usize,
}

/// Ordered, capacity-bounded message history with FIFO eviction.
///
/// Both the caller path (status lines) and the listener path (incoming
/// chat lines) append concurrently; each append is atomic and the
/// buffer never exceeds the currently configured visible capacity once
/// an append returns. Live listeners receive every appended line via
/// [`subscribe`](Self::subscribe) in buffer order.
///
/// The visible capacity is an input: the presentation layer derives it
/// from its geometry and updates it on resize. This buffer only
/// honors it, re-reading the current value on every append.
pub struct DisplayBuffer {
    inner: RwLock<Inner>,
    sender: broadcast::Sender<DisplayLine>,
}

impl DisplayBuffer {
    /// Create a buffer bounded by `visible_capacity` lines.
    #[must_use]
    pub fn new(visible_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(Inner {
                lines: VecDeque::with_capacity(visible_capacity.min(64)),
                visible_capacity,
            }),
            sender,
        }
    }

    /// Append a line, evicting from the front until the buffer fits
    /// the current visible capacity.
    ///
    /// The eviction check runs against the capacity value at append
    /// time, so a resize between appends takes effect here.
    pub fn append(&self, line: DisplayLine) {
        let mut inner = self.inner.write().unwrap();
        inner.lines.push_back(line.clone());
        while inner.lines.len() > inner.visible_capacity {
            inner.lines.pop_front();
        }
        // Broadcast under the lock so live listeners observe appends
        // in buffer order.
        let _ = self.sender.send(line);
    }

    /// Append a status line.
    pub fn append_status<S: Into<String>>(&self, text: S) {
        self.append(DisplayLine::status(text));
    }

    /// Append a chat line.
    pub fn append_chat<S: Into<String>>(&self, text: S) {
        self.append(DisplayLine::chat(text));
    }

    /// Update the visible capacity (presentation resize).
    ///
    /// Shrinking does not evict immediately; the next append brings
    /// the buffer back within bounds.
    pub fn set_visible_capacity(&self, visible_capacity: usize) {
        self.inner.write().unwrap().visible_capacity = visible_capacity;
    }

    /// The currently configured visible capacity.
    #[must_use]
    pub fn visible_capacity(&self) -> usize {
        self.inner.read().unwrap().visible_capacity
    }

    /// Number of lines currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().lines.len()
    }

    /// Whether the buffer holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().lines.is_empty()
    }

    /// Get a receiver for live appends.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayLine> {
        self.sender.subscribe()
    }

    /// Get a snapshot of the current lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<DisplayLine> {
        self.inner.read().unwrap().lines.iter().cloned().collect()
    }

    /// Stream that yields the current lines first, then live appends.
    ///
    /// Lets a presentation layer attach late (or re-attach) without
    /// missing history. A listener that falls behind the broadcast
    /// channel skips lagged lines rather than blocking appenders.
    #[must_use]
    pub fn lines_plus_stream(&self) -> futures::stream::BoxStream<'static, DisplayLine> {
        let (history, rx) = (self.lines(), self.subscribe());

        let hist = futures::stream::iter(history);
        let live = BroadcastStream::new(rx)
            .filter_map(|res: Result<DisplayLine, _>| async move { res.ok() });

        Box::pin(hist.chain(live))
    }
}
