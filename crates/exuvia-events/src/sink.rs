//! Event sinks.
//!
//! [`EventSink::append_event`] is best-effort and must not block: the
//! engine calls it while holding entity locks. Sinks that can fail (a full
//! channel, no subscribers) drop the event and log rather than return an
//! error.

use chrono::{DateTime, Utc};
use exuvia_types::{EventId, EventKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default capacity of a [`ChannelSink`].
///
/// Slow subscribers that fall further behind receive a
/// [`broadcast::error::RecvError::Lagged`] and skip ahead.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// An immutable record of one engine outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Unique event identifier (UUID v7, so time-ordered).
    pub id: EventId,
    /// What happened.
    pub kind: EventKind,
    /// Kind-specific payload, see [`crate::payload`].
    pub details: serde_json::Value,
    /// When the sink received the event.
    pub created_at: DateTime<Utc>,
}

impl LifecycleEvent {
    /// Stamp a new event.
    pub fn new(kind: EventKind, details: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            kind,
            details,
            created_at: Utc::now(),
        }
    }
}

/// Destination for lifecycle events.
pub trait EventSink: Send + Sync {
    /// Record one event. Never blocks and never fails.
    fn append_event(&self, kind: EventKind, payload: serde_json::Value);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn append_event(&self, _kind: EventKind, _payload: serde_json::Value) {}
}

/// Keeps every event in memory, in append order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events recorded so far.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    /// Events of one kind, in append order.
    pub fn events_of(&self, kind: EventKind) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of events recorded.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no event has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn append_event(&self, kind: EventKind, payload: serde_json::Value) {
        self.events.lock().push(LifecycleEvent::new(kind, payload));
    }
}

/// Fans events out to any number of async subscribers.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl ChannelSink {
    /// Create a sink with the given buffer capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChannelSink {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventSink for ChannelSink {
    fn append_event(&self, kind: EventKind, payload: serde_json::Value) {
        // send fails only when nobody is subscribed.
        if self.tx.send(LifecycleEvent::new(kind, payload)).is_err() {
            tracing::debug!(kind = kind.as_str(), "Event dropped, no subscribers");
        }
    }
}
