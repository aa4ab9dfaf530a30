//! Broadcast channel for verification events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every
//! verification transition publishes a [`VerificationEvent`] through the
//! bus, and every WebSocket connection subscribes to it.

use tokio::sync::broadcast;

use super::VerificationEvent;

/// Broadcast bus for [`VerificationEvent`]s.
///
/// When the ring buffer is full the oldest events are dropped for lagging
/// receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<VerificationEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that got the event; with no active
    /// receivers the event is silently dropped.
    pub fn publish(&self, event: VerificationEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver for all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<VerificationEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
