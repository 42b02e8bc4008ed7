use super::types::AgentEvent;
use tokio::sync::broadcast;

/// Broadcast-based event bus.
///
/// Uses `tokio::broadcast` so multiple subscribers receive the same events.
/// Slow subscribers miss events (lagged) rather than blocking the publisher,
/// which keeps monitoring out of the agent's critical path.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AgentEvent>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// Capacity bounds how far a subscriber may fall behind before it starts
    /// missing events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events. Each subscriber gets an independent copy of every
    /// event published after the call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all active subscribers.
    ///
    /// Returns the number of subscribers that received it; with no
    /// subscribers the event is silently dropped.
    pub fn publish(&self, event: AgentEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
