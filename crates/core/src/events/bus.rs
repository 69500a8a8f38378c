use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::ConsoleEvent;

/// In-process event bus backed by `tokio::broadcast`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ConsoleEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish an event to all current subscribers. Returns how many
    /// received it; having no subscribers is not an error.
    pub fn publish(&self, event: ConsoleEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Collection;
    use crate::events::types::{ChangeKind, ItemChangedEvent};

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        assert_eq!(bus.publish(ConsoleEvent::Welcome), 1);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ConsoleEvent::Welcome));
    }

    #[tokio::test]
    async fn multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(ConsoleEvent::ItemChanged(ItemChangedEvent::now(
            Collection::Leads,
            4,
            ChangeKind::Archived,
        )));

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                ConsoleEvent::ItemChanged(e) => {
                    assert_eq!(e.item_id, 4);
                    assert_eq!(e.change, ChangeKind::Archived);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn zero_capacity_still_delivers() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        assert_eq!(bus.publish(ConsoleEvent::Welcome), 1);
        assert!(matches!(rx.recv().await.unwrap(), ConsoleEvent::Welcome));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(ConsoleEvent::Welcome), 0);
    }
}
