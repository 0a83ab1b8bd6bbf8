//! Broadcast bus carrying pipeline events to every connected listener

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::types::{Event, EventEnvelope};

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of pipeline events.
///
/// Publishing never blocks and never fails: with no listeners attached the
/// event is dropped, and a lagging listener loses the oldest events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    published: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wrap `event` in a fresh envelope and publish it.
    ///
    /// Returns the number of listeners that received it.
    pub fn emit(&self, event: Event) -> usize {
        self.publish(EventEnvelope::new(event))
    }

    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Events published before this call are not delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("published", &self.published_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionRole;

    fn check(title: &str, success: bool) -> Event {
        Event::CheckResult {
            title: title.to_string(),
            success,
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        assert_eq!(bus.emit(check("url: http://a", true)), 1);

        let received = rx.recv().await.unwrap();
        match received.event {
            Event::CheckResult { title, success } => {
                assert_eq!(title, "url: http://a");
                assert!(success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_same_envelope() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let envelope = EventEnvelope::new(Event::SessionOpened {
            role: SessionRole::Checker,
        });
        let id = envelope.id;
        assert_eq!(bus.publish(envelope), 2);

        assert_eq!(rx1.recv().await.unwrap().id, id);
        assert_eq!(rx2.recv().await.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_events_keep_publish_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(Event::ModuleStarted {
            file: "login".to_string(),
        });
        bus.emit(check("sleep: 500", false));
        bus.emit(Event::ModuleEnded {
            file: "login".to_string(),
            success: false,
        });

        assert!(matches!(rx.recv().await.unwrap().event, Event::ModuleStarted { .. }));
        assert!(matches!(rx.recv().await.unwrap().event, Event::CheckResult { .. }));
        assert!(matches!(rx.recv().await.unwrap().event, Event::ModuleEnded { .. }));
    }

    #[test]
    fn test_emit_without_subscribers_is_counted() {
        let bus = EventBus::new();

        assert_eq!(bus.emit(check("a", true)), 0);
        assert_eq!(bus.emit(check("b", true)), 0);
        assert_eq!(bus.published_count(), 2);
    }

    #[test]
    fn test_clones_share_channel() {
        let bus = EventBus::new();
        let other = bus.clone();

        let _rx = other.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }
}
