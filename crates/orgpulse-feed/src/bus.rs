use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

pub const NOTIFICATION_RECEIVED: &str = "notificationReceived";

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// Carries the pushed object exactly as received.
    NotificationReceived(Value),
}

impl BusEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::NotificationReceived(_) => NOTIFICATION_RECEIVED,
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            BusEvent::NotificationReceived(payload) => payload,
        }
    }
}

/// Page-wide broadcast bus; views subscribe instead of being called directly.
#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<BusEvent>,
}

impl NotificationBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: BusEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(receivers, "bus_event_published");
                receivers
            }
            Err(err) => {
                debug!(event = err.0.name(), "bus_event_unobserved");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let bus = NotificationBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            bus.publish(BusEvent::NotificationReceived(json!({"title": "X"}))),
            0
        );
    }

    #[tokio::test]
    async fn every_subscriber_gets_the_named_event() {
        let bus = NotificationBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.clone().subscribe();
        let payload = json!({"title": "X", "content": "Y"});
        assert_eq!(bus.publish(BusEvent::NotificationReceived(payload.clone())), 2);

        for rx in [&mut first, &mut second] {
            let event = rx.recv().await.expect("event");
            assert_eq!(event.name(), "notificationReceived");
            assert_eq!(event.payload(), &payload);
        }
    }
}
