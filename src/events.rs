// Failure event bus
// Lets uninvolved parts of the application (banners, loggers) react to
// backend-wide conditions without being wired into every call site.

use serde::Serialize;
use tokio::sync::broadcast;

/// Default buffer size; UI-scale event volume, so small is fine
const DEFAULT_CAPACITY: usize = 32;

/// Events published by the request pipeline, orthogonally to the failing
/// call's own result. Ephemeral: delivered to current subscribers only,
/// never stored or replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureEvent {
    /// Backend reported maintenance mode
    Maintenance { message: String },
    /// Backend returned an unexpected 5xx
    ServerError {
        url: String,
        status: u16,
        message: String,
    },
}

/// Fire-and-forget publish point for [`FailureEvent`]s.
///
/// Cheap to clone; all clones share the same channel. Dropping a receiver
/// unsubscribes it. Publishing with no subscribers is not an error.
#[derive(Clone)]
pub struct FailureBus {
    tx: broadcast::Sender<FailureEvent>,
}

impl FailureBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Deliver an event to every currently-subscribed receiver
    pub fn publish(&self, event: FailureEvent) {
        tracing::debug!(event = ?event, "publishing failure event");
        // A send error only means nobody is listening
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FailureEvent> {
        self.tx.subscribe()
    }
}

impl Default for FailureBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test]
    async fn test_delivery_to_subscriber() {
        let bus = FailureBus::default();
        let mut rx = bus.subscribe();

        bus.publish(FailureEvent::Maintenance {
            message: "back soon".to_string(),
        });

        assert_eq!(
            rx.recv().await.unwrap(),
            FailureEvent::Maintenance {
                message: "back soon".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let bus = FailureBus::default();
        bus.publish(FailureEvent::ServerError {
            url: "https://portal.example/api/rooms".to_string(),
            status: 500,
            message: "boom".to_string(),
        });
    }

    #[tokio::test]
    async fn test_no_replay_to_late_subscriber() {
        let bus = FailureBus::default();
        bus.publish(FailureEvent::Maintenance {
            message: "missed".to_string(),
        });

        let mut rx = bus.subscribe();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_all_subscribers_see_each_event() {
        let bus = FailureBus::default();
        let mut rx_a = bus.subscribe();
        let mut rx_b = bus.subscribe();

        let event = FailureEvent::ServerError {
            url: "https://portal.example/api/jobs".to_string(),
            status: 502,
            message: "bad gateway".to_string(),
        };
        bus.publish(event.clone());

        assert_eq!(rx_a.recv().await.unwrap(), event);
        assert_eq!(rx_b.recv().await.unwrap(), event);
    }
}
