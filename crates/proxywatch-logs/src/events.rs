use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::types::{ArcLogEntry, MonitoringState};

/// Notifications published by the monitor
#[derive(Clone, Debug)]
pub enum MonitorEvent {
    /// An entry was appended to the buffer
    EntryAdded(ArcLogEntry),

    /// The monitoring state changed; `message` explains errors
    StatusChanged {
        state: MonitoringState,
        message: Option<String>,
    },
}

/// Fan-out of monitor events to any number of channel subscribers.
/// Queues are unbounded; a subscriber that stops reading only grows its own.
#[derive(Clone, Default)]
pub(crate) struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<MonitorEvent>>>>,
}

impl EventBus {
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<MonitorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver to every live subscriber; dropped receivers are pruned.
    /// Never blocks.
    pub(crate) fn publish(&self, event: MonitorEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_to_all_and_prune_closed() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let b = bus.subscribe();
        drop(b);

        bus.publish(MonitorEvent::StatusChanged {
            state: MonitoringState::Running,
            message: None,
        });

        assert!(matches!(
            a.try_recv(),
            Ok(MonitorEvent::StatusChanged {
                state: MonitoringState::Running,
                ..
            })
        ));
        assert_eq!(bus.subscribers.lock().len(), 1);
    }

    #[test]
    fn test_idle_subscriber_does_not_block_others() {
        let bus = EventBus::default();
        let idle = bus.subscribe();
        let mut active = bus.subscribe();

        for _ in 0..1000 {
            bus.publish(MonitorEvent::StatusChanged {
                state: MonitoringState::Running,
                message: None,
            });
            assert!(active.try_recv().is_ok());
        }

        assert_eq!(idle.len(), 1000);
        assert_eq!(bus.subscribers.lock().len(), 2);
    }
}
