use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::event::LogEvent;
use crate::config::PipelineConfig;
use crate::fanout::{deliver, Delivery};

#[derive(Debug, Clone)]
struct LogSubscriber {
    id: Uuid,
    tx: mpsc::Sender<LogEvent>,
}

/// Live stream of log events for one subscriber.
#[derive(Debug)]
pub struct LogSubscription {
    id: Uuid,
    events: mpsc::Receiver<LogEvent>,
    disposed: bool,
}

impl LogSubscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next event, or `None` once disposed and drained.
    pub async fn recv(&mut self) -> Option<LogEvent> {
        self.events.recv().await
    }

    /// Closes the channel. Buffered events can still be drained; the
    /// broadcaster drops this subscriber on its next pass.
    pub fn dispose(&mut self) {
        if !self.disposed {
            info!(subscription = %self.id, "log subscription disposed");
            self.disposed = true;
        }
        self.events.close();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Fans every recorded call out to the registered log subscriptions.
#[derive(Debug)]
pub struct EventLog {
    subscribers: RwLock<Vec<LogSubscriber>>,
    config: PipelineConfig,
}

impl EventLog {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            config,
        }
    }

    pub fn subscribe(&self) -> LogSubscription {
        let (tx, events) = mpsc::channel(self.config.buffer());
        let id = Uuid::new_v4();
        self.subscribers.write().push(LogSubscriber { id, tx });
        info!(subscription = %id, "log subscription registered");
        LogSubscription {
            id,
            events,
            disposed: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Delivers `event` to every subscriber in registration order.
    ///
    /// Works on a snapshot of the registry: a subscriber registered while a
    /// broadcast is in flight may miss that event.
    pub async fn broadcast(&self, event: LogEvent) {
        let subscribers = self.subscribers.read().clone();
        let mut saw_closed = false;

        for subscriber in &subscribers {
            match deliver(&subscriber.tx, event.clone(), self.config.overflow).await {
                Delivery::Delivered => {}
                Delivery::Dropped => {
                    warn!(subscription = %subscriber.id, method = %event.method, "log subscriber lagging, event dropped");
                }
                Delivery::Closed => saw_closed = true,
            }
        }

        if saw_closed {
            self.prune();
        }
    }

    fn prune(&self) {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|subscriber| !subscriber.tx.is_closed());
        debug!(removed = before - subscribers.len(), "pruned disposed log subscriptions");
    }
}
