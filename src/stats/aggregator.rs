use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::snapshot::CallNotice;
use super::subscription::{run_window, StatSubscription};
use crate::config::PipelineConfig;
use crate::fanout::{deliver, Delivery};

/// Shortest window accepted; tokio intervals reject a zero period.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Longest window accepted. Keeps timer deadlines representable as `Instant`s.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct StatSubscriber {
    id: Uuid,
    calls: mpsc::Sender<CallNotice>,
}

/// Pushes call notices to every live statistics subscription.
#[derive(Debug)]
pub struct StatsAggregator {
    subscribers: Mutex<Vec<StatSubscriber>>,
    config: PipelineConfig,
}

impl StatsAggregator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Starts a window loop emitting a snapshot every `interval`, clamped to
    /// `MIN_INTERVAL..=MAX_INTERVAL`. Must be called from within a tokio runtime.
    pub fn subscribe(&self, interval: Duration) -> StatSubscription {
        let interval = interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        let id = Uuid::new_v4();
        let (calls_tx, calls_rx) = mpsc::channel(self.config.buffer());
        let (snapshots_tx, snapshots_rx) = mpsc::channel(self.config.buffer());
        let cancel = CancellationToken::new();

        self.subscribers.lock().push(StatSubscriber {
            id,
            calls: calls_tx,
        });

        let task = tokio::spawn(run_window(
            id,
            interval,
            self.config.overflow,
            calls_rx,
            snapshots_tx,
            cancel.clone(),
        ));

        info!(subscription = %id, interval_secs = interval.as_secs(), "stat subscription registered");
        StatSubscription::new(id, interval, snapshots_rx, cancel, task)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Notifies every subscription of one call, in registration order.
    pub async fn record_call(&self, consumer: &str, method: &str) {
        let subscribers = self.subscribers.lock().clone();
        let notice = CallNotice {
            consumer: consumer.to_string(),
            method: method.to_string(),
        };
        let mut saw_closed = false;

        for subscriber in &subscribers {
            match deliver(&subscriber.calls, notice.clone(), self.config.overflow).await {
                Delivery::Delivered => {}
                Delivery::Dropped => {
                    warn!(subscription = %subscriber.id, %method, "stat subscriber lagging, call not counted");
                }
                Delivery::Closed => saw_closed = true,
            }
        }

        if saw_closed {
            self.prune();
        }
    }

    fn prune(&self) {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|subscriber| !subscriber.calls.is_closed());
        debug!(removed = before - subscribers.len(), "pruned disposed stat subscriptions");
    }
}
