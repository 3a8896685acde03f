use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::snapshot::{CallNotice, StatSnapshot, Window};
use crate::config::OverflowPolicy;
use crate::fanout::{deliver, Delivery};

/// Windowed statistics stream for one subscriber.
#[derive(Debug)]
pub struct StatSubscription {
    id: Uuid,
    interval: Duration,
    snapshots: mpsc::Receiver<StatSnapshot>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StatSubscription {
    pub(crate) fn new(
        id: Uuid,
        interval: Duration,
        snapshots: mpsc::Receiver<StatSnapshot>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            interval,
            snapshots,
            cancel,
            task,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Next snapshot, or `None` once disposed.
    pub async fn recv(&mut self) -> Option<StatSnapshot> {
        self.snapshots.recv().await
    }

    /// Stops the window timer and closes the snapshot channel.
    pub fn dispose(&mut self) {
        if !self.cancel.is_cancelled() {
            info!(subscription = %self.id, "stat subscription disposed");
        }
        self.cancel.cancel();
        self.snapshots.close();
    }

    /// Whether the window loop is still alive.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for StatSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Accumulates notices and emits a snapshot every `period` until cancelled.
/// The first snapshot is due one full period after the loop starts.
pub(crate) async fn run_window(
    id: Uuid,
    period: Duration,
    overflow: OverflowPolicy,
    mut calls: mpsc::Receiver<CallNotice>,
    snapshots: mpsc::Sender<StatSnapshot>,
    cancel: CancellationToken,
) {
    let mut window = Window::default();
    let start = Instant::now()
        .checked_add(period)
        .unwrap_or_else(Instant::now);
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                // Notices already queued belong to the window that is closing.
                while let Ok(notice) = calls.try_recv() {
                    window.record(notice);
                }
                let snapshot = window.take(SystemTime::now());
                let delivery = tokio::select! {
                    _ = cancel.cancelled() => break,
                    delivery = deliver(&snapshots, snapshot, overflow) => delivery,
                };
                match delivery {
                    Delivery::Delivered => {}
                    Delivery::Dropped => warn!(subscription = %id, "stat subscriber lagging, snapshot dropped"),
                    Delivery::Closed => break,
                }
            }
            notice = calls.recv() => match notice {
                Some(notice) => window.record(notice),
                None => break,
            },
        }
    }

    // Dropping `calls` marks this subscriber closed for the aggregator.
    debug!(subscription = %id, "stat window loop stopped");
}
