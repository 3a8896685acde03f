//! Admin streaming operations: live call log and windowed statistics.
//!
//! Both are ordinary stream handlers and run behind the full pipeline, so
//! the admin consumer needs a policy entry for them like anyone else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::call::{CallContext, ServerStream, StreamHandler};
use crate::error::{CallError, CallResult};
use crate::eventlog::EventLog;
use crate::stats::{StatsAggregator, MAX_INTERVAL};

pub const LOGGING_METHOD: &str = "/main.Admin/Logging";
pub const STATISTICS_METHOD: &str = "/main.Admin/Statistics";

/// Request body of the statistics stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatInterval {
    pub interval_seconds: u64,
}

impl StatInterval {
    pub fn parse(request: Value) -> CallResult<Duration> {
        let parsed: StatInterval = serde_json::from_value(request)
            .map_err(|err| CallError::InvalidArgument(err.to_string()))?;
        if parsed.interval_seconds == 0 {
            return Err(CallError::InvalidArgument(
                "interval_seconds must be positive".to_string(),
            ));
        }
        if parsed.interval_seconds > MAX_INTERVAL.as_secs() {
            return Err(CallError::InvalidArgument(format!(
                "interval_seconds must not exceed {}",
                MAX_INTERVAL.as_secs()
            )));
        }
        Ok(Duration::from_secs(parsed.interval_seconds))
    }
}

async fn send_item<T: Serialize>(stream: &mut dyn ServerStream, item: &T) -> CallResult<()> {
    let value = serde_json::to_value(item).map_err(|err| CallError::Forwarding(err.to_string()))?;
    stream.send(value).await
}

/// "Observe log": forwards every logged call to the caller.
pub struct ObserveLog {
    log: Arc<EventLog>,
    shutdown: CancellationToken,
}

impl ObserveLog {
    pub fn new(log: Arc<EventLog>, shutdown: CancellationToken) -> Self {
        Self { log, shutdown }
    }
}

#[async_trait]
impl StreamHandler for ObserveLog {
    async fn call(
        &self,
        call: &CallContext,
        _request: Value,
        stream: &mut dyn ServerStream,
    ) -> CallResult<()> {
        let mut subscription = self.log.subscribe();

        loop {
            let event = tokio::select! {
                _ = call.cancel.cancelled() => break,
                _ = self.shutdown.cancelled() => break,
                event = subscription.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            if let Err(error) = send_item(stream, &event).await {
                warn!(subscription = %subscription.id(), %error, "log stream delivery failed");
                break;
            }
        }

        subscription.dispose();
        info!(subscription = %subscription.id(), "log stream ended");
        Ok(())
    }
}

/// "Observe statistics": forwards one snapshot per requested interval.
pub struct ObserveStats {
    stats: Arc<StatsAggregator>,
    shutdown: CancellationToken,
}

impl ObserveStats {
    pub fn new(stats: Arc<StatsAggregator>, shutdown: CancellationToken) -> Self {
        Self { stats, shutdown }
    }
}

#[async_trait]
impl StreamHandler for ObserveStats {
    async fn call(
        &self,
        call: &CallContext,
        request: Value,
        stream: &mut dyn ServerStream,
    ) -> CallResult<()> {
        let interval = StatInterval::parse(request)?;
        let mut subscription = self.stats.subscribe(interval);
        info!(
            subscription = %subscription.id(),
            interval_secs = subscription.interval().as_secs(),
            "stat stream started"
        );

        loop {
            let snapshot = tokio::select! {
                _ = call.cancel.cancelled() => break,
                _ = self.shutdown.cancelled() => break,
                snapshot = subscription.recv() => match snapshot {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };
            if let Err(error) = send_item(stream, &snapshot).await {
                warn!(subscription = %subscription.id(), %error, "stat stream delivery failed");
                break;
            }
        }

        subscription.dispose();
        info!(subscription = %subscription.id(), "stat stream ended");
        Ok(())
    }
}
