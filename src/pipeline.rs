//! Composes the fixed middleware chain:
//! access control -> event log -> statistics -> business handler.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::access::{AccessControl, AccessPolicy};
use crate::admin::{ObserveLog, ObserveStats};
use crate::call::{CallContext, ServerStream, StreamHandler, UnaryHandler};
use crate::config::PipelineConfig;
use crate::error::{CallError, CallResult, PolicyError};
use crate::eventlog::{EventLog, EventLogLayer};
use crate::interceptor::{Interceptor, Passthrough};
use crate::stats::{StatsAggregator, StatsLayer};

pub struct Pipeline {
    head: Arc<dyn Interceptor>,
    log: Arc<EventLog>,
    stats: Arc<StatsAggregator>,
    shutdown: CancellationToken,
}

impl Pipeline {
    /// Fails fast if the policy payload cannot be parsed.
    pub fn new(policy_payload: &str, config: PipelineConfig) -> Result<Self, PolicyError> {
        let policy = AccessPolicy::from_json(policy_payload)?;
        Ok(Self::with_policy(policy, config, CancellationToken::new()))
    }

    pub fn with_policy(
        policy: AccessPolicy,
        config: PipelineConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let consumers = policy.consumers().count();
        let log = Arc::new(EventLog::new(config.clone()));
        let overflow = config.overflow;
        let stats = Arc::new(StatsAggregator::new(config));

        // Built inside out; each layer wraps the one before it.
        let passthrough: Arc<dyn Interceptor> = Arc::new(Passthrough);
        let counted: Arc<dyn Interceptor> = Arc::new(StatsLayer::new(stats.clone(), passthrough));
        let logged: Arc<dyn Interceptor> = Arc::new(EventLogLayer::new(log.clone(), counted));
        let head: Arc<dyn Interceptor> = Arc::new(AccessControl::new(policy, logged));

        info!(consumers, ?overflow, "call pipeline ready");
        Self {
            head,
            log,
            stats,
            shutdown,
        }
    }

    /// The outermost layer, for transports that take an interceptor directly.
    pub fn interceptor(&self) -> Arc<dyn Interceptor> {
        self.head.clone()
    }

    pub fn event_log(&self) -> Arc<EventLog> {
        self.log.clone()
    }

    pub fn stats(&self) -> Arc<StatsAggregator> {
        self.stats.clone()
    }

    pub fn observe_log(&self) -> ObserveLog {
        ObserveLog::new(self.log.clone(), self.shutdown.clone())
    }

    pub fn observe_stats(&self) -> ObserveStats {
        ObserveStats::new(self.stats.clone(), self.shutdown.clone())
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// New calls are refused from here on and admin streams wind down.
    pub fn shutdown(&self) {
        info!("call pipeline shutting down");
        self.shutdown.cancel();
    }

    pub async fn unary(
        &self,
        call: &CallContext,
        request: Value,
        handler: &dyn UnaryHandler,
    ) -> CallResult<Value> {
        if self.shutdown.is_cancelled() {
            return Err(CallError::Unavailable);
        }
        self.head.intercept_unary(call, request, handler).await
    }

    pub async fn stream(
        &self,
        call: &CallContext,
        request: Value,
        stream: &mut dyn ServerStream,
        handler: &dyn StreamHandler,
    ) -> CallResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(CallError::Unavailable);
        }
        self.head
            .intercept_stream(call, request, stream, handler)
            .await
    }
}
