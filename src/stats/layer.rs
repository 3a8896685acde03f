use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::aggregator::StatsAggregator;
use crate::call::{CallContext, ServerStream, StreamHandler, UnaryHandler};
use crate::error::CallResult;
use crate::interceptor::Interceptor;

/// Counts every call towards the statistics windows, then delegates.
pub struct StatsLayer {
    stats: Arc<StatsAggregator>,
    next: Arc<dyn Interceptor>,
}

impl StatsLayer {
    pub fn new(stats: Arc<StatsAggregator>, next: Arc<dyn Interceptor>) -> Self {
        Self { stats, next }
    }

    async fn count(&self, call: &CallContext) -> CallResult<()> {
        let consumer = call.consumer()?;
        self.stats.record_call(consumer, &call.method).await;
        Ok(())
    }
}

#[async_trait]
impl Interceptor for StatsLayer {
    async fn intercept_unary(
        &self,
        call: &CallContext,
        request: Value,
        handler: &dyn UnaryHandler,
    ) -> CallResult<Value> {
        self.count(call).await?;
        self.next.intercept_unary(call, request, handler).await
    }

    async fn intercept_stream(
        &self,
        call: &CallContext,
        request: Value,
        stream: &mut dyn ServerStream,
        handler: &dyn StreamHandler,
    ) -> CallResult<()> {
        self.count(call).await?;
        self.next
            .intercept_stream(call, request, stream, handler)
            .await
    }
}
