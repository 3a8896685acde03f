use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::broadcaster::EventLog;
use super::event::LogEvent;
use crate::call::{CallContext, ServerStream, StreamHandler, UnaryHandler};
use crate::error::CallResult;
use crate::interceptor::Interceptor;

/// Publishes a `LogEvent` for every call, then delegates. Fails closed:
/// a call that cannot be logged is not served.
pub struct EventLogLayer {
    log: Arc<EventLog>,
    next: Arc<dyn Interceptor>,
}

impl EventLogLayer {
    pub fn new(log: Arc<EventLog>, next: Arc<dyn Interceptor>) -> Self {
        Self { log, next }
    }

    async fn record(&self, call: &CallContext) -> CallResult<()> {
        let event = LogEvent::from_call(call)?;
        self.log.broadcast(event).await;
        Ok(())
    }
}

#[async_trait]
impl Interceptor for EventLogLayer {
    async fn intercept_unary(
        &self,
        call: &CallContext,
        request: Value,
        handler: &dyn UnaryHandler,
    ) -> CallResult<Value> {
        self.record(call).await?;
        self.next.intercept_unary(call, request, handler).await
    }

    async fn intercept_stream(
        &self,
        call: &CallContext,
        request: Value,
        stream: &mut dyn ServerStream,
        handler: &dyn StreamHandler,
    ) -> CallResult<()> {
        self.record(call).await?;
        self.next
            .intercept_stream(call, request, stream, handler)
            .await
    }
}
