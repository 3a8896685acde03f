use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::policy::AccessPolicy;
use crate::call::{CallContext, ServerStream, StreamHandler, UnaryHandler};
use crate::error::CallResult;
use crate::interceptor::Interceptor;

/// Outermost layer: rejects calls whose consumer may not invoke the method.
pub struct AccessControl {
    policy: AccessPolicy,
    next: Arc<dyn Interceptor>,
}

impl AccessControl {
    pub fn new(policy: AccessPolicy, next: Arc<dyn Interceptor>) -> Self {
        Self { policy, next }
    }

    fn check(&self, call: &CallContext) -> CallResult<()> {
        let consumer = call.consumer().inspect_err(|err| {
            warn!(method = %call.method, error = %err, "call rejected before authorization");
        })?;
        match self.policy.authorize(consumer, &call.method) {
            Ok(()) => {
                debug!(%consumer, method = %call.method, "access granted");
                Ok(())
            }
            Err(err) => {
                warn!(%consumer, method = %call.method, "access denied");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Interceptor for AccessControl {
    async fn intercept_unary(
        &self,
        call: &CallContext,
        request: Value,
        handler: &dyn UnaryHandler,
    ) -> CallResult<Value> {
        self.check(call)?;
        self.next.intercept_unary(call, request, handler).await
    }

    async fn intercept_stream(
        &self,
        call: &CallContext,
        request: Value,
        stream: &mut dyn ServerStream,
        handler: &dyn StreamHandler,
    ) -> CallResult<()> {
        self.check(call)?;
        self.next
            .intercept_stream(call, request, stream, handler)
            .await
    }
}
