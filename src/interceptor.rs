use async_trait::async_trait;
use serde_json::Value;

use crate::call::{CallContext, ServerStream, StreamHandler, UnaryHandler};
use crate::error::CallResult;

/// A middleware layer. Implementations hold the next layer and either
/// reject the call or delegate to it.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept_unary(
        &self,
        call: &CallContext,
        request: Value,
        handler: &dyn UnaryHandler,
    ) -> CallResult<Value>;

    async fn intercept_stream(
        &self,
        call: &CallContext,
        request: Value,
        stream: &mut dyn ServerStream,
        handler: &dyn StreamHandler,
    ) -> CallResult<()>;
}

/// Innermost layer: hands the call to the business handler untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

#[async_trait]
impl Interceptor for Passthrough {
    async fn intercept_unary(
        &self,
        call: &CallContext,
        request: Value,
        handler: &dyn UnaryHandler,
    ) -> CallResult<Value> {
        handler.call(call, request).await
    }

    async fn intercept_stream(
        &self,
        call: &CallContext,
        request: Value,
        stream: &mut dyn ServerStream,
        handler: &dyn StreamHandler,
    ) -> CallResult<()> {
        handler.call(call, request, stream).await
    }
}
