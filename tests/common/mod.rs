#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use callgate::error::{CallError, CallResult};
use callgate::{CallContext, Metadata, ServerStream, StreamHandler, UnaryHandler};
use serde_json::{json, Value};
use tokio::sync::mpsc;

pub const POLICY: &str = r#"{
    "logger": ["/main.Admin/Logging"],
    "stat": ["/main.Admin/Statistics"],
    "biz_user": ["/main.Biz/Check", "/main.Biz/Add"],
    "biz_admin": ["/main.Biz/*"]
}"#;

pub fn call_as(consumer: &str, method: &str) -> CallContext {
    CallContext::new(method, Metadata::new().with("consumer", consumer), "127.0.0.1:4242")
}

/// Business handler that only counts how often it was reached.
#[derive(Default)]
pub struct CountingHandler {
    hits: AtomicUsize,
}

impl CountingHandler {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnaryHandler for CountingHandler {
    async fn call(&self, _call: &CallContext, _request: Value) -> CallResult<Value> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(json!({}))
    }
}

#[async_trait]
impl StreamHandler for CountingHandler {
    async fn call(
        &self,
        _call: &CallContext,
        _request: Value,
        stream: &mut dyn ServerStream,
    ) -> CallResult<()> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        stream.send(json!({ "ok": true })).await
    }
}

/// Stream sink backed by a channel the test reads from.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Value>,
}

pub fn channel_sink() -> (ChannelSink, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

#[async_trait]
impl ServerStream for ChannelSink {
    async fn send(&mut self, item: Value) -> CallResult<()> {
        self.tx
            .send(item)
            .map_err(|_| CallError::Forwarding("client went away".to_string()))
    }
}

/// Sink whose client is already gone.
pub struct BrokenSink;

#[async_trait]
impl ServerStream for BrokenSink {
    async fn send(&mut self, _item: Value) -> CallResult<()> {
        Err(CallError::Forwarding("connection reset".to_string()))
    }
}

/// Yields until `ready` holds. Panics if it never does.
pub async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
