//! Transport-facing call model.
//!
//! The RPC transport itself lives outside this crate. It hands every call to
//! the pipeline as a `CallContext` plus the handler it resolved for the
//! method. Payloads are opaque `serde_json::Value`s.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{CallError, CallResult};

pub const CONSUMER_KEY: &str = "consumer";

/// Multi-valued call metadata (`key -> [value]`), as carried by the transport.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: HashMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }
}

/// Read-only view of one inbound call.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub method: String,
    /// `None` when the transport could not attach metadata to the call.
    pub metadata: Option<Metadata>,
    /// `None` when the peer address could not be determined.
    pub peer: Option<String>,
    /// Fires when the remote caller goes away.
    pub cancel: CancellationToken,
}

impl CallContext {
    pub fn new(method: &str, metadata: Metadata, peer: &str) -> Self {
        Self {
            method: method.to_string(),
            metadata: Some(metadata),
            peer: Some(peer.to_string()),
            cancel: CancellationToken::new(),
        }
    }

    /// Consumer identity claimed by the caller.
    pub fn consumer(&self) -> CallResult<&str> {
        let metadata = self.metadata.as_ref().ok_or(CallError::MetadataUnavailable)?;
        metadata
            .first(CONSUMER_KEY)
            .ok_or(CallError::NoConsumerIdentity)
    }

    pub fn peer(&self) -> CallResult<&str> {
        self.peer.as_deref().ok_or(CallError::PeerUnavailable)
    }
}

/// Business logic for a unary call.
#[async_trait]
pub trait UnaryHandler: Send + Sync {
    async fn call(&self, call: &CallContext, request: Value) -> CallResult<Value>;
}

/// Outbound half of a server-streaming call.
#[async_trait]
pub trait ServerStream: Send {
    async fn send(&mut self, item: Value) -> CallResult<()>;
}

/// Business logic for a server-streaming call.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    async fn call(
        &self,
        call: &CallContext,
        request: Value,
        stream: &mut dyn ServerStream,
    ) -> CallResult<()>;
}
