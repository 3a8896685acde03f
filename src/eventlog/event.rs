use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::call::CallContext;
use crate::error::CallResult;

/// One authorized call, as seen by log subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(with = "crate::time::unix_secs")]
    pub timestamp: SystemTime,
    pub consumer: String,
    pub method: String,
    pub host: String,
}

impl LogEvent {
    /// Fails when the call carries no metadata, no consumer or no peer.
    pub fn from_call(call: &CallContext) -> CallResult<Self> {
        let consumer = call.consumer()?;
        let host = call.peer()?;
        Ok(Self {
            timestamp: SystemTime::now(),
            consumer: consumer.to_string(),
            method: call.method.clone(),
            host: host.to_string(),
        })
    }
}
