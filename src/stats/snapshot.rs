use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Call counts accumulated over one window of one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSnapshot {
    #[serde(with = "crate::time::unix_secs")]
    pub timestamp: SystemTime,
    pub by_method: HashMap<String, u64>,
    pub by_consumer: HashMap<String, u64>,
}

impl StatSnapshot {
    pub fn is_empty(&self) -> bool {
        self.by_method.is_empty() && self.by_consumer.is_empty()
    }

    pub fn total_calls(&self) -> u64 {
        self.by_method.values().sum()
    }
}

/// "A call happened" notification pushed to every window loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallNotice {
    pub consumer: String,
    pub method: String,
}

/// Counters of the window currently being filled. Owned by a single loop.
#[derive(Debug, Default)]
pub(crate) struct Window {
    by_method: HashMap<String, u64>,
    by_consumer: HashMap<String, u64>,
}

impl Window {
    pub(crate) fn record(&mut self, notice: CallNotice) {
        *self.by_method.entry(notice.method).or_insert(0) += 1;
        *self.by_consumer.entry(notice.consumer).or_insert(0) += 1;
    }

    /// Closes the window: returns its counts and starts over empty.
    pub(crate) fn take(&mut self, timestamp: SystemTime) -> StatSnapshot {
        StatSnapshot {
            timestamp,
            by_method: std::mem::take(&mut self.by_method),
            by_consumer: std::mem::take(&mut self.by_consumer),
        }
    }
}
