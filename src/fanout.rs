use tokio::sync::mpsc::{self, error::TrySendError};

use crate::config::OverflowPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Buffer full under `DropNewest`.
    Dropped,
    /// Receiver disposed. The registry entry can be pruned.
    Closed,
}

pub async fn deliver<T>(tx: &mpsc::Sender<T>, item: T, overflow: OverflowPolicy) -> Delivery {
    match overflow {
        OverflowPolicy::Block => match tx.send(item).await {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::Closed,
        },
        OverflowPolicy::DropNewest => match tx.try_send(item) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        },
    }
}
