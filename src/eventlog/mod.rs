//! Call event log with live fan-out to subscribers.

pub mod broadcaster;
pub mod event;
pub mod layer;

pub use broadcaster::{EventLog, LogSubscription};
pub use event::LogEvent;
pub use layer::EventLogLayer;
