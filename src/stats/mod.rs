//! Windowed call statistics.
//!
//! Each subscription runs its own window loop with its own interval. The
//! aggregator only forwards call notices; counting happens inside the loop
//! that owns the counters, so no lock guards them.

pub mod aggregator;
pub mod layer;
pub mod snapshot;
pub mod subscription;

pub use aggregator::{StatsAggregator, MAX_INTERVAL, MIN_INTERVAL};
pub use layer::StatsLayer;
pub use snapshot::{CallNotice, StatSnapshot};
pub use subscription::StatSubscription;
