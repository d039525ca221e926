//! RateLimiter (C9) and Scheduler (C10): the posting control-plane
//! (spec §4.8, §4.9).

pub mod queue;
pub mod rate_limiter;

pub use queue::{EnqueueError, Scheduler, SchedulerConfig, SchedulerEvent};
pub use rate_limiter::{normalize_for_dedupe, RateLimiter, RateLimiterConfig};
