//! The dispatch engine: rate limiting, worker pool and progress tracking.

mod dispatch;
mod progress;
mod rate_limiter;

pub use dispatch::{CancelFlag, DispatchPool, MAX_PARALLELISM};
pub use progress::ProgressTracker;
pub use rate_limiter::RateLimiter;
