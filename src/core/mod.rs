//! Core dispatch engine: rate limiting, providers, routing, orchestration

pub mod dispatcher;
pub mod health;
pub mod providers;
pub mod rate_limiter;
pub mod router;
pub mod stats;
pub mod types;

pub use dispatcher::{Dispatcher, StaticTaskSource, StopHandle, TaskSource};
pub use health::{ProviderHealth, run_health_check};
pub use providers::{
    HttpLocalBackend, LocalCompletion, ProviderClient, ProviderUsage, StubLocalBackend,
};
pub use rate_limiter::{MAX_CONSECUTIVE_THROTTLES, RateLimiter};
pub use router::SmartRouter;
pub use stats::{CumulativeStats, RunStats};
pub use types::{ExecOutcome, LOCAL_FALLBACK, NO_PROVIDER, Task, TaskResult, TaskStatus};
