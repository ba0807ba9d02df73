//! Task and outcome types shared across the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider name recorded when a task completes on the local backend
pub const LOCAL_FALLBACK: &str = "local-fallback";

/// Provider name recorded when a task exhausts every backend
pub const NO_PROVIDER: &str = "none";

/// One unit of work: a uniform `(system_prompt, user_prompt)` completion
///
/// Prompt content comes from the injected task source; this crate never
/// renders templates itself.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub task_type: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl Task {
    pub fn new(
        task_type: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type: task_type.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

/// Final status of a task's attempt chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// A provider (or local fallback) produced content
    Success,
    /// Local fallback failed and every remote attempt was a throttle: the
    /// pool is rate-limited, not down
    Throttled,
    /// Local fallback failed and every remote attempt was a non-quota error
    Error,
    /// Local fallback failed with mixed remote failures, or no remote
    /// provider could be attempted at all
    Exhausted,
}

/// Outcome of one completed attempt chain, produced exactly once per task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: Uuid,
    pub task_type: String,
    /// Provider that produced the output, `"local-fallback"`, or `"none"`
    pub provider_used: String,
    pub status: TaskStatus,
    pub raw_output: String,
    pub tokens_consumed: u64,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
    /// Providers tried in this chain (bounded by pool size + 1)
    pub attempts: u32,
    /// Throttled attempts seen before the chain resolved
    pub throttled_attempts: u32,
}

impl TaskResult {
    /// True when the task succeeded only after at least one throttle
    pub fn recovered_after_throttle(&self) -> bool {
        self.status == TaskStatus::Success && self.throttled_attempts > 0
    }
}

/// Typed outcome of a single provider attempt
///
/// Provider failures never surface as `Err` to the dispatcher; the attempt
/// chain pattern-matches on this instead (see the error handling design).
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    Success {
        content: String,
        tokens: u64,
        latency_ms: u64,
    },
    /// Provider signaled quota/rate exhaustion, or the local window was full
    Throttled { message: String },
    /// Timeout, connection failure, or a non-quota rejection
    Error { message: String },
}

impl ExecOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecOutcome::Success { .. })
    }
}
