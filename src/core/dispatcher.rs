//! Dispatch orchestrator
//!
//! Pulls tasks from the injected source and executes them in bounded
//! concurrent batches against the provider pool. Each task walks an attempt
//! chain - ranked providers first, local fallback last - and produces
//! exactly one `TaskResult`. Batch width adapts to the number of available
//! providers; the dispatcher waits for a full batch before starting the
//! next, which keeps backpressure and progress reporting deterministic.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::future;
use tracing::{debug, info, warn};

use crate::config::models::DispatchConfig;
use crate::core::providers::LocalCompletion;
use crate::core::router::SmartRouter;
use crate::core::stats::RunStats;
use crate::core::types::{ExecOutcome, NO_PROVIDER, Task, TaskResult, TaskStatus};
use crate::storage::{ResultSink, SummaryStore};
use crate::utils::error::Result;

/// Scale factor between available providers and batch width
const BATCH_WIDTH_PER_PROVIDER: usize = 3;

/// Cooperative stop flag, observed between batches (never mid-batch)
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. The in-flight batch drains naturally.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pull interface for the next unit of work.
///
/// Task-type selection and prompt templating belong to the business layer;
/// the dispatcher only pulls.
pub trait TaskSource: Send + Sync {
    fn next_task(&self) -> Task;
}

/// Fixed-prompt source, enough for smoke runs and health exercises
pub struct StaticTaskSource {
    task_type: String,
    system_prompt: String,
    user_prompt: String,
}

impl StaticTaskSource {
    pub fn new(
        task_type: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            task_type: task_type.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

impl TaskSource for StaticTaskSource {
    fn next_task(&self) -> Task {
        Task::new(&self.task_type, &self.system_prompt, &self.user_prompt)
    }
}

/// The orchestrator: owns the task stream and run statistics
pub struct Dispatcher {
    router: Arc<SmartRouter>,
    local: Arc<dyn LocalCompletion>,
    source: Arc<dyn TaskSource>,
    sink: Arc<dyn ResultSink>,
    store: Arc<dyn SummaryStore>,
    config: DispatchConfig,
    stop: StopHandle,
}

impl Dispatcher {
    pub fn new(
        router: Arc<SmartRouter>,
        local: Arc<dyn LocalCompletion>,
        source: Arc<dyn TaskSource>,
        sink: Arc<dyn ResultSink>,
        store: Arc<dyn SummaryStore>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            router,
            local,
            source,
            sink,
            store,
            config,
            stop: StopHandle::new(),
        }
    }

    /// Handle for requesting a cooperative stop from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// `min(3 x available providers, ceiling)`, floor 1 so a pool with zero
    /// credentials still drains through local fallback
    fn batch_width(&self, max_power: bool) -> usize {
        let ceiling = if max_power {
            self.config.max_power_ceiling
        } else {
            self.config.batch_ceiling
        };
        (BATCH_WIDTH_PER_PROVIDER * self.router.available_count()).clamp(1, ceiling.max(1))
    }

    /// Run a bounded sprint of `task_count` tasks to completion.
    ///
    /// Always returns a summary, even when every task failed. Only a
    /// persistence failure aborts early.
    pub async fn run_sprint(
        &self,
        task_count: usize,
        sprint_kind: &str,
        max_power: bool,
    ) -> Result<RunStats> {
        self.router.reset_ranking();
        let mut stats = RunStats::begin(sprint_kind);
        info!(
            task_count,
            sprint_kind,
            max_power,
            providers = self.router.available_count(),
            "sprint starting"
        );

        let mut remaining = task_count;
        while remaining > 0 {
            if self.stop.is_stopped() {
                info!("stop requested; finishing sprint without new batches");
                break;
            }

            let width = self.batch_width(max_power).min(remaining);
            let tasks: Vec<Task> = (0..width).map(|_| self.source.next_task()).collect();
            debug!(width, remaining, "starting batch");

            // Barrier: the whole batch completes before the next one starts
            let results = future::join_all(tasks.into_iter().map(|t| self.run_task(t))).await;
            for result in results {
                stats.record(&result?);
            }

            remaining -= width;
            info!(
                completed = task_count - remaining,
                total = task_count,
                "batch complete"
            );
        }

        stats.finish();
        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            recovered_after_throttle = stats.recovered_after_throttle,
            tokens = stats.tokens_consumed,
            "sprint complete"
        );

        self.store.persist_summary(&stats).await?;
        let mut cumulative = self.store.load_cumulative().await?.unwrap_or_default();
        cumulative.merge(&stats);
        self.store.save_cumulative(&cumulative).await?;

        Ok(stats)
    }

    /// Repeat sprints on a fixed interval until stopped.
    ///
    /// Per-sprint statistics and router ranking reset between sprints; the
    /// provider rate limiters are continuous across them.
    pub async fn run_daemon(&self, task_count: usize, interval: Duration) -> Result<()> {
        info!(task_count, interval_secs = interval.as_secs(), "daemon starting");
        loop {
            self.run_sprint(task_count, "daemon", false).await?;
            if self.stop.is_stopped() {
                return Ok(());
            }

            let woke = tokio::time::Instant::now() + interval;
            while tokio::time::Instant::now() < woke {
                if self.stop.is_stopped() {
                    info!("daemon stopping");
                    return Ok(());
                }
                let left = woke - tokio::time::Instant::now();
                tokio::time::sleep(left.min(Duration::from_secs(1))).await;
            }
        }
    }

    /// Walk one task's attempt chain to a single `TaskResult`.
    ///
    /// Never tries the same provider twice, so the chain is bounded at pool
    /// size + 1 (local fallback). `Err` only on persistence failure.
    async fn run_task(&self, task: Task) -> Result<TaskResult> {
        let mut tried: HashSet<String> = HashSet::new();
        let mut attempts: u32 = 0;
        let mut throttled_attempts: u32 = 0;
        let mut error_attempts: u32 = 0;

        while let Some(client) = self.router.best_eligible(&tried) {
            attempts += 1;
            tried.insert(client.name().to_string());

            match client.execute(&task.system_prompt, &task.user_prompt).await {
                ExecOutcome::Success {
                    content,
                    tokens,
                    latency_ms,
                } => {
                    let result = TaskResult {
                        task_id: task.id,
                        task_type: task.task_type.clone(),
                        provider_used: client.name().to_string(),
                        status: TaskStatus::Success,
                        raw_output: content,
                        tokens_consumed: tokens,
                        latency_ms,
                        timestamp: Utc::now(),
                        attempts,
                        throttled_attempts,
                    };
                    self.sink.persist(&result).await?;
                    return Ok(result);
                }
                ExecOutcome::Throttled { message } => {
                    throttled_attempts += 1;
                    debug!(
                        task_id = %task.id,
                        provider = client.name(),
                        message,
                        "throttled; trying next provider"
                    );
                    self.router.report_failure(client.name());
                }
                ExecOutcome::Error { message } => {
                    error_attempts += 1;
                    warn!(
                        task_id = %task.id,
                        provider = client.name(),
                        message,
                        "provider failed; trying next provider"
                    );
                    self.router.report_failure(client.name());
                }
            }
        }

        // Remote pool exhausted: degrade to the local backend
        attempts += 1;
        debug!(task_id = %task.id, "remote pool exhausted; using local fallback");
        let result = match self
            .local
            .complete(&task.system_prompt, &task.user_prompt)
            .await
        {
            ExecOutcome::Success {
                content,
                tokens,
                latency_ms,
            } => TaskResult {
                task_id: task.id,
                task_type: task.task_type.clone(),
                provider_used: self.local.name().to_string(),
                status: TaskStatus::Success,
                raw_output: content,
                tokens_consumed: tokens,
                latency_ms,
                timestamp: Utc::now(),
                attempts,
                throttled_attempts,
            },
            ExecOutcome::Throttled { message } | ExecOutcome::Error { message } => {
                warn!(task_id = %task.id, message, "local fallback failed; task exhausted");
                // Terminal status keeps the failure mode visible to operators:
                // a uniformly throttled chain means the pool is rate-limited,
                // not down.
                let status = if throttled_attempts > 0 && error_attempts == 0 {
                    TaskStatus::Throttled
                } else if error_attempts > 0 && throttled_attempts == 0 {
                    TaskStatus::Error
                } else {
                    TaskStatus::Exhausted
                };
                TaskResult {
                    task_id: task.id,
                    task_type: task.task_type.clone(),
                    provider_used: NO_PROVIDER.to_string(),
                    status,
                    raw_output: String::new(),
                    tokens_consumed: 0,
                    latency_ms: 0,
                    timestamp: Utc::now(),
                    attempts,
                    throttled_attempts,
                }
            }
        };
        self.sink.persist(&result).await?;
        Ok(result)
    }
}
