//! Sprint and cumulative statistics
//!
//! `RunStats` is owned exclusively by the dispatcher during a sprint and
//! flushed at sprint end. `CumulativeStats` is the rolling record merged
//! across sprints (read-modify-write, single writer). The merge is
//! associative and commutative over all totals, so replaying summaries in
//! any order yields the same cumulative record.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{TaskResult, TaskStatus};

/// Per-sprint statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub sprint_kind: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks_total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Tasks that succeeded only after at least one throttled attempt;
    /// lets an operator tell "providers are down" from "providers are slow"
    pub recovered_after_throttle: u64,
    /// Throttled attempts across all chains (including recovered ones)
    pub throttled_attempts: u64,
    /// Successful completions per provider (includes "local-fallback")
    pub by_provider: HashMap<String, u64>,
    pub tokens_consumed: u64,
    pub duration_secs: f64,
}

impl RunStats {
    pub fn begin(sprint_kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            sprint_kind: sprint_kind.into(),
            started_at: now,
            finished_at: now,
            tasks_total: 0,
            succeeded: 0,
            failed: 0,
            recovered_after_throttle: 0,
            throttled_attempts: 0,
            by_provider: HashMap::new(),
            tokens_consumed: 0,
            duration_secs: 0.0,
        }
    }

    /// Fold one completed task into the sprint tallies
    pub fn record(&mut self, result: &TaskResult) {
        self.tasks_total += 1;
        self.throttled_attempts += result.throttled_attempts as u64;
        self.tokens_consumed += result.tokens_consumed;

        match result.status {
            TaskStatus::Success => {
                self.succeeded += 1;
                if result.recovered_after_throttle() {
                    self.recovered_after_throttle += 1;
                }
                *self
                    .by_provider
                    .entry(result.provider_used.clone())
                    .or_insert(0) += 1;
            }
            TaskStatus::Throttled | TaskStatus::Error | TaskStatus::Exhausted => {
                self.failed += 1;
            }
        }
    }

    /// Close out the sprint and fix the wall-clock duration
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
        self.duration_secs = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;
    }

    /// Derived throughput over the sprint's wall-clock duration
    pub fn tasks_per_minute(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        self.tasks_total as f64 * 60.0 / self.duration_secs
    }
}

/// Rolling record merged across sprints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CumulativeStats {
    pub sprints: u64,
    pub tasks_total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub recovered_after_throttle: u64,
    pub tokens_consumed: u64,
    pub by_provider: HashMap<String, u64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl CumulativeStats {
    /// Merge one sprint summary into the cumulative record.
    ///
    /// Pure addition over totals: merging A then B equals merging B then A.
    pub fn merge(&mut self, run: &RunStats) {
        self.sprints += 1;
        self.tasks_total += run.tasks_total;
        self.succeeded += run.succeeded;
        self.failed += run.failed;
        self.recovered_after_throttle += run.recovered_after_throttle;
        self.tokens_consumed += run.tokens_consumed;
        for (provider, count) in &run.by_provider {
            *self.by_provider.entry(provider.clone()).or_insert(0) += count;
        }
        self.last_updated = Some(Utc::now());
    }
}
