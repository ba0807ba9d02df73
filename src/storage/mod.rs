//! Persistence seams and file-backed implementations
//!
//! The dispatcher only knows the traits; the file implementations here are
//! what the operator binary wires in. A storage failure is a hard error
//! that aborts the sprint - the only failure class that does.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::core::stats::{CumulativeStats, RunStats};
use crate::core::types::TaskResult;
use crate::utils::error::{Result, SwarmError};

/// Sink for completed task results
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, result: &TaskResult) -> Result<()>;
}

/// Store for sprint summaries and the rolling cumulative record
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn persist_summary(&self, stats: &RunStats) -> Result<()>;
    async fn load_cumulative(&self) -> Result<Option<CumulativeStats>>;
    async fn save_cumulative(&self, stats: &CumulativeStats) -> Result<()>;
}

async fn append_json_line<T: serde::Serialize>(path: &PathBuf, record: &T) -> Result<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| SwarmError::storage(format!("failed to open {:?}: {}", path, e)))?;
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| SwarmError::storage(format!("failed to append to {:?}: {}", path, e)))?;
    Ok(())
}

/// Appends one JSON line per task result
pub struct JsonlResultSink {
    path: PathBuf,
}

impl JsonlResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResultSink for JsonlResultSink {
    async fn persist(&self, result: &TaskResult) -> Result<()> {
        append_json_line(&self.path, result).await
    }
}

/// Sprint summaries as JSONL plus a single-file cumulative record
pub struct JsonSummaryStore {
    summary_path: PathBuf,
    cumulative_path: PathBuf,
}

impl JsonSummaryStore {
    pub fn new(summary_path: impl Into<PathBuf>, cumulative_path: impl Into<PathBuf>) -> Self {
        Self {
            summary_path: summary_path.into(),
            cumulative_path: cumulative_path.into(),
        }
    }
}

#[async_trait]
impl SummaryStore for JsonSummaryStore {
    async fn persist_summary(&self, stats: &RunStats) -> Result<()> {
        append_json_line(&self.summary_path, stats).await
    }

    async fn load_cumulative(&self) -> Result<Option<CumulativeStats>> {
        match tokio::fs::read_to_string(&self.cumulative_path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SwarmError::storage(format!(
                "failed to read {:?}: {}",
                self.cumulative_path, e
            ))),
        }
    }

    async fn save_cumulative(&self, stats: &CumulativeStats) -> Result<()> {
        let json = serde_json::to_string_pretty(stats)?;
        tokio::fs::write(&self.cumulative_path, json)
            .await
            .map_err(|e| {
                SwarmError::storage(format!(
                    "failed to write {:?}: {}",
                    self.cumulative_path, e
                ))
            })?;
        Ok(())
    }
}
