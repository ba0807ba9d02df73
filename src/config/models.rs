//! Configuration data models
//!
//! Provider descriptors are immutable after load; everything mutable at
//! runtime (rate limiter windows, usage counters) lives inside the clients.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Wire protocol family a provider speaks
///
/// Selected once at client construction from the descriptor; nothing
/// downstream of the provider client ever branches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireFamily {
    /// OpenAI-style: messages array, bearer auth, `choices`/`usage` response
    ChatCompletion,
    /// Gemini-style: content-parts envelope, `candidates`/`usageMetadata`
    GenerateContent,
    /// HuggingFace-style: single prompt string in, list or object out
    RawInference,
}

/// Static per-provider configuration, loaded at startup and never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Unique provider name, used for routing and reporting
    pub name: String,
    /// Wire protocol family
    pub wire_family: WireFamily,
    /// Full endpoint URL for completion requests
    pub endpoint: String,
    /// Environment variable holding this provider's credential
    pub credential_ref: String,
    /// Sliding-window request quota (0 = misconfigured, always ineligible)
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,
    /// Rolling daily token budget (0 = unlimited)
    #[serde(default)]
    pub tokens_per_day: u64,
    /// Relative priority, higher = preferred
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_rpm() -> u32 {
    10
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

/// Dispatcher tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Batch width ceiling in normal mode
    #[serde(default = "default_batch_ceiling")]
    pub batch_ceiling: usize,
    /// Batch width ceiling in max-power mode
    #[serde(default = "default_max_power_ceiling")]
    pub max_power_ceiling: usize,
    /// Seconds between sprints in daemon mode
    #[serde(default = "default_daemon_interval")]
    pub daemon_interval_secs: u64,
    /// JSONL file receiving one line per completed task
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
    /// JSONL file receiving one line per sprint summary
    #[serde(default = "default_summary_path")]
    pub summary_path: PathBuf,
    /// JSON file holding the rolling cumulative record
    #[serde(default = "default_cumulative_path")]
    pub cumulative_path: PathBuf,
}

fn default_batch_ceiling() -> usize {
    12
}

fn default_max_power_ceiling() -> usize {
    30
}

fn default_daemon_interval() -> u64 {
    3600
}

fn default_results_path() -> PathBuf {
    PathBuf::from("swarm_results.jsonl")
}

fn default_summary_path() -> PathBuf {
    PathBuf::from("swarm_summaries.jsonl")
}

fn default_cumulative_path() -> PathBuf {
    PathBuf::from("swarm_cumulative.json")
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_ceiling: default_batch_ceiling(),
            max_power_ceiling: default_max_power_ceiling(),
            daemon_interval_secs: default_daemon_interval(),
            results_path: default_results_path(),
            summary_path: default_summary_path(),
            cumulative_path: default_cumulative_path(),
        }
    }
}
