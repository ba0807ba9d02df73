//! One-shot provider reachability check
//!
//! Exercises every configured provider once with a tiny probe prompt.
//! Scheduling repeated checks is the caller's concern.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::router::SmartRouter;
use super::types::ExecOutcome;

const PROBE_SYSTEM_PROMPT: &str = "You are a connectivity probe.";
const PROBE_USER_PROMPT: &str = "Reply with the single word: ok";

/// Per-provider reachability report
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    /// Credential resolved at startup
    pub available: bool,
    /// Provider answered the probe (a throttle still counts as reachable)
    pub reachable: bool,
    pub detail: String,
    pub latency_ms: Option<u64>,
    pub checked_at: DateTime<Utc>,
}

/// Probe every provider in the pool once, sequentially.
///
/// Sequential on purpose: a health check should not burn concurrent quota.
pub async fn run_health_check(router: &SmartRouter) -> Vec<ProviderHealth> {
    let mut reports = Vec::with_capacity(router.len());

    for client in router.clients() {
        let checked_at = Utc::now();

        if !client.available() {
            reports.push(ProviderHealth {
                provider: client.name().to_string(),
                available: false,
                reachable: false,
                detail: "credential missing".to_string(),
                latency_ms: None,
                checked_at,
            });
            continue;
        }

        let report = match client.execute(PROBE_SYSTEM_PROMPT, PROBE_USER_PROMPT).await {
            ExecOutcome::Success { latency_ms, .. } => ProviderHealth {
                provider: client.name().to_string(),
                available: true,
                reachable: true,
                detail: "ok".to_string(),
                latency_ms: Some(latency_ms),
                checked_at,
            },
            ExecOutcome::Throttled { message } => ProviderHealth {
                provider: client.name().to_string(),
                available: true,
                reachable: true,
                detail: format!("throttled: {}", message),
                latency_ms: None,
                checked_at,
            },
            ExecOutcome::Error { message } => ProviderHealth {
                provider: client.name().to_string(),
                available: true,
                reachable: false,
                detail: message,
                latency_ms: None,
                checked_at,
            },
        };
        reports.push(report);
    }

    reports
}
