//! Provider client
//!
//! Wraps one remote provider's HTTP call behind the uniform
//! `(system_prompt, user_prompt)` interface. Each client exclusively owns
//! its rate limiter and usage counters; the descriptor and resolved
//! credential are fixed at construction for the process lifetime.

use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::models::ProviderDescriptor;
use crate::config::resolve_credential;
use crate::core::rate_limiter::RateLimiter;
use crate::core::types::ExecOutcome;
use crate::utils::error::{Result, SwarmError};

use super::wire;

/// Cumulative usage counters for one provider
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderUsage {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub throttles: u64,
    pub tokens_consumed: u64,
    pub total_latency_ms: u64,
}

/// One remote provider: descriptor, credential, HTTP client, rate limiter,
/// and usage counters
#[derive(Debug)]
pub struct ProviderClient {
    descriptor: ProviderDescriptor,
    /// Resolved once at construction; `None` disables the client for the
    /// process lifetime without crashing the dispatcher
    credential: Option<String>,
    http: reqwest::Client,
    limiter: RateLimiter,
    usage: Mutex<ProviderUsage>,
}

impl ProviderClient {
    /// Create a client, resolving its credential from the environment
    pub fn new(descriptor: ProviderDescriptor) -> Result<Self> {
        let credential = resolve_credential(&descriptor.credential_ref);
        if credential.is_none() {
            warn!(
                provider = %descriptor.name,
                credential_ref = %descriptor.credential_ref,
                "credential not set; provider disabled for this process"
            );
        }
        Self::with_credential(descriptor, credential)
    }

    /// Create a client with an explicit credential (or none).
    ///
    /// Useful when the credential comes from somewhere other than the
    /// environment.
    pub fn with_credential(
        descriptor: ProviderDescriptor,
        credential: Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(wire::request_timeout(descriptor.wire_family))
            .build()
            .map_err(|e| SwarmError::http(format!("Failed to create HTTP client: {}", e)))?;

        let limiter = RateLimiter::new(
            descriptor.requests_per_minute,
            descriptor.tokens_per_day,
        );

        Ok(Self {
            descriptor,
            credential,
            http,
            limiter,
            usage: Mutex::new(ProviderUsage::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    /// True when the credential resolved at startup
    pub fn available(&self) -> bool {
        self.credential.is_some()
    }

    /// True when the provider could accept a request right now
    pub fn eligible(&self) -> bool {
        self.available() && self.limiter.can_request()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Snapshot of the cumulative usage counters
    pub fn usage(&self) -> ProviderUsage {
        self.usage.lock().clone()
    }

    /// Execute one completion attempt against this provider.
    ///
    /// Re-checks eligibility internally and returns `Throttled` with no
    /// network call when the window is full, so callers may invoke it
    /// speculatively. Never returns `Err`: every failure mode is a typed
    /// outcome the dispatcher pattern-matches on.
    pub async fn execute(&self, system_prompt: &str, user_prompt: &str) -> ExecOutcome {
        let Some(credential) = &self.credential else {
            return ExecOutcome::Error {
                message: format!("credential '{}' not set", self.descriptor.credential_ref),
            };
        };

        // Claim a window slot atomically; concurrent batch tasks cannot
        // oversubscribe the quota.
        if !self.limiter.try_acquire() {
            self.usage.lock().throttles += 1;
            return ExecOutcome::Throttled {
                message: "rate limit window full or throttle backoff active".to_string(),
            };
        }

        self.usage.lock().attempts += 1;
        let started = Instant::now();

        let body = wire::build_request(&self.descriptor, system_prompt, user_prompt);
        let request = wire::apply_auth(
            self.http.post(&self.descriptor.endpoint).json(&body),
            self.descriptor.wire_family,
            credential,
        );

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.limiter.record_error();
                self.usage.lock().failures += 1;
                let message = if e.is_timeout() {
                    format!("request timed out: {}", e)
                } else {
                    format!("network error: {}", e)
                };
                return ExecOutcome::Error { message };
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                self.limiter.record_error();
                self.usage.lock().failures += 1;
                return ExecOutcome::Error {
                    message: format!("failed to read response body: {}", e),
                };
            }
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        if wire::status_signals_throttle(self.descriptor.wire_family, status)
            || (status >= 400 && wire::body_signals_quota(&text))
        {
            self.limiter.record_throttle();
            self.usage.lock().throttles += 1;
            debug!(provider = %self.descriptor.name, status, "provider throttled request");
            return ExecOutcome::Throttled {
                message: format!("provider returned status {}", status),
            };
        }

        if !(200..300).contains(&status) {
            self.limiter.record_error();
            self.usage.lock().failures += 1;
            return ExecOutcome::Error {
                message: format!("unexpected status {}: {}", status, truncate(&text, 200)),
            };
        }

        let json: Value = match serde_json::from_str(&text) {
            Ok(json) => json,
            Err(e) => {
                self.limiter.record_error();
                self.usage.lock().failures += 1;
                return ExecOutcome::Error {
                    message: format!("malformed response JSON: {}", e),
                };
            }
        };

        match wire::parse_response(self.descriptor.wire_family, &json) {
            Ok(parsed) => {
                self.limiter.record_success(parsed.tokens);
                {
                    let mut usage = self.usage.lock();
                    usage.successes += 1;
                    usage.tokens_consumed += parsed.tokens;
                    usage.total_latency_ms += latency_ms;
                }
                debug!(
                    provider = %self.descriptor.name,
                    tokens = parsed.tokens,
                    latency_ms,
                    "completion succeeded"
                );
                ExecOutcome::Success {
                    content: parsed.content,
                    tokens: parsed.tokens,
                    latency_ms,
                }
            }
            Err(reason) => {
                self.limiter.record_error();
                self.usage.lock().failures += 1;
                ExecOutcome::Error {
                    message: format!("unexpected response shape: {}", reason),
                }
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::WireFamily;

    fn descriptor(name: &str) -> ProviderDescriptor {
        ProviderDescriptor {
            name: name.to_string(),
            wire_family: WireFamily::ChatCompletion,
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            credential_ref: "CLOUDSWARM_TEST_NO_SUCH_KEY".to_string(),
            requests_per_minute: 10,
            tokens_per_day: 0,
            priority: 0,
            max_output_tokens: 128,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_missing_credential_disables_client() {
        let client = ProviderClient::new(descriptor("p1")).unwrap();
        assert!(!client.available());
        assert!(!client.eligible());
    }

    #[tokio::test]
    async fn test_unavailable_client_errors_without_network() {
        let client = ProviderClient::with_credential(descriptor("p1"), None).unwrap();
        match client.execute("sys", "usr").await {
            ExecOutcome::Error { message } => assert!(message.contains("credential")),
            other => panic!("expected error outcome, got {:?}", other),
        }
        assert_eq!(client.usage().attempts, 0);
    }

    #[tokio::test]
    async fn test_ineligible_client_throttles_without_network() {
        let mut desc = descriptor("p1");
        desc.requests_per_minute = 0;
        let client =
            ProviderClient::with_credential(desc, Some("test-key".to_string())).unwrap();

        match client.execute("sys", "usr").await {
            ExecOutcome::Throttled { .. } => {}
            other => panic!("expected throttled outcome, got {:?}", other),
        }
        let usage = client.usage();
        assert_eq!(usage.attempts, 0);
        assert_eq!(usage.throttles, 1);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("ok", 200), "ok");
    }
}
