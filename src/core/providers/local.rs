//! Local fallback backend
//!
//! Invoked only when every remote provider is exhausted or unavailable.
//! Zero quota, zero cost: no rate limiter, no credential.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::core::types::{ExecOutcome, LOCAL_FALLBACK};

/// Seam for the backend of last resort
#[async_trait]
pub trait LocalCompletion: Send + Sync {
    /// Name recorded as `provider_used` on results
    fn name(&self) -> &str {
        LOCAL_FALLBACK
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> ExecOutcome;
}

/// Deterministic built-in backend: echoes a degraded-mode completion so
/// sprints always finish even with zero remote capacity.
#[derive(Debug, Default)]
pub struct StubLocalBackend;

#[async_trait]
impl LocalCompletion for StubLocalBackend {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> ExecOutcome {
        let started = Instant::now();
        let excerpt: String = user_prompt.chars().take(120).collect();
        let content = format!(
            "[degraded: generated locally without a remote provider]\n{}",
            excerpt
        );
        let tokens = ((content.len() / 4) as u64).max(1);
        debug!("local fallback produced {} estimated tokens", tokens);
        ExecOutcome::Success {
            content,
            tokens,
            latency_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Local backend over an OpenAI-compatible HTTP endpoint on this machine
/// (an ollama-style server). Still zero-quota: local capacity is not
/// metered, so there is no rate limiter in front of it.
#[derive(Debug)]
pub struct HttpLocalBackend {
    endpoint: String,
    model: String,
    http: reqwest::Client,
}

impl HttpLocalBackend {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LocalCompletion for HttpLocalBackend {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> ExecOutcome {
        let started = Instant::now();
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });

        let response = match self.http.post(&self.endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                return ExecOutcome::Error {
                    message: format!("local backend unreachable: {}", e),
                };
            }
        };

        if !response.status().is_success() {
            return ExecOutcome::Error {
                message: format!("local backend returned status {}", response.status()),
            };
        }

        let json: Value = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                return ExecOutcome::Error {
                    message: format!("local backend sent malformed JSON: {}", e),
                };
            }
        };

        let content = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();

        if content.is_empty() {
            return ExecOutcome::Error {
                message: "local backend returned empty content".to_string(),
            };
        }

        let tokens = json
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(|t| t.as_u64())
            .unwrap_or_else(|| ((content.len() / 4) as u64).max(1));

        ExecOutcome::Success {
            content,
            tokens,
            latency_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_backend_always_succeeds() {
        let backend = StubLocalBackend;
        let outcome = backend.complete("sys", "write a post about rust").await;
        match outcome {
            ExecOutcome::Success { content, tokens, .. } => {
                assert!(content.contains("write a post about rust"));
                assert!(tokens >= 1);
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(backend.name(), LOCAL_FALLBACK);
    }
}
