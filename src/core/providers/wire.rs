//! Wire-format translation per provider family
//!
//! Builds each family's request envelope from the uniform
//! `(system_prompt, user_prompt)` pair and normalizes responses (content +
//! token usage) before anything reaches the dispatcher. The dispatcher never
//! branches on wire family.

use crate::config::models::{ProviderDescriptor, WireFamily};
use reqwest::RequestBuilder;
use serde_json::{Value, json};
use std::time::Duration;

/// Normalized completion extracted from a provider response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCompletion {
    pub content: String,
    pub tokens: u64,
}

/// Per-family request timeout. Raw inference endpoints cold-load models and
/// get the longer budget.
pub fn request_timeout(family: WireFamily) -> Duration {
    match family {
        WireFamily::ChatCompletion | WireFamily::GenerateContent => Duration::from_secs(60),
        WireFamily::RawInference => Duration::from_secs(90),
    }
}

/// Build the JSON request body for a provider
pub fn build_request(desc: &ProviderDescriptor, system_prompt: &str, user_prompt: &str) -> Value {
    match desc.wire_family {
        WireFamily::ChatCompletion => json!({
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "max_tokens": desc.max_output_tokens,
            "temperature": desc.temperature,
        }),
        WireFamily::GenerateContent => json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [
                        {"text": format!("{}\n\n{}", system_prompt, user_prompt)}
                    ]
                }
            ],
            "generationConfig": {
                "maxOutputTokens": desc.max_output_tokens,
                "temperature": desc.temperature,
            },
        }),
        WireFamily::RawInference => json!({
            "inputs": format!("{}\n\n{}", system_prompt, user_prompt),
            "parameters": {
                "max_new_tokens": desc.max_output_tokens,
                "temperature": desc.temperature,
                "return_full_text": false,
            },
        }),
    }
}

/// Attach the family's auth scheme to a request
pub fn apply_auth(
    builder: RequestBuilder,
    family: WireFamily,
    credential: &str,
) -> RequestBuilder {
    match family {
        WireFamily::ChatCompletion | WireFamily::RawInference => builder.bearer_auth(credential),
        WireFamily::GenerateContent => builder.header("x-goog-api-key", credential),
    }
}

/// True when the HTTP status signals transient quota/capacity exhaustion.
///
/// Raw inference treats 503 ("model loading") the same as 429: both mean
/// "come back later", not "this request was wrong".
pub fn status_signals_throttle(family: WireFamily, status: u16) -> bool {
    status == 429 || (family == WireFamily::RawInference && status == 503)
}

/// True when an error body indicates a genuine quota rejection even though
/// the status was not 429 (some providers answer 400/403 for exhausted
/// billing quotas).
pub fn body_signals_quota(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    lowered.contains("insufficient_quota")
        || lowered.contains("resource_exhausted")
        || lowered.contains("rate limit")
        || lowered.contains("quota exceeded")
}

/// Extract normalized content and token usage from a 2xx response body
pub fn parse_response(family: WireFamily, body: &Value) -> Result<ParsedCompletion, String> {
    match family {
        WireFamily::ChatCompletion => parse_chat_completion(body),
        WireFamily::GenerateContent => parse_generate_content(body),
        WireFamily::RawInference => parse_raw_inference(body),
    }
}

fn parse_chat_completion(body: &Value) -> Result<ParsedCompletion, String> {
    let content = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| "no content in choices[0].message".to_string())?;

    let tokens = body
        .get("usage")
        .and_then(|u| u.get("total_tokens"))
        .and_then(|t| t.as_u64())
        .unwrap_or_else(|| estimate_tokens(content));

    Ok(ParsedCompletion {
        content: content.to_string(),
        tokens,
    })
}

fn parse_generate_content(body: &Value) -> Result<ParsedCompletion, String> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| "no parts in candidates[0].content".to_string())?;

    let content: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");

    if content.is_empty() {
        return Err("candidate contained no text parts".to_string());
    }

    // Usage lives under a differently-named field in this family
    let tokens = body
        .get("usageMetadata")
        .and_then(|u| u.get("totalTokenCount"))
        .and_then(|t| t.as_u64())
        .unwrap_or_else(|| estimate_tokens(&content));

    Ok(ParsedCompletion { content, tokens })
}

fn parse_raw_inference(body: &Value) -> Result<ParsedCompletion, String> {
    // Either a list of generations or a single object
    let generation = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    let content = generation
        .and_then(|g| g.get("generated_text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| "no generated_text in response".to_string())?;

    Ok(ParsedCompletion {
        content: content.to_string(),
        tokens: estimate_tokens(content),
    })
}

/// Rough token estimate for providers that report no usage block
fn estimate_tokens(text: &str) -> u64 {
    ((text.len() / 4) as u64).max(1)
}
