//! Generative text service.
//!
//! - `client`: OpenAI-compatible chat completions over HTTP
//! - `cache`: memoization and retry around any generator
//!
//! Callers name the operation they perform (`"implementation_plan"`,
//! `"select_files"`, ...). The name is part of the cache key and shows up
//! in logs.

mod cache;
mod client;

pub(crate) use cache::CachedGenerator;
pub(crate) use client::OpenAiCompatClient;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::WorkflowError;

/// Single-shot text generation.
#[async_trait]
pub(crate) trait TextGenerator: Send + Sync {
    async fn generate_text(&self, operation: &str, prompt: &str) -> Result<String>;
}

const JSON_INSTRUCTION: &str =
    "\n\nRespond with a single JSON object and nothing else. Do not wrap it in prose.";

/// Generates text and decodes it as a JSON object.
pub(crate) async fn generate_json(
    generator: &dyn TextGenerator,
    operation: &str,
    prompt: &str,
) -> Result<serde_json::Value> {
    let mut full_prompt = prompt.to_string();
    full_prompt.push_str(JSON_INSTRUCTION);

    let text = generator.generate_text(operation, &full_prompt).await?;
    let value = extract_json(&text)
        .ok_or_else(|| WorkflowError::malformed_response(operation, "no JSON object found"))?;
    debug!(operation, "Decoded JSON response");
    Ok(value)
}

static FENCED_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n(.*?)```").expect("FENCED_JSON_RE regex should compile")
});

/// Pulls a JSON object out of model output.
///
/// Accepts bare JSON, a fenced code block, or an object embedded in prose
/// (outermost braces).
pub(crate) fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(captures) = FENCED_JSON_RE.captures(trimmed) {
        if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(captures[1].trim())
        {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&trimmed[start..=end]) {
        Ok(value @ serde_json::Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Reads a string array field, ignoring non-string entries.
pub(crate) fn string_array(value: &serde_json::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
