//! Memoization and retry for generative calls.
//!
//! Responses are stored at `{cache_dir}/{key}.json`, where the key is a
//! SHA-256 over the operation name, the model and the prompt. The retry
//! policy here only covers the service call; it is independent of the
//! workflow's own bounded loops.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use super::TextGenerator;

/// Stable cache key for an operation and its arguments.
pub(crate) fn cache_key(operation: &str, args: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    for arg in args {
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart
        hasher.update((arg.len() as u64).to_le_bytes());
        hasher.update(arg.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    operation: String,
    response: String,
    created_at: DateTime<Utc>,
}

/// Wraps a generator with an on-disk cache and retries.
pub(crate) struct CachedGenerator<G> {
    inner: G,
    model: String,
    cache_dir: Option<PathBuf>,
    max_attempts: u32,
    base_delay: Duration,
}

impl<G: TextGenerator> CachedGenerator<G> {
    /// `cache_dir = None` disables memoization but keeps retries.
    pub fn new(inner: G, model: impl Into<String>, cache_dir: Option<PathBuf>) -> Self {
        Self {
            inner,
            model: model.into(),
            cache_dir,
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self
    }

    fn entry_path(dir: &Path, key: &str) -> PathBuf {
        dir.join(format!("{key}.json"))
    }

    fn load(&self, key: &str) -> Option<String> {
        let dir = self.cache_dir.as_ref()?;
        let path = Self::entry_path(dir, key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CachedResponse>(&content) {
            Ok(entry) => {
                debug!(path = %path.display(), "Cache hit");
                Some(entry.response)
            }
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn store(&self, key: &str, operation: &str, response: &str) -> Result<()> {
        let Some(dir) = self.cache_dir.as_ref() else {
            return Ok(());
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache dir {}", dir.display()))?;

        let entry = CachedResponse {
            operation: operation.to_string(),
            response: response.to_string(),
            created_at: Utc::now(),
        };
        let path = Self::entry_path(dir, key);
        fs::write(&path, serde_json::to_string_pretty(&entry)?)
            .with_context(|| format!("Failed to write cache entry {}", path.display()))?;
        Ok(())
    }
}

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Delay before retry number `retry` (1-based): `base`, doubled per retry.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

#[async_trait]
impl<G: TextGenerator> TextGenerator for CachedGenerator<G> {
    async fn generate_text(&self, operation: &str, prompt: &str) -> Result<String> {
        let key = cache_key(operation, &[&self.model, prompt]);
        if let Some(hit) = self.load(&key) {
            return Ok(hit);
        }

        let mut last_error = None;
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                debug!(
                    operation,
                    "Generation retry attempt {} after {:?}",
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            match self.inner.generate_text(operation, prompt).await {
                Ok(text) => {
                    if let Err(e) = self.store(&key, operation, &text) {
                        warn!("Failed to cache {} response: {}", operation, e);
                    }
                    return Ok(text);
                }
                Err(e) => {
                    warn!(operation, attempt = attempt + 1, "Generation failed: {e:#}");
                    last_error = Some(e);
                }
            }
        }

        let err = last_error.unwrap_or_else(|| anyhow::anyhow!("no attempts made"));
        Err(err.context(format!(
            "{operation} failed after {} attempt(s)",
            self.max_attempts
        )))
    }
}
