//! Configuration tree for the review-orchestration binary.
//!
//! One struct per concern, `#[serde(default)]` throughout, hand-written
//! `Default` impls documenting every default inline. This crate has no
//! dependency on any other `quorum-*` crate; the CLI is responsible for
//! translating these plain, serde-friendly values into the richer types
//! `quorum-core` and `quorum-resilience` expect.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Fan-out tuning: how many agents run concurrently, how many passes each
/// one makes, and the two timeouts from `ReviewContext`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    pub parallelism: usize,
    pub passes: u32,
    pub timeout_minutes: u64,
    pub idle_timeout_minutes: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            passes: 1,
            timeout_minutes: 10,
            idle_timeout_minutes: 3,
        }
    }
}

/// Retry/backoff parameters consumed by `ReviewRetryExecutor`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 1_000,
            backoff_max_ms: 8_000,
        }
    }
}

/// Mirrors `quorum_resilience::CircuitBreakerConfig`'s shape without
/// depending on that crate, so the same record can be deserialized straight
/// off a TOML file and handed to the CLI to construct the real breaker
/// config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub reset_timeout_ms: i64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 8,
            reset_timeout_ms: 30_000,
        }
    }
}

/// Accumulation-buffer tuning forwarded to every `ContentCollector`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulationConfig {
    pub max_accumulated_size: usize,
    pub initial_accumulated_capacity: usize,
}

impl Default for AccumulationConfig {
    fn default() -> Self {
        Self {
            max_accumulated_size: 2 * 1024 * 1024,
            initial_accumulated_capacity: 4 * 1024,
        }
    }
}

/// Tuning for the executive-summary AI path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub model: String,
    pub max_attempts: u32,
    pub max_content_per_agent: usize,
    pub max_total_prompt_content: usize,
    pub summary_timeout_minutes: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5".to_string(),
            max_attempts: 3,
            max_content_per_agent: 4_000,
            max_total_prompt_content: 20_000,
            summary_timeout_minutes: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub orchestration: OrchestrationConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerSettings,
    pub accumulation: AccumulationConfig,
    pub summary: SummaryConfig,
    /// Overridable via `QUORUM_TEMPLATE_DIR` — where the (externally
    /// owned) report/prompt templates live on disk.
    pub template_dir: Option<String>,
}

impl AppConfig {
    /// Loads `.env` via `dotenvy`, then reads `QUORUM_CONFIG_PATH` (default
    /// `quorum.toml`) through [`Self::load_from`].
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = env::var("QUORUM_CONFIG_PATH").unwrap_or_else(|_| "quorum.toml".to_string());
        Self::load_from(path)
    }

    /// Reads `path` if it exists (falling back to defaults otherwise), then
    /// applies the `QUORUM_TEMPLATE_DIR` environment override.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(value) = env::var("QUORUM_TEMPLATE_DIR") {
            if !value.is_empty() {
                config.template_dir = Some(value);
            }
        }

        Ok(config)
    }
}
