use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use quorum_collector::{SharedScheduler, SystemClock};
use quorum_core::{ReviewResult, SessionClient, SessionConfig, SystemPromptMode};
use quorum_resilience::CircuitBreaker;
use quorum_runner::ReviewSessionMessageSender;

use crate::fallback::FallbackSummary;
use crate::prompt::SummaryPromptBuilder;

/// Tuning for the AI-narrative attempt loop. Defaults are
/// conservative enough for a single executive-summary pass; all of them are
/// expected to be overridden from configuration in a full deployment.
#[derive(Debug, Clone)]
pub struct SummaryGeneratorConfig {
    pub model: String,
    pub system_prompt_template: String,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub summary_timeout: Duration,
    pub max_content_per_agent: usize,
    pub max_total_prompt_content: usize,
    pub max_accumulated_size: usize,
}

impl Default for SummaryGeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5".to_string(),
            system_prompt_template: "You are an executive summarizer for a multi-agent code review. \
                Write a concise narrative synthesizing the findings across all agents."
                .to_string(),
            max_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_max_ms: 8_000,
            summary_timeout: Duration::from_secs(120),
            max_content_per_agent: 4_000,
            max_total_prompt_content: 20_000,
            max_accumulated_size: 2 * 1024 * 1024,
        }
    }
}

/// Produces the executive-summary narrative: an AI-generated path
/// guarded by the summary circuit breaker and bounded retries with full
/// jitter, falling back to the deterministic [`FallbackSummary`] on any
/// failure path — summary generation is explicitly best-effort.
pub struct SummaryGenerator;

impl SummaryGenerator {
    pub async fn generate(
        session_client: &dyn SessionClient,
        shared_scheduler: &SharedScheduler,
        breaker: &CircuitBreaker,
        config: &SummaryGeneratorConfig,
        repository: &str,
        results: &[ReviewResult],
    ) -> String {
        for attempt_number in 1..=config.max_attempts {
            if !breaker.allow_request() {
                warn!("summary circuit breaker open; falling back to the deterministic summary");
                break;
            }

            match Self::attempt(session_client, shared_scheduler, config, repository, results).await {
                Ok(narrative) => {
                    breaker.on_success();
                    return narrative;
                }
                Err(err) => {
                    breaker.on_failure();
                    warn!(attempt_number, %err, "executive summary attempt failed");
                    if attempt_number < config.max_attempts {
                        tokio::time::sleep(Self::backoff_with_full_jitter(config, attempt_number)).await;
                    }
                }
            }
        }

        FallbackSummary::render(results)
    }

    async fn attempt(
        session_client: &dyn SessionClient,
        shared_scheduler: &SharedScheduler,
        config: &SummaryGeneratorConfig,
        repository: &str,
        results: &[ReviewResult],
    ) -> anyhow::Result<String> {
        let user_prompt =
            SummaryPromptBuilder::build_user_prompt(repository, results, config.max_content_per_agent, config.max_total_prompt_content);

        let session_config = SessionConfig {
            model: config.model.clone(),
            system_prompt_mode: SystemPromptMode::Replace,
            system_prompt: config.system_prompt_template.clone(),
            mcp_servers: None,
            reasoning_effort: None,
        };

        let session = session_client.create_session(session_config).await?;

        let outcome = ReviewSessionMessageSender::send_with_activity_timeout(
            session.as_ref(),
            &user_prompt,
            config.summary_timeout,
            config.summary_timeout,
            shared_scheduler,
            config.max_accumulated_size,
            std::sync::Arc::new(SystemClock),
        )
        .await;

        if let Err(err) = session.close().await {
            debug!(%err, "summary session close failed, ignoring");
        }

        match outcome? {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => anyhow::bail!("executive summary session returned an empty response"),
        }
    }

    fn backoff_with_full_jitter(config: &SummaryGeneratorConfig, attempt_number: u32) -> Duration {
        let shift = attempt_number.saturating_sub(1).min(63);
        let capped = config.backoff_base_ms.checked_shl(shift).unwrap_or(u64::MAX).min(config.backoff_max_ms);
        let jittered_ms = rand::thread_rng().gen_range(0..=capped);
        Duration::from_millis(jittered_ms)
    }
}
