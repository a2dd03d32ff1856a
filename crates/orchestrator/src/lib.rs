//! Owns the shared scheduler and per-invocation caches, fans out `(agent,
//! pass)` work with bounded parallelism, and assembles the final merged
//! result list plus executive summary.
//!
//! Fan-out granularity is per-*agent*, not per-`(agent, pass)`: each spawned
//! task calls `ReviewAgentRunner::run`, which already loops the `passes`
//! sequential passes for its agent internally. Splitting passes into
//! separate semaphore-gated tasks would require threading per-pass ordering
//! back through the runner's carry-source-on-pass-one logic for no
//! observable benefit, since passes for one agent are never meant to run
//! concurrently with each other.

use std::sync::Arc;

use quorum_collector::{Clock, SharedScheduler, SystemClock};
use quorum_core::{AccumulationTuning, AgentConfig, FileCollector, ReviewContext, ReviewResult, ReviewTarget, SessionClient};
use quorum_merge::{FindingsExtractor, ReviewResultMerger};
use quorum_resilience::{CircuitBreakerConfig, CircuitBreakers};
use quorum_runner::ReviewAgentRunner;
use quorum_summary::{ExecutiveReport, SummaryGenerator, SummaryGeneratorConfig};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::info;

/// One orchestration request — the agent roster plus the tuning the caller
/// wants for this run.
#[derive(Clone)]
pub struct ReviewRequest {
    pub agents: Vec<AgentConfig>,
    pub target: ReviewTarget,
    pub parallelism: usize,
    pub passes: u32,
    pub reasoning_effort: Option<String>,
    pub custom_instructions: Vec<String>,
    pub output_constraints: Option<String>,
    /// Pre-resolved remote-tool configuration for `Remote` targets; installed
    /// verbatim into `ReviewContext.cached_mcp_servers`. Callers resolve this
    /// themselves (e.g. from an MCP registry) — the orchestrator only caches
    /// and forwards it.
    pub mcp_servers: Option<serde_json::Value>,
}

/// The merged per-agent reports, the priority-grouped findings roll-up, and
/// the assembled executive-summary artifact.
pub struct ReviewOutcome {
    pub results: Vec<ReviewResult>,
    pub findings_summary: String,
    pub executive_summary_markdown: String,
    pub executive_summary_filename: String,
}

/// Fixed collaborators the orchestrator is built from once at startup;
/// the circuit breakers are process-wide by call path, not per-request.
pub struct Orchestrator {
    session_client: Arc<dyn SessionClient>,
    file_collector: Arc<dyn FileCollector>,
    timeout_minutes: u64,
    idle_timeout_minutes: u64,
    max_retries: u32,
    circuit_breaker_config: CircuitBreakerConfig,
    tuning: AccumulationTuning,
    summary_config: SummaryGeneratorConfig,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_client: Arc<dyn SessionClient>,
        file_collector: Arc<dyn FileCollector>,
        timeout_minutes: u64,
        idle_timeout_minutes: u64,
        max_retries: u32,
        circuit_breaker_config: CircuitBreakerConfig,
        tuning: AccumulationTuning,
        summary_config: SummaryGeneratorConfig,
    ) -> Self {
        Self {
            session_client,
            file_collector,
            timeout_minutes,
            idle_timeout_minutes,
            max_retries,
            circuit_breaker_config,
            tuning,
            summary_config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Overrides the clock every `ReviewContext` and `CircuitBreakers` built
    /// by `run()` shares. Production always uses the default `SystemClock`;
    /// tests inject a `FakeClock` here to drive idle-timeout and
    /// reset-timeout behavior without waiting out real wall-clock time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs one full orchestration: builds the shared `ReviewContext`, fans
    /// the agent roster out to a `parallelism`-bounded worker pool, merges
    /// the per-agent results, and produces the executive summary.
    pub async fn run(&self, request: ReviewRequest) -> anyhow::Result<ReviewOutcome> {
        let shared_scheduler = SharedScheduler::new();

        let mut ctx = ReviewContext::new(
            self.session_client.clone(),
            self.timeout_minutes,
            self.idle_timeout_minutes,
            self.max_retries,
            self.file_collector.clone(),
            shared_scheduler.clone(),
        )?;
        ctx.reasoning_effort = request.reasoning_effort.clone();
        ctx.custom_instructions = request.custom_instructions.clone();
        ctx.output_constraints = request.output_constraints.clone();
        ctx.tuning = self.tuning;
        ctx.clock = self.clock.clone();
        if !request.target.is_local() {
            ctx.cached_mcp_servers = request.mcp_servers.clone();
        }
        let ctx = Arc::new(ctx);

        let breakers = Arc::new(CircuitBreakers::new(self.circuit_breaker_config, self.clock.clone()));
        let semaphore = Arc::new(Semaphore::new(request.parallelism.max(1)));

        info!(agents = request.agents.len(), passes = request.passes, "starting review orchestration");

        let mut join_set = JoinSet::new();
        for (index, agent) in request.agents.into_iter().enumerate() {
            let ctx = ctx.clone();
            let breakers = breakers.clone();
            let semaphore = semaphore.clone();
            let target = request.target.clone();
            let passes = request.passes;
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
                let results = ReviewAgentRunner::run(&agent, &target, &ctx, &breakers, passes).await;
                (index, results)
            });
        }

        let mut by_index = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            by_index.push(joined.expect("agent task panicked"));
        }
        by_index.sort_by_key(|(index, _)| *index);
        let all_results: Vec<ReviewResult> = by_index.into_iter().flat_map(|(_, results)| results).collect();

        let merged = ReviewResultMerger::merge_by_agent(all_results);
        let findings_summary = FindingsExtractor::extract(&merged);

        let repository = request.target.display_name();
        let narrative = SummaryGenerator::generate(
            self.session_client.as_ref(),
            &shared_scheduler,
            &breakers.summary,
            &self.summary_config,
            &repository,
            &merged,
        )
        .await;

        let timestamp = chrono::Utc::now();
        let (executive_summary_markdown, executive_summary_filename) =
            ExecutiveReport::assemble(&repository, &merged, &narrative, &findings_summary, timestamp);

        shared_scheduler.shutdown();

        Ok(ReviewOutcome {
            results: merged,
            findings_summary,
            executive_summary_markdown,
            executive_summary_filename,
        })
    }
}
